//! Driving port for contest administration.

use async_trait::async_trait;

use crate::domain::{Contest, ContestId, Error, NewContest};

/// Contest administration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContestCommand: Send + Sync {
    /// Validate and store a new contest with every slot free.
    async fn create_contest(&self, request: NewContest) -> Result<Contest, Error>;

    /// Delete a contest. Rejected with a conflict while users occupy it.
    async fn delete_contest(&self, id: ContestId) -> Result<(), Error>;

    /// Administrative override of `remaining_slots`, bounded to
    /// `0..=total_slots`.
    async fn set_remaining_slots(&self, id: ContestId, remaining_slots: i64)
    -> Result<Contest, Error>;

    /// Stop accepting registrations.
    async fn close_contest(&self, id: ContestId) -> Result<Contest, Error>;
}
