//! Port for contest metadata persistence.
//!
//! Capacity changes driven by registrations go through the unit of work;
//! this port covers creation, lookup, closure and the administrative paths.

use async_trait::async_trait;

use crate::domain::{Contest, ContestId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by contest repository adapters.
    pub enum ContestRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "contest repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "contest repository query failed: {message}",
    }
}

/// Result of deleting a contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestDeletion {
    /// The contest row is gone.
    Deleted,
    /// No contest has the identifier.
    NotFound,
    /// Occupancy records still reference the contest; nothing was deleted.
    Occupied {
        /// Occupancy records found.
        occupants: u32,
    },
}

/// Result of an administrative remaining-slot override.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotOverride {
    /// The value was written. `occupants` is the occupancy count observed in
    /// the same transaction.
    Applied {
        /// Contest after the write.
        contest: Contest,
        /// Occupancy records found.
        occupants: u32,
    },
    /// The value exceeds `total_slots`; nothing was written.
    OutOfRange {
        /// Contest capacity.
        total_slots: u32,
    },
    /// No contest has the identifier.
    NotFound,
}

/// Contest persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContestRepository: Send + Sync {
    /// Store a new contest.
    async fn insert(&self, contest: &Contest) -> Result<(), ContestRepositoryError>;

    /// Fetch a contest by identifier.
    async fn find_by_id(&self, id: &ContestId) -> Result<Option<Contest>, ContestRepositoryError>;

    /// Delete the contest unless occupancy records reference it.
    async fn delete_if_vacant(
        &self,
        id: &ContestId,
    ) -> Result<ContestDeletion, ContestRepositoryError>;

    /// Overwrite `remaining_slots` without reconciling against occupancy.
    async fn set_remaining_slots(
        &self,
        id: &ContestId,
        remaining_slots: u32,
    ) -> Result<SlotOverride, ContestRepositoryError>;

    /// Mark the contest closed. `None` when it does not exist.
    async fn close(&self, id: &ContestId) -> Result<Option<Contest>, ContestRepositoryError>;
}
