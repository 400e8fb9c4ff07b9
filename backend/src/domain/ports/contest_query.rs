//! Driving port for contest reads.

use async_trait::async_trait;

use crate::domain::{Contest, ContestId, Error};

/// Contest lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContestQuery: Send + Sync {
    /// Fetch a contest with its effective status.
    async fn get_contest(&self, id: ContestId) -> Result<Contest, Error>;
}
