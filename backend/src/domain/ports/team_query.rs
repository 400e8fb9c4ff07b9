//! Driving port for team reads.

use async_trait::async_trait;

use crate::domain::{Error, Team, TeamId};

/// Team lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamQuery: Send + Sync {
    /// Fetch one team.
    async fn get_team(&self, id: TeamId) -> Result<Team, Error>;

    /// Every team, oldest first.
    async fn list_teams(&self) -> Result<Vec<Team>, Error>;
}
