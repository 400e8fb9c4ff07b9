//! Driving port for team creation.

use async_trait::async_trait;

use crate::domain::{Error, NewTeam, Team};

/// Team creation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamCommand: Send + Sync {
    /// Validate and store a new team.
    async fn create_team(&self, request: NewTeam) -> Result<Team, Error>;
}
