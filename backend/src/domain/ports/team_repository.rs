//! Port for team persistence.

use async_trait::async_trait;

use crate::domain::{Team, TeamId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by team repository adapters.
    pub enum TeamRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "team repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "team repository query failed: {message}",
    }
}

/// Team persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Store a new team.
    async fn insert(&self, team: &Team) -> Result<(), TeamRepositoryError>;

    /// Fetch a team by identifier.
    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, TeamRepositoryError>;

    /// All teams, oldest first.
    async fn list(&self) -> Result<Vec<Team>, TeamRepositoryError>;
}
