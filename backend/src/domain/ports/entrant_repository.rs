//! Read-only port over the external users table.

use async_trait::async_trait;

use crate::domain::{ContestId, Entrant, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by entrant repository adapters.
    pub enum EntrantRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "entrant repository connection failed: {message}",
        /// Query failed or returned data that violates domain rules.
        Query { message: String } =>
            "entrant repository query failed: {message}",
    }
}

/// Entrant lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntrantRepository: Send + Sync {
    /// Fetch an entrant by user identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Entrant>, EntrantRepositoryError>;

    /// Contest the user holds a slot in, read from the occupancy record.
    async fn occupied_contest(
        &self,
        id: &UserId,
    ) -> Result<Option<ContestId>, EntrantRepositoryError>;
}
