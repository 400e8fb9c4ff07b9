//! Driving port for reading a user's registration.

use async_trait::async_trait;

use crate::domain::{Error, RegistrationState, UserId};

/// Registration lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationQuery: Send + Sync {
    /// Current state, read from the occupancy record.
    async fn registration(&self, user_id: UserId) -> Result<RegistrationState, Error>;
}
