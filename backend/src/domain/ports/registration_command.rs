//! Driving port for joining, switching and leaving contests.

use async_trait::async_trait;

use crate::domain::{ContestId, Error, ReleaseOutcome, UserId};

/// Successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinReceipt {
    /// Acting user.
    pub user_id: UserId,
    /// Contest joined.
    pub contest_id: ContestId,
    /// Slots left after the join.
    pub remaining_slots: u32,
}

/// Successful switch. `remaining_slots` refers to the target contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchReceipt {
    /// Acting user.
    pub user_id: UserId,
    /// Contest left.
    pub from: ContestId,
    /// Contest joined.
    pub to: ContestId,
    /// Slots left in `to`.
    pub remaining_slots: u32,
}

/// Completed leave. Leaving twice is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveReceipt {
    /// Acting user.
    pub user_id: UserId,
    /// What was released, if anything.
    pub outcome: ReleaseOutcome,
}

/// Registration changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationCommand: Send + Sync {
    /// Claim a slot for a user with none.
    async fn join(&self, user_id: UserId, contest_id: ContestId) -> Result<JoinReceipt, Error>;

    /// Move the user's slot to `new_contest_id` in one step.
    async fn switch_to(
        &self,
        user_id: UserId,
        new_contest_id: ContestId,
    ) -> Result<SwitchReceipt, Error>;

    /// Release the user's slot.
    async fn leave(&self, user_id: UserId) -> Result<LeaveReceipt, Error>;
}
