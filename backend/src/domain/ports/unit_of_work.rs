//! Transactional port used by the capacity ledger.
//!
//! A [`LedgerTransaction`] is one store transaction. Row-locking reads
//! (`lock_*`) hold their lock until the transaction ends. Adapters must roll
//! back when a transaction is dropped without `commit`, which is how a
//! cancelled or timed-out ledger call is undone.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::contest::effective_status;
use crate::domain::{ContestId, ContestStatus, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by unit-of-work adapters.
    pub enum StoreError {
        /// The store could not be reached or the connection dropped.
        Connection { message: String } => "store connection failed: {message}",
        /// A concurrent transaction won a race (serialisation failure,
        /// deadlock or uniqueness conflict); retrying may succeed.
        Conflict { message: String } => "store transaction conflict: {message}",
        /// A statement failed for a non-transient reason.
        Query { message: String } => "store query failed: {message}",
    }
}

impl StoreError {
    /// Whether the failure may clear up on retry.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Conflict { .. })
    }
}

/// Locked entrant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedEntrant {
    /// Locked user.
    pub user_id: UserId,
    /// Cached selection on the user row.
    pub selected_contest_id: Option<ContestId>,
}

/// Capacity columns of a locked contest row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContestSlots {
    /// Locked contest.
    pub contest_id: ContestId,
    /// Capacity.
    pub total_slots: u32,
    /// Free slots.
    pub remaining_slots: u32,
    /// Stored status.
    pub status: ContestStatus,
    /// End of the registration window.
    pub end_date: DateTime<Utc>,
}

impl ContestSlots {
    /// Whether the contest accepts registrations at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        effective_status(self.status, self.end_date, now) == ContestStatus::Active
    }
}

/// One open store transaction.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Lock the user row. `None` when the user does not exist.
    async fn lock_entrant(&mut self, user_id: UserId)
    -> Result<Option<LockedEntrant>, StoreError>;

    /// Lock the contest row. `None` when the contest does not exist.
    async fn lock_contest(
        &mut self,
        contest_id: ContestId,
    ) -> Result<Option<ContestSlots>, StoreError>;

    /// Contest the user holds a slot in, from the occupancy record.
    async fn occupied_contest(&mut self, user_id: UserId)
    -> Result<Option<ContestId>, StoreError>;

    /// Number of occupancy records referencing the contest.
    async fn count_occupancy(&mut self, contest_id: ContestId) -> Result<u32, StoreError>;

    /// Record that the user holds a slot in the contest.
    async fn insert_occupancy(
        &mut self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<(), StoreError>;

    /// Delete the record; `false` when none existed.
    async fn delete_occupancy(
        &mut self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<bool, StoreError>;

    /// Overwrite the contest's free-slot counter.
    async fn write_remaining_slots(
        &mut self,
        contest_id: ContestId,
        remaining_slots: u32,
    ) -> Result<(), StoreError>;

    /// Update the `selected_contest_id` cache on the user row.
    async fn write_selected_contest(
        &mut self,
        user_id: UserId,
        contest_id: Option<ContestId>,
    ) -> Result<(), StoreError>;

    /// Make every write visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Factory for ledger transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError>;
}
