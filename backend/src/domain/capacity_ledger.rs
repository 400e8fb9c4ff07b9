//! Capacity ledger: the only component that mutates `remaining_slots` and
//! occupancy records.
//!
//! Every operation runs in one [`LedgerTransaction`]. Locks are taken user
//! row first, then contest rows in ascending [`ContestId`] order, so two
//! ledger operations never wait on each other in a cycle. Before mutating a
//! contest the ledger checks `remaining + occupancy == total`; a mismatch
//! aborts the transaction as an invariant violation.
//!
//! Denials roll back explicitly. Store failures roll back as well, and a
//! transaction dropped mid-flight (for example by a deadline) is rolled back
//! by the adapter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, error, warn};

use super::ports::{ContestSlots, LedgerTransaction, StoreError, UnitOfWork};
use super::{
    ContestId, DenialReason, ReleaseOutcome, ReserveOutcome, TransferOutcome, UserId,
};

/// Failures that abort a ledger operation with no effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The unit of work failed; nothing was committed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A locked contest's counters disagree with its occupancy records.
    #[error(
        "contest {contest_id}: remaining {remaining_slots} + occupied {occupied} != total {total_slots}"
    )]
    InvariantViolation {
        /// Contest whose counters are out of balance.
        contest_id: ContestId,
        /// Stored capacity.
        total_slots: u32,
        /// Stored remaining count.
        remaining_slots: u32,
        /// Occupancy records counted under the lock.
        occupied: u32,
    },
}

impl LedgerError {
    /// Whether retrying the operation may succeed.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(error) => error.is_transient(),
            Self::InvariantViolation { .. } => false,
        }
    }
}

/// What to do with the transaction once an operation has decided.
enum Decision<T> {
    Commit(T),
    Abort(T),
}

/// Transactional slot accounting over a [`UnitOfWork`].
pub struct CapacityLedger<U> {
    unit_of_work: Arc<U>,
    clock: Arc<dyn Clock>,
}

impl<U> Clone for CapacityLedger<U> {
    fn clone(&self) -> Self {
        Self {
            unit_of_work: Arc::clone(&self.unit_of_work),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<U> CapacityLedger<U>
where
    U: UnitOfWork,
{
    /// Create a ledger over `unit_of_work`; `clock` decides whether a
    /// contest window has elapsed.
    pub fn new(unit_of_work: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self {
            unit_of_work,
            clock,
        }
    }

    /// Claim one slot in `contest_id` for `user_id`.
    ///
    /// On success `remaining_slots` drops by exactly one, an occupancy record
    /// is written and the user's `selected_contest_id` cache points at the
    /// contest. Any denial leaves the store untouched.
    pub async fn reserve(
        &self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<ReserveOutcome, LedgerError> {
        let now = self.clock.utc();
        let mut tx = self.unit_of_work.begin().await?;
        let decision = reserve_in(tx.as_mut(), user_id, contest_id, now).await;
        settle(tx, decision).await
    }

    /// Release the slot `user_id` holds in `contest_id`, if any.
    ///
    /// Idempotent: a second call finds no record and returns
    /// [`ReleaseOutcome::NotFound`] without crediting the contest again.
    pub async fn release(
        &self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<ReleaseOutcome, LedgerError> {
        let mut tx = self.unit_of_work.begin().await?;
        let decision = release_in(tx.as_mut(), user_id, Some(contest_id)).await;
        settle(tx, decision).await
    }

    /// Release whichever slot `user_id` holds, resolved under the user lock.
    pub async fn release_current(&self, user_id: UserId) -> Result<ReleaseOutcome, LedgerError> {
        let mut tx = self.unit_of_work.begin().await?;
        let decision = release_in(tx.as_mut(), user_id, None).await;
        settle(tx, decision).await
    }

    /// Move `user_id` from `from` to `to` in one transaction.
    ///
    /// The target is validated and debited before the source is credited,
    /// so the user never holds zero slots mid-move. A stale `from` is
    /// reported as a transient conflict.
    pub async fn transfer(
        &self,
        user_id: UserId,
        from: ContestId,
        to: ContestId,
    ) -> Result<TransferOutcome, LedgerError> {
        let now = self.clock.utc();
        let mut tx = self.unit_of_work.begin().await?;
        let decision = transfer_in(tx.as_mut(), user_id, from, to, now).await;
        settle(tx, decision).await
    }
}

async fn settle<T>(
    tx: Box<dyn LedgerTransaction>,
    decision: Result<Decision<T>, LedgerError>,
) -> Result<T, LedgerError> {
    match decision {
        Ok(Decision::Commit(value)) => {
            tx.commit().await?;
            Ok(value)
        }
        Ok(Decision::Abort(value)) => {
            // Nothing was written, so a failed rollback does not change the answer.
            if let Err(error) = tx.rollback().await {
                warn!(%error, "rollback after ledger denial failed");
            }
            Ok(value)
        }
        Err(failure) => {
            if let Err(error) = tx.rollback().await {
                warn!(%error, cause = %failure, "rollback after ledger failure failed");
            }
            Err(failure)
        }
    }
}

/// Check `remaining + occupied == total` for a locked contest and return the
/// occupancy count it observed.
async fn verify_balance(
    tx: &mut dyn LedgerTransaction,
    slots: &ContestSlots,
) -> Result<u32, LedgerError> {
    let occupied = tx.count_occupancy(slots.contest_id).await?;
    let balanced = slots
        .remaining_slots
        .checked_add(occupied)
        .is_some_and(|sum| sum == slots.total_slots);
    if balanced {
        Ok(occupied)
    } else {
        Err(invariant_violation(slots, occupied))
    }
}

/// Log and build an invariant violation for `slots`.
fn invariant_violation(slots: &ContestSlots, occupied: u32) -> LedgerError {
    error!(
        contest_id = %slots.contest_id,
        total_slots = slots.total_slots,
        remaining_slots = slots.remaining_slots,
        occupied,
        "capacity invariant violated"
    );
    LedgerError::InvariantViolation {
        contest_id: slots.contest_id,
        total_slots: slots.total_slots,
        remaining_slots: slots.remaining_slots,
        occupied,
    }
}

async fn reserve_in(
    tx: &mut dyn LedgerTransaction,
    user_id: UserId,
    contest_id: ContestId,
    now: DateTime<Utc>,
) -> Result<Decision<ReserveOutcome>, LedgerError> {
    let denied = |reason| Ok(Decision::Abort(ReserveOutcome::Denied(reason)));

    if tx.lock_entrant(user_id).await?.is_none() {
        return denied(DenialReason::UnknownEntrant);
    }
    if let Some(held) = tx.occupied_contest(user_id).await? {
        return denied(DenialReason::AlreadyRegistered(held));
    }
    let Some(slots) = tx.lock_contest(contest_id).await? else {
        return denied(DenialReason::ContestNotFound);
    };
    verify_balance(tx, &slots).await?;
    if !slots.is_open_at(now) {
        return denied(DenialReason::ContestClosed);
    }
    let Some(remaining_slots) = slots.remaining_slots.checked_sub(1) else {
        return denied(DenialReason::NoSlots);
    };

    tx.write_remaining_slots(contest_id, remaining_slots).await?;
    tx.insert_occupancy(user_id, contest_id).await?;
    tx.write_selected_contest(user_id, Some(contest_id)).await?;
    debug!(%user_id, %contest_id, remaining_slots, "slot reserved");
    Ok(Decision::Commit(ReserveOutcome::Granted { remaining_slots }))
}

/// Release the user's slot. With `expected` set, only a slot in that
/// contest is released.
async fn release_in(
    tx: &mut dyn LedgerTransaction,
    user_id: UserId,
    expected: Option<ContestId>,
) -> Result<Decision<ReleaseOutcome>, LedgerError> {
    let Some(entrant) = tx.lock_entrant(user_id).await? else {
        return Ok(Decision::Abort(ReleaseOutcome::NotFound));
    };
    let held = tx.occupied_contest(user_id).await?;
    let contest_id = match (held, expected) {
        (Some(held), Some(expected)) if held != expected => {
            return Ok(Decision::Abort(ReleaseOutcome::NotFound));
        }
        (Some(held), _) => held,
        (None, _) => {
            if entrant.selected_contest_id.is_none() {
                return Ok(Decision::Abort(ReleaseOutcome::NotFound));
            }
            warn!(
                %user_id,
                cached = ?entrant.selected_contest_id,
                "selected contest cache had no occupancy record; clearing"
            );
            tx.write_selected_contest(user_id, None).await?;
            return Ok(Decision::Commit(ReleaseOutcome::NotFound));
        }
    };

    let slots = tx.lock_contest(contest_id).await?.ok_or_else(|| {
        StoreError::query(format!("occupancy references missing contest {contest_id}"))
    })?;
    let occupied = verify_balance(tx, &slots).await?;
    let remaining_slots = credit(&slots, occupied)?;

    if !tx.delete_occupancy(user_id, contest_id).await? {
        return Err(StoreError::conflict("occupancy record vanished under lock").into());
    }
    tx.write_remaining_slots(contest_id, remaining_slots).await?;
    tx.write_selected_contest(user_id, None).await?;
    debug!(%user_id, %contest_id, remaining_slots, "slot released");
    Ok(Decision::Commit(ReleaseOutcome::Released(contest_id)))
}

/// `remaining + 1`, refusing to exceed `total`. `occupied` is the count seen
/// under the same lock and is only used to describe a violation.
fn credit(slots: &ContestSlots, occupied: u32) -> Result<u32, LedgerError> {
    slots
        .remaining_slots
        .checked_add(1)
        .filter(|remaining| *remaining <= slots.total_slots)
        .ok_or_else(|| invariant_violation(slots, occupied))
}

async fn lock_pair(
    tx: &mut dyn LedgerTransaction,
    from: ContestId,
    to: ContestId,
) -> Result<(Option<ContestSlots>, Option<ContestSlots>), LedgerError> {
    if from < to {
        let source = tx.lock_contest(from).await?;
        let target = tx.lock_contest(to).await?;
        Ok((source, target))
    } else {
        let target = tx.lock_contest(to).await?;
        let source = tx.lock_contest(from).await?;
        Ok((source, target))
    }
}

async fn transfer_in(
    tx: &mut dyn LedgerTransaction,
    user_id: UserId,
    from: ContestId,
    to: ContestId,
    now: DateTime<Utc>,
) -> Result<Decision<TransferOutcome>, LedgerError> {
    let denied = |reason| Ok(Decision::Abort(TransferOutcome::Denied(reason)));

    if from == to {
        return denied(DenialReason::AlreadyRegistered(to));
    }
    if tx.lock_entrant(user_id).await?.is_none() {
        return denied(DenialReason::UnknownEntrant);
    }
    match tx.occupied_contest(user_id).await? {
        None => return denied(DenialReason::NotRegistered),
        Some(held) if held != from => {
            return Err(StoreError::conflict(format!(
                "user {user_id} moved from {from} to {held} concurrently"
            ))
            .into());
        }
        Some(_) => {}
    }

    let (source, target) = lock_pair(tx, from, to).await?;
    let source = source.ok_or_else(|| {
        StoreError::query(format!("occupancy references missing contest {from}"))
    })?;
    let Some(target) = target else {
        return denied(DenialReason::ContestNotFound);
    };
    let source_occupied = verify_balance(tx, &source).await?;
    verify_balance(tx, &target).await?;
    if !target.is_open_at(now) {
        return denied(DenialReason::ContestClosed);
    }
    let Some(target_remaining) = target.remaining_slots.checked_sub(1) else {
        return denied(DenialReason::NoSlots);
    };
    let source_remaining = credit(&source, source_occupied)?;

    tx.write_remaining_slots(to, target_remaining).await?;
    if !tx.delete_occupancy(user_id, from).await? {
        return Err(StoreError::conflict("occupancy record vanished under lock").into());
    }
    tx.write_remaining_slots(from, source_remaining).await?;
    tx.insert_occupancy(user_id, to).await?;
    tx.write_selected_contest(user_id, Some(to)).await?;
    debug!(%user_id, %from, %to, target_remaining, "slot transferred");
    Ok(Decision::Commit(TransferOutcome::Moved {
        from,
        to,
        remaining_slots: target_remaining,
    }))
}

#[cfg(test)]
#[path = "capacity_ledger_tests.rs"]
mod tests;
