//! Registration engine: join, switch and leave as atomic units.
//!
//! The engine resolves the contest and entrant, applies the eligibility gate
//! and then performs exactly one capacity-ledger transition. Each ledger call
//! runs under a deadline; when it expires the in-flight transaction is
//! dropped, which rolls it back, and the caller sees a transient error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use super::ports::{
    ContestRepository, ContestRepositoryError, EntrantRepository, EntrantRepositoryError,
    JoinReceipt, LeaveReceipt, RegistrationCommand, RegistrationQuery, SwitchReceipt,
    UnitOfWork,
};
use super::{
    CapacityLedger, Contest, ContestId, EligibilityGate, Entrant, Error, LedgerError,
    RegistrationError, RegistrationState, ReleaseOutcome, ReserveOutcome, TransferOutcome,
    UserId,
};

/// Deadline applied to each ledger call unless configured otherwise.
pub const DEFAULT_OPERATION_DEADLINE: Duration = Duration::from_secs(5);

/// Registration service implementing the registration driving ports.
pub struct RegistrationEngine<U, C, E> {
    ledger: CapacityLedger<U>,
    contests: Arc<C>,
    entrants: Arc<E>,
    gate: EligibilityGate,
    clock: Arc<dyn Clock>,
    deadline: Duration,
}

impl<U, C, E> RegistrationEngine<U, C, E> {
    /// Create an engine over the ledger, the directories it reads and the
    /// eligibility gate.
    pub fn new(
        ledger: CapacityLedger<U>,
        contests: Arc<C>,
        entrants: Arc<E>,
        gate: EligibilityGate,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            contests,
            entrants,
            gate,
            clock,
            deadline: DEFAULT_OPERATION_DEADLINE,
        }
    }

    /// Replace the per-call ledger deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Deadline applied to each ledger call.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

fn map_contest_error(error: ContestRepositoryError) -> RegistrationError {
    match error {
        ContestRepositoryError::Connection { message } => RegistrationError::Transient {
            message: format!("contest repository unavailable: {message}"),
        },
        ContestRepositoryError::Query { message } => RegistrationError::Internal {
            message: format!("contest repository error: {message}"),
        },
    }
}

fn map_entrant_error(error: EntrantRepositoryError) -> RegistrationError {
    match error {
        EntrantRepositoryError::Connection { message } => RegistrationError::Transient {
            message: format!("entrant repository unavailable: {message}"),
        },
        EntrantRepositoryError::Query { message } => RegistrationError::Internal {
            message: format!("entrant repository error: {message}"),
        },
    }
}

fn map_ledger_error(error: LedgerError) -> RegistrationError {
    match error {
        LedgerError::Store(store) if store.is_transient() => RegistrationError::Transient {
            message: store.to_string(),
        },
        LedgerError::Store(store) => RegistrationError::Internal {
            message: store.to_string(),
        },
        violation @ LedgerError::InvariantViolation { .. } => {
            RegistrationError::InvariantViolation {
                message: violation.to_string(),
            }
        }
    }
}

impl<U, C, E> RegistrationEngine<U, C, E>
where
    U: UnitOfWork,
    C: ContestRepository,
    E: EntrantRepository,
{
    async fn find_contest(&self, contest_id: ContestId) -> Result<Contest, RegistrationError> {
        self.contests
            .find_by_id(&contest_id)
            .await
            .map_err(map_contest_error)?
            .ok_or(RegistrationError::ContestNotFound { contest_id })
    }

    async fn find_entrant(&self, user_id: UserId) -> Result<Entrant, RegistrationError> {
        self.entrants
            .find_by_id(&user_id)
            .await
            .map_err(map_entrant_error)?
            .ok_or(RegistrationError::UserNotFound { user_id })
    }

    fn check_eligibility(
        &self,
        entrant: &Entrant,
        contest: &Contest,
    ) -> Result<(), RegistrationError> {
        self.gate.evaluate(entrant, contest).map_err(|reason| {
            debug!(
                user_id = %entrant.id(),
                contest_id = %contest.id(),
                rule = reason.rule(),
                "entrant rejected by eligibility gate"
            );
            RegistrationError::NotEligible(reason)
        })
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, RegistrationError> {
        match tokio::time::timeout(self.deadline, operation).await {
            Ok(result) => result.map_err(map_ledger_error),
            Err(_) => {
                let deadline_ms = u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(deadline_ms, "ledger operation exceeded its deadline");
                Err(RegistrationError::Transient {
                    message: format!("operation exceeded its {deadline_ms} ms deadline"),
                })
            }
        }
    }

    /// Claim a slot in `contest_id` for `user_id`.
    pub async fn join(
        &self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<JoinReceipt, RegistrationError> {
        let contest = self.find_contest(contest_id).await?;
        let entrant = self.find_entrant(user_id).await?;
        self.check_eligibility(&entrant, &contest)?;

        match self.bounded(self.ledger.reserve(user_id, contest_id)).await? {
            ReserveOutcome::Granted { remaining_slots } => {
                info!(%user_id, %contest_id, remaining_slots, "user joined contest");
                Ok(JoinReceipt {
                    user_id,
                    contest_id,
                    remaining_slots,
                })
            }
            ReserveOutcome::Denied(reason) => {
                debug!(%user_id, %contest_id, ?reason, "join denied");
                Err(RegistrationError::from_denial(reason, user_id, contest_id))
            }
        }
    }

    /// Move `user_id` from their current contest to `new_contest_id`.
    pub async fn switch_to(
        &self,
        user_id: UserId,
        new_contest_id: ContestId,
    ) -> Result<SwitchReceipt, RegistrationError> {
        let entrant = self.find_entrant(user_id).await?;
        let current = match self
            .entrants
            .occupied_contest(&user_id)
            .await
            .map_err(map_entrant_error)?
        {
            None => return Err(RegistrationError::NotRegistered { user_id }),
            Some(current) if current == new_contest_id => {
                return Err(RegistrationError::AlreadyRegistered {
                    contest_id: current,
                });
            }
            Some(current) => current,
        };
        let target = self.find_contest(new_contest_id).await?;
        if !target.is_open_at(self.clock.utc()) {
            return Err(RegistrationError::ContestClosed {
                contest_id: new_contest_id,
            });
        }
        self.check_eligibility(&entrant, &target)?;

        let outcome = self
            .bounded(self.ledger.transfer(user_id, current, new_contest_id))
            .await?;
        match outcome {
            TransferOutcome::Moved {
                from,
                to,
                remaining_slots,
            } => {
                info!(%user_id, %from, %to, remaining_slots, "user switched contest");
                Ok(SwitchReceipt {
                    user_id,
                    from,
                    to,
                    remaining_slots,
                })
            }
            TransferOutcome::Denied(reason) => {
                debug!(%user_id, from = %current, to = %new_contest_id, ?reason, "switch denied");
                Err(RegistrationError::from_denial(
                    reason,
                    user_id,
                    new_contest_id,
                ))
            }
        }
    }

    /// Release whatever slot `user_id` holds. Leaving twice is not an error.
    pub async fn leave(&self, user_id: UserId) -> Result<LeaveReceipt, RegistrationError> {
        self.find_entrant(user_id).await?;
        let outcome = self.bounded(self.ledger.release_current(user_id)).await?;
        match outcome {
            ReleaseOutcome::Released(contest_id) => {
                info!(%user_id, %contest_id, "user left contest");
            }
            ReleaseOutcome::NotFound => debug!(%user_id, "leave found no registration"),
        }
        Ok(LeaveReceipt { user_id, outcome })
    }

    /// Registration state read from the occupancy record.
    pub async fn registration(
        &self,
        user_id: UserId,
    ) -> Result<RegistrationState, RegistrationError> {
        self.find_entrant(user_id).await?;
        let held = self
            .entrants
            .occupied_contest(&user_id)
            .await
            .map_err(map_entrant_error)?;
        Ok(RegistrationState::from(held))
    }
}

#[async_trait]
impl<U, C, E> RegistrationCommand for RegistrationEngine<U, C, E>
where
    U: UnitOfWork,
    C: ContestRepository,
    E: EntrantRepository,
{
    async fn join(&self, user_id: UserId, contest_id: ContestId) -> Result<JoinReceipt, Error> {
        Self::join(self, user_id, contest_id)
            .await
            .map_err(Error::from)
    }

    async fn switch_to(
        &self,
        user_id: UserId,
        new_contest_id: ContestId,
    ) -> Result<SwitchReceipt, Error> {
        Self::switch_to(self, user_id, new_contest_id)
            .await
            .map_err(Error::from)
    }

    async fn leave(&self, user_id: UserId) -> Result<LeaveReceipt, Error> {
        Self::leave(self, user_id).await.map_err(Error::from)
    }
}

#[async_trait]
impl<U, C, E> RegistrationQuery for RegistrationEngine<U, C, E>
where
    U: UnitOfWork,
    C: ContestRepository,
    E: EntrantRepository,
{
    async fn registration(&self, user_id: UserId) -> Result<RegistrationState, Error> {
        Self::registration(self, user_id)
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "registration_engine_tests.rs"]
mod tests;
