//! Registration outcomes and failure kinds shared by the capacity ledger and
//! the registration engine.

use super::{ContestId, Error, Ineligibility, UserId};

/// Per-user registration state, read from the occupancy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// The user holds no slot.
    Unregistered,
    /// The user holds a slot in this contest.
    RegisteredIn(ContestId),
}

impl From<Option<ContestId>> for RegistrationState {
    fn from(value: Option<ContestId>) -> Self {
        value.map_or(Self::Unregistered, Self::RegisteredIn)
    }
}

impl RegistrationState {
    /// Contest the user is registered in, if any.
    pub fn contest_id(self) -> Option<ContestId> {
        match self {
            Self::Unregistered => None,
            Self::RegisteredIn(contest_id) => Some(contest_id),
        }
    }
}

/// Domain reason for a ledger transition being refused. Nothing is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The contest has no remaining slots.
    NoSlots,
    /// No contest has the requested identifier.
    ContestNotFound,
    /// The contest is closed or its window has elapsed.
    ContestClosed,
    /// The user already holds a slot in the given contest.
    AlreadyRegistered(ContestId),
    /// The user holds no slot to release or move.
    NotRegistered,
    /// No user row exists for the identifier.
    UnknownEntrant,
}

/// Result of [`CapacityLedger::reserve`](super::CapacityLedger::reserve).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// A slot was taken.
    Granted {
        /// Slots left after the reservation.
        remaining_slots: u32,
    },
    /// Nothing changed.
    Denied(DenialReason),
}

/// Result of a release. `NotFound` means there was nothing to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The slot in this contest was returned.
    Released(ContestId),
    /// The user held no slot.
    NotFound,
}

/// Result of [`CapacityLedger::transfer`](super::CapacityLedger::transfer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The slot moved between contests.
    Moved {
        /// Contest the slot was released from.
        from: ContestId,
        /// Contest the slot was taken in.
        to: ContestId,
        /// Slots left in `to`.
        remaining_slots: u32,
    },
    /// Nothing changed.
    Denied(DenialReason),
}

/// Every way a join, switch or leave can fail.
///
/// Domain-rule variants are terminal. [`RegistrationError::Transient`] covers
/// connectivity loss, serialisation conflicts and deadline expiry; the
/// operation had no effect and may be retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The target contest does not exist.
    #[error("contest {contest_id} not found")]
    ContestNotFound {
        /// Requested contest.
        contest_id: ContestId,
    },
    /// The acting user does not exist.
    #[error("user {user_id} not found")]
    UserNotFound {
        /// Acting user.
        user_id: UserId,
    },
    /// An eligibility rule refused the user.
    #[error("user is not eligible: {0}")]
    NotEligible(Ineligibility),
    /// The target contest is full.
    #[error("contest {contest_id} has no remaining slots")]
    NoSlots {
        /// Full contest.
        contest_id: ContestId,
    },
    /// The target contest is closed or past its end date.
    #[error("contest {contest_id} is closed")]
    ContestClosed {
        /// Closed contest.
        contest_id: ContestId,
    },
    /// The user already holds a slot.
    #[error("user is already registered in contest {contest_id}")]
    AlreadyRegistered {
        /// Contest where the slot is held.
        contest_id: ContestId,
    },
    /// The user holds no slot.
    #[error("user {user_id} is not registered in any contest")]
    NotRegistered {
        /// Acting user.
        user_id: UserId,
    },
    /// Retryable failure; nothing was committed.
    #[error("registration temporarily unavailable: {message}")]
    Transient {
        /// Underlying cause.
        message: String,
    },
    /// Stored counters disagree with occupancy records.
    #[error("capacity invariant violated: {message}")]
    InvariantViolation {
        /// Description of the imbalance.
        message: String,
    },
    /// Any other non-retryable failure.
    #[error("registration failed: {message}")]
    Internal {
        /// Underlying cause.
        message: String,
    },
}

impl RegistrationError {
    /// Machine-readable reason carried in error details.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ContestNotFound { .. } => "contest_not_found",
            Self::UserNotFound { .. } => "user_not_found",
            Self::NotEligible(_) => "not_eligible",
            Self::NoSlots { .. } => "no_slots",
            Self::ContestClosed { .. } => "contest_closed",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::NotRegistered { .. } => "not_registered",
            Self::Transient { .. } => "transient",
            Self::InvariantViolation { .. } => "invariant_violation",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether the caller may retry.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Translate a ledger denial for `user_id` acting on `contest_id`.
    pub fn from_denial(reason: DenialReason, user_id: UserId, contest_id: ContestId) -> Self {
        match reason {
            DenialReason::NoSlots => Self::NoSlots { contest_id },
            DenialReason::ContestNotFound => Self::ContestNotFound { contest_id },
            DenialReason::ContestClosed => Self::ContestClosed { contest_id },
            DenialReason::AlreadyRegistered(held) => Self::AlreadyRegistered { contest_id: held },
            DenialReason::NotRegistered => Self::NotRegistered { user_id },
            DenialReason::UnknownEntrant => Self::UserNotFound { user_id },
        }
    }
}

impl From<RegistrationError> for Error {
    fn from(value: RegistrationError) -> Self {
        let reason = value.reason();
        let message = value.to_string();
        match value {
            RegistrationError::ContestNotFound { .. } | RegistrationError::UserNotFound { .. } => {
                Self::not_found(message).with_reason(reason)
            }
            RegistrationError::NotEligible(ineligibility) => Self::unprocessable(message)
                .with_details(serde_json::json!({ "rule": ineligibility.rule() }))
                .with_reason(reason),
            RegistrationError::NoSlots { .. }
            | RegistrationError::ContestClosed { .. }
            | RegistrationError::AlreadyRegistered { .. }
            | RegistrationError::NotRegistered { .. } => Self::conflict(message).with_reason(reason),
            RegistrationError::Transient { .. } => {
                Self::service_unavailable(message).with_reason(reason)
            }
            RegistrationError::InvariantViolation { .. } | RegistrationError::Internal { .. } => {
                Self::internal(message)
            }
        }
    }
}
