//! Domain primitives, aggregates and services.
//!
//! Purpose: Define strongly typed contest-registration entities and the
//! services that operate on them through ports. Adapters live outside this
//! module; nothing here knows about HTTP or SQL.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - Contest, Team, Entrant — aggregates and their validation errors.
//! - CapacityLedger — transactional slot accounting.
//! - RegistrationEngine — join, switch and leave orchestration.
//! - ContestDirectory, TeamDirectory — metadata services.
//! - EligibilityGate — composable entry rules.

pub mod capacity_ledger;
pub mod contest;
pub mod contest_directory;
pub mod eligibility;
pub mod entrant;
pub mod error;
pub mod identifiers;
pub mod ports;
pub mod registration;
pub mod registration_engine;
pub mod team;
pub mod team_directory;
pub mod trace_id;

pub use self::capacity_ledger::{CapacityLedger, LedgerError};
pub use self::contest::{
    CONTEST_NAME_MAX, Contest, ContestDraft, ContestStatus, ContestValidationError,
    MAX_TOTAL_SLOTS, NewContest, UnknownContestStatus,
};
pub use self::contest_directory::ContestDirectory;
pub use self::eligibility::{
    DEFAULT_MINIMUM_AGE, EligibilityGate, EligibilityRule, Ineligibility, MinimumAge,
};
pub use self::entrant::Entrant;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::identifiers::{ContestId, TeamId, UserId};
pub use self::registration::{
    DenialReason, RegistrationError, RegistrationState, ReleaseOutcome, ReserveOutcome,
    TransferOutcome,
};
pub use self::registration_engine::{DEFAULT_OPERATION_DEADLINE, RegistrationEngine};
pub use self::team::{NewTeam, TEAM_NAME_MAX, Team, TeamValidationError};
pub use self::team_directory::TeamDirectory;
pub use self::trace_id::TraceId;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::conflict("contest is full"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
