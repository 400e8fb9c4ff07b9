//! Contest aggregate: metadata, capacity and registration window.
//!
//! A contest is created with `remaining_slots == total_slots` and an `active`
//! status. Once `end_date` has passed the contest is treated as closed even
//! when the stored status still reads `active`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContestId;

/// Upper bound on `total_slots` accepted at creation.
pub const MAX_TOTAL_SLOTS: u32 = 1_000_000;

/// Maximum contest name length in characters.
pub const CONTEST_NAME_MAX: usize = 120;

/// Lifecycle status persisted alongside a contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestStatus {
    /// Open for registration while the window has not elapsed.
    Active,
    /// No further registrations or switches are accepted.
    Closed,
}

impl ContestStatus {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown contest status: {0}")]
pub struct UnknownContestStatus(
    /// The unrecognised value.
    pub String,
);

impl FromStr for ContestStatus {
    type Err = UnknownContestStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            other => Err(UnknownContestStatus(other.to_owned())),
        }
    }
}

/// Validation failures raised before a contest reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContestValidationError {
    /// The name is blank.
    #[error("contest name must not be empty")]
    EmptyName,
    /// The name exceeds [`CONTEST_NAME_MAX`].
    #[error("contest name must be at most {max} characters")]
    NameTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The prize is negative, infinite or NaN.
    #[error("prize must be a finite, non-negative amount")]
    InvalidPrize {
        /// Rejected amount.
        prize: f64,
    },
    /// Zero or negative capacity.
    #[error("total slots must be a positive integer")]
    NonPositiveSlots {
        /// Rejected capacity.
        total_slots: i64,
    },
    /// Capacity above [`MAX_TOTAL_SLOTS`].
    #[error("total slots must be at most {max}")]
    TooManySlots {
        /// Maximum accepted capacity.
        max: u32,
    },
    /// Remaining slots exceed the total.
    #[error("remaining slots ({remaining}) must lie between 0 and total slots ({total})")]
    RemainingOutOfRange {
        /// Rejected remaining count.
        remaining: u32,
        /// Contest capacity.
        total: u32,
    },
    /// `end_date` is not after `start_date`.
    #[error("end date must be after start date")]
    WindowInverted,
}

impl ContestValidationError {
    /// Request field the failure refers to.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyName | Self::NameTooLong { .. } => "name",
            Self::InvalidPrize { .. } => "prize",
            Self::NonPositiveSlots { .. } | Self::TooManySlots { .. } => "totalSlots",
            Self::RemainingOutOfRange { .. } => "remainingSlots",
            Self::WindowInverted => "endDate",
        }
    }

    /// Machine-readable failure code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::NameTooLong { .. } => "name_too_long",
            Self::InvalidPrize { .. } => "invalid_prize",
            Self::NonPositiveSlots { .. } => "non_positive_slots",
            Self::TooManySlots { .. } => "too_many_slots",
            Self::RemainingOutOfRange { .. } => "remaining_out_of_range",
            Self::WindowInverted => "window_inverted",
        }
    }
}

/// Input for creating a contest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContest {
    /// Display name.
    pub name: String,
    /// Prize amount.
    pub prize: f64,
    /// Requested capacity; validated as a positive count.
    pub total_slots: i64,
    /// Start of the registration window.
    pub start_date: DateTime<Utc>,
    /// End of the registration window.
    pub end_date: DateTime<Utc>,
}

/// Every stored field of a contest, used when rehydrating from persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ContestDraft {
    /// Contest identifier.
    pub id: ContestId,
    /// Display name.
    pub name: String,
    /// Prize amount.
    pub prize: f64,
    /// Capacity.
    pub total_slots: u32,
    /// Free slots.
    pub remaining_slots: u32,
    /// Start of the registration window.
    pub start_date: DateTime<Utc>,
    /// End of the registration window.
    pub end_date: DateTime<Utc>,
    /// Stored status.
    pub status: ContestStatus,
    /// When the contest was last activated.
    pub active_date: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Validated contest.
///
/// ## Invariants
/// - `name` is non-empty once trimmed.
/// - `prize` is finite and non-negative.
/// - `0 < total_slots <= MAX_TOTAL_SLOTS` and `remaining_slots <= total_slots`.
/// - `end_date > start_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct Contest {
    id: ContestId,
    name: String,
    prize: f64,
    total_slots: u32,
    remaining_slots: u32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: ContestStatus,
    active_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn validate_name(name: &str) -> Result<String, ContestValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ContestValidationError::EmptyName);
    }
    if trimmed.chars().count() > CONTEST_NAME_MAX {
        return Err(ContestValidationError::NameTooLong {
            max: CONTEST_NAME_MAX,
        });
    }
    Ok(trimmed.to_owned())
}

fn validate_prize(prize: f64) -> Result<f64, ContestValidationError> {
    if prize.is_finite() && prize >= 0.0 {
        Ok(prize)
    } else {
        Err(ContestValidationError::InvalidPrize { prize })
    }
}

fn validate_total_slots(total_slots: i64) -> Result<u32, ContestValidationError> {
    if total_slots <= 0 {
        return Err(ContestValidationError::NonPositiveSlots { total_slots });
    }
    u32::try_from(total_slots)
        .ok()
        .filter(|slots| *slots <= MAX_TOTAL_SLOTS)
        .ok_or(ContestValidationError::TooManySlots {
            max: MAX_TOTAL_SLOTS,
        })
}

fn validate_window(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<(), ContestValidationError> {
    if end_date > start_date {
        Ok(())
    } else {
        Err(ContestValidationError::WindowInverted)
    }
}

impl Contest {
    /// Validate a creation request and build a fresh, fully open contest.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::{Contest, ContestId, ContestStatus, NewContest};
    /// use chrono::{Duration, Utc};
    ///
    /// let now = Utc::now();
    /// let contest = Contest::create(
    ///     ContestId::random(),
    ///     NewContest {
    ///         name: "Weekend league".to_owned(),
    ///         prize: 250.0,
    ///         total_slots: 5,
    ///         start_date: now,
    ///         end_date: now + Duration::days(2),
    ///     },
    ///     now,
    /// )
    /// .expect("valid contest");
    /// assert_eq!(contest.remaining_slots(), 5);
    /// assert_eq!(contest.status(), ContestStatus::Active);
    /// ```
    pub fn create(
        id: ContestId,
        request: NewContest,
        now: DateTime<Utc>,
    ) -> Result<Self, ContestValidationError> {
        let NewContest {
            name,
            prize,
            total_slots,
            start_date,
            end_date,
        } = request;
        let name = validate_name(&name)?;
        let prize = validate_prize(prize)?;
        let total_slots = validate_total_slots(total_slots)?;
        validate_window(start_date, end_date)?;

        Ok(Self {
            id,
            name,
            prize,
            total_slots,
            remaining_slots: total_slots,
            start_date,
            end_date,
            status: ContestStatus::Active,
            active_date: start_date,
            created_at: now,
        })
    }

    /// Rehydrate a contest from stored fields, re-checking every invariant.
    pub fn new(draft: ContestDraft) -> Result<Self, ContestValidationError> {
        let ContestDraft {
            id,
            name,
            prize,
            total_slots,
            remaining_slots,
            start_date,
            end_date,
            status,
            active_date,
            created_at,
        } = draft;
        let name = validate_name(&name)?;
        let prize = validate_prize(prize)?;
        let total_slots = validate_total_slots(i64::from(total_slots))?;
        if remaining_slots > total_slots {
            return Err(ContestValidationError::RemainingOutOfRange {
                remaining: remaining_slots,
                total: total_slots,
            });
        }
        validate_window(start_date, end_date)?;

        Ok(Self {
            id,
            name,
            prize,
            total_slots,
            remaining_slots,
            start_date,
            end_date,
            status,
            active_date,
            created_at,
        })
    }

    /// Contest identifier.
    pub fn id(&self) -> ContestId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Prize amount.
    pub fn prize(&self) -> f64 {
        self.prize
    }

    /// Capacity.
    pub fn total_slots(&self) -> u32 {
        self.total_slots
    }

    /// Free slots at the time of the read.
    pub fn remaining_slots(&self) -> u32 {
        self.remaining_slots
    }

    /// Start of the registration window.
    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// End of the registration window.
    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    /// Stored status, without accounting for an elapsed window.
    pub fn status(&self) -> ContestStatus {
        self.status
    }

    /// When the contest was last activated.
    pub fn active_date(&self) -> DateTime<Utc> {
        self.active_date
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Status as observed at `now`: an elapsed window reads as closed.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ContestStatus {
        effective_status(self.status, self.end_date, now)
    }

    /// Whether the contest accepts registrations at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == ContestStatus::Active
    }

    /// Copy of the contest with its status replaced by the effective status.
    #[must_use]
    pub fn as_of(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }
}

impl From<&Contest> for ContestDraft {
    fn from(contest: &Contest) -> Self {
        Self {
            id: contest.id,
            name: contest.name.clone(),
            prize: contest.prize,
            total_slots: contest.total_slots,
            remaining_slots: contest.remaining_slots,
            start_date: contest.start_date,
            end_date: contest.end_date,
            status: contest.status,
            active_date: contest.active_date,
            created_at: contest.created_at,
        }
    }
}

/// Shared closure rule for contests and ledger snapshots.
pub(crate) fn effective_status(
    stored: ContestStatus,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ContestStatus {
    if now >= end_date {
        ContestStatus::Closed
    } else {
        stored
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("fixture timestamp")
            .with_timezone(&Utc)
    }

    fn request(now: DateTime<Utc>) -> NewContest {
        NewContest {
            name: "Spring Cup".to_owned(),
            prize: 100.0,
            total_slots: 3,
            start_date: now,
            end_date: now + Duration::days(1),
        }
    }

    #[rstest]
    fn create_sets_capacity_and_active_date(now: DateTime<Utc>) {
        let contest =
            Contest::create(ContestId::random(), request(now), now).expect("valid contest");

        assert_eq!(contest.total_slots(), 3);
        assert_eq!(contest.remaining_slots(), 3);
        assert_eq!(contest.active_date(), contest.start_date());
        assert_eq!(contest.created_at(), now);
        assert_eq!(contest.status(), ContestStatus::Active);
    }

    #[rstest]
    fn create_trims_name(now: DateTime<Utc>) {
        let mut req = request(now);
        req.name = "  Spring Cup  ".to_owned();
        let contest = Contest::create(ContestId::random(), req, now).expect("valid contest");
        assert_eq!(contest.name(), "Spring Cup");
    }

    #[rstest]
    #[case::blank_name(NewContest { name: "  ".to_owned(), ..request(now()) }, "empty_name")]
    #[case::zero_slots(NewContest { total_slots: 0, ..request(now()) }, "non_positive_slots")]
    #[case::negative_slots(NewContest { total_slots: -4, ..request(now()) }, "non_positive_slots")]
    #[case::huge_slots(NewContest { total_slots: i64::from(MAX_TOTAL_SLOTS) + 1, ..request(now()) }, "too_many_slots")]
    #[case::negative_prize(NewContest { prize: -1.0, ..request(now()) }, "invalid_prize")]
    #[case::nan_prize(NewContest { prize: f64::NAN, ..request(now()) }, "invalid_prize")]
    #[case::equal_window(NewContest { end_date: now(), ..request(now()) }, "window_inverted")]
    #[case::inverted_window(NewContest { end_date: now() - Duration::hours(1), ..request(now()) }, "window_inverted")]
    fn create_rejects_invalid_requests(#[case] req: NewContest, #[case] code: &str) {
        let err = Contest::create(ContestId::random(), req, now()).expect_err("invalid contest");
        assert_eq!(err.code(), code);
    }

    #[rstest]
    fn rehydration_rejects_remaining_above_total(now: DateTime<Utc>) {
        let err = Contest::new(ContestDraft {
            id: ContestId::random(),
            name: "Overbooked".to_owned(),
            prize: 0.0,
            total_slots: 2,
            remaining_slots: 3,
            start_date: now,
            end_date: now + Duration::hours(1),
            status: ContestStatus::Active,
            active_date: now,
            created_at: now,
        })
        .expect_err("remaining exceeds total");
        assert_eq!(
            err,
            ContestValidationError::RemainingOutOfRange {
                remaining: 3,
                total: 2
            }
        );
    }

    #[rstest]
    #[case(Duration::minutes(-1), ContestStatus::Active)]
    #[case(Duration::zero(), ContestStatus::Closed)]
    #[case(Duration::minutes(1), ContestStatus::Closed)]
    fn elapsed_window_reads_as_closed(
        now: DateTime<Utc>,
        #[case] offset_from_end: Duration,
        #[case] expected: ContestStatus,
    ) {
        let contest =
            Contest::create(ContestId::random(), request(now), now).expect("valid contest");
        let observed_at = contest.end_date() + offset_from_end;

        assert_eq!(contest.effective_status(observed_at), expected);
        assert_eq!(contest.clone().as_of(observed_at).status(), expected);
    }

    #[rstest]
    fn contest_is_open_before_its_start_date(now: DateTime<Utc>) {
        let contest =
            Contest::create(ContestId::random(), request(now), now).expect("valid contest");
        assert!(contest.is_open_at(now - Duration::days(3)));
    }

    #[rstest]
    #[case("active", ContestStatus::Active)]
    #[case("closed", ContestStatus::Closed)]
    fn status_round_trips_through_storage_form(#[case] raw: &str, #[case] status: ContestStatus) {
        assert_eq!(raw.parse::<ContestStatus>(), Ok(status));
        assert_eq!(status.as_str(), raw);
    }

    #[rstest]
    fn unknown_status_is_rejected() {
        assert!("paused".parse::<ContestStatus>().is_err());
    }
}
