//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Contest, ContestDraft, ContestId, ContestStatus, ContestValidationError, Entrant, NewTeam,
    Team, TeamId, TeamValidationError, UnknownContestStatus, UserId,
};

use super::schema::{contest, team, user_contest, users};

/// Stored values that cannot be turned back into domain types.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RowConversionError {
    #[error("{column} holds out-of-range value {value}")]
    OutOfRange { column: &'static str, value: i64 },
    #[error(transparent)]
    Status(#[from] UnknownContestStatus),
    #[error("invalid stored contest: {0}")]
    Contest(#[from] ContestValidationError),
    #[error("invalid stored team: {0}")]
    Team(#[from] TeamValidationError),
}

/// Read a non-negative `INTEGER` column into `u32`.
pub(crate) fn to_u32(column: &'static str, value: i32) -> Result<u32, RowConversionError> {
    u32::try_from(value).map_err(|_| RowConversionError::OutOfRange {
        column,
        value: i64::from(value),
    })
}

/// Write a `u32` into an `INTEGER` column.
pub(crate) fn to_i32(column: &'static str, value: u32) -> Result<i32, RowConversionError> {
    i32::try_from(value).map_err(|_| RowConversionError::OutOfRange {
        column,
        value: i64::from(value),
    })
}

// ---------------------------------------------------------------------------
// Contest models
// ---------------------------------------------------------------------------

/// Row struct for reading from the contest table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = contest)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ContestRow {
    pub id: Uuid,
    pub name: String,
    pub prize: f64,
    pub total_slots: i32,
    pub remaining_slots: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub active_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ContestRow {
    pub(crate) fn into_contest(self) -> Result<Contest, RowConversionError> {
        let draft = ContestDraft {
            id: ContestId::from_uuid(self.id),
            name: self.name,
            prize: self.prize,
            total_slots: to_u32("total_slots", self.total_slots)?,
            remaining_slots: to_u32("remaining_slots", self.remaining_slots)?,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status.parse()?,
            active_date: self.active_date,
            created_at: self.created_at,
        };
        Ok(Contest::new(draft)?)
    }
}

/// Insertable struct for creating contest records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contest)]
pub(crate) struct NewContestRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub prize: f64,
    pub total_slots: i32,
    pub remaining_slots: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: &'static str,
    pub active_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewContestRow<'a> {
    pub(crate) fn from_contest(value: &'a Contest) -> Result<Self, RowConversionError> {
        Ok(Self {
            id: *value.id().as_uuid(),
            name: value.name(),
            prize: value.prize(),
            total_slots: to_i32("total_slots", value.total_slots())?,
            remaining_slots: to_i32("remaining_slots", value.remaining_slots())?,
            start_date: value.start_date(),
            end_date: value.end_date(),
            status: value.status().as_str(),
            active_date: value.active_date(),
            created_at: value.created_at(),
        })
    }
}

/// Capacity columns read under `FOR UPDATE` by the ledger.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = contest)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ContestSlotsRow {
    pub id: Uuid,
    pub total_slots: i32,
    pub remaining_slots: i32,
    pub status: String,
    pub end_date: DateTime<Utc>,
}

impl ContestSlotsRow {
    pub(crate) fn status(&self) -> Result<ContestStatus, RowConversionError> {
        Ok(self.status.parse()?)
    }
}

// ---------------------------------------------------------------------------
// Team models
// ---------------------------------------------------------------------------

/// Row struct for reading from the team table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = team)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TeamRow {
    pub id: Uuid,
    pub name: String,
    pub displayname: String,
    pub created_at: DateTime<Utc>,
}

impl TeamRow {
    pub(crate) fn into_team(self) -> Result<Team, RowConversionError> {
        let fields = NewTeam {
            name: self.name,
            display_name: self.displayname,
        };
        Ok(Team::new(TeamId::from_uuid(self.id), fields, self.created_at)?)
    }
}

/// Insertable struct for creating team records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = team)]
pub(crate) struct NewTeamRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub displayname: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Team> for NewTeamRow<'a> {
    fn from(value: &'a Team) -> Self {
        Self {
            id: *value.id().as_uuid(),
            name: value.name(),
            displayname: value.display_name(),
            created_at: value.created_at(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entrant and occupancy models
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EntrantRow {
    pub id: Uuid,
    pub age: i32,
    pub selected_contest_id: Option<Uuid>,
}

impl EntrantRow {
    pub(crate) fn into_entrant(self) -> Result<Entrant, RowConversionError> {
        Ok(Entrant::new(
            UserId::from_uuid(self.id),
            to_u32("age", self.age)?,
            self.selected_contest_id.map(ContestId::from_uuid),
        ))
    }
}

/// Insertable occupancy record.
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = user_contest)]
pub(crate) struct NewOccupancyRow {
    pub user_id: Uuid,
    pub contest_id: Uuid,
}
