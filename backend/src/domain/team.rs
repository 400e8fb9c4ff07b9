//! Team aggregate. Independent of contests and registrations.

use chrono::{DateTime, Utc};

use super::TeamId;

/// Maximum length for team names and display names.
pub const TEAM_NAME_MAX: usize = 64;

/// Validation errors returned by [`Team::create`] and [`Team::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TeamValidationError {
    /// The name is blank.
    #[error("team name must not be empty")]
    EmptyName,
    /// The display name is blank.
    #[error("team display name must not be empty")]
    EmptyDisplayName,
    /// A field exceeds [`TEAM_NAME_MAX`].
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Offending request field.
        field: &'static str,
        /// Maximum accepted length.
        max: usize,
    },
}

impl TeamValidationError {
    /// Request field the failure refers to.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyName => "name",
            Self::EmptyDisplayName => "displayName",
            Self::TooLong { field, .. } => *field,
        }
    }

    /// Machine-readable failure code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::EmptyDisplayName => "empty_display_name",
            Self::TooLong { .. } => "too_long",
        }
    }
}

/// Input for creating a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeam {
    /// Short unique name.
    pub name: String,
    /// Name shown to users.
    pub display_name: String,
}

/// Validated team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    id: TeamId,
    name: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

fn validate(
    value: &str,
    field: &'static str,
    empty: TeamValidationError,
) -> Result<String, TeamValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(empty);
    }
    if trimmed.chars().count() > TEAM_NAME_MAX {
        return Err(TeamValidationError::TooLong {
            field,
            max: TEAM_NAME_MAX,
        });
    }
    Ok(trimmed.to_owned())
}

impl Team {
    /// Validate a creation request.
    pub fn create(
        id: TeamId,
        request: NewTeam,
        now: DateTime<Utc>,
    ) -> Result<Self, TeamValidationError> {
        Self::new(id, request, now)
    }

    /// Build a team from stored or requested fields.
    pub fn new(
        id: TeamId,
        fields: NewTeam,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TeamValidationError> {
        let name = validate(&fields.name, "name", TeamValidationError::EmptyName)?;
        let display_name = validate(
            &fields.display_name,
            "displayName",
            TeamValidationError::EmptyDisplayName,
        )?;
        Ok(Self {
            id,
            name,
            display_name,
            created_at,
        })
    }

    /// Team identifier.
    pub fn id(&self) -> TeamId {
        self.id
    }

    /// Short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown to users.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
