//! Read model of a user as seen by contest registration.
//!
//! Users live in an external table; registration only reads their age and
//! the cached `selected_contest_id`.

use super::{ContestId, UserId};

/// A user that may enter contests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrant {
    id: UserId,
    age: u32,
    selected_contest_id: Option<ContestId>,
}

impl Entrant {
    /// Build an entrant from a stored user row.
    pub fn new(id: UserId, age: u32, selected_contest_id: Option<ContestId>) -> Self {
        Self {
            id,
            age,
            selected_contest_id,
        }
    }

    /// User identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Age in whole years.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Cached contest selection. The occupancy record is authoritative.
    pub fn selected_contest_id(&self) -> Option<ContestId> {
        self.selected_contest_id
    }
}
