//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`UnitOfWork`]) expose strongly typed errors
//! generated by `define_port_error!`. Driving ports (`*Command`, `*Query`)
//! return the domain [`Error`](crate::domain::Error).

mod macros;
pub(crate) use macros::define_port_error;

mod contest_command;
mod contest_query;
mod contest_repository;
mod entrant_repository;
mod registration_command;
mod registration_query;
mod team_command;
mod team_query;
mod team_repository;
mod unit_of_work;

#[cfg(test)]
pub use contest_command::MockContestCommand;
pub use contest_command::ContestCommand;
#[cfg(test)]
pub use contest_query::MockContestQuery;
pub use contest_query::ContestQuery;
#[cfg(test)]
pub use contest_repository::MockContestRepository;
pub use contest_repository::{
    ContestDeletion, ContestRepository, ContestRepositoryError, SlotOverride,
};
#[cfg(test)]
pub use entrant_repository::MockEntrantRepository;
pub use entrant_repository::{EntrantRepository, EntrantRepositoryError};
#[cfg(test)]
pub use registration_command::MockRegistrationCommand;
pub use registration_command::{JoinReceipt, LeaveReceipt, RegistrationCommand, SwitchReceipt};
#[cfg(test)]
pub use registration_query::MockRegistrationQuery;
pub use registration_query::RegistrationQuery;
#[cfg(test)]
pub use team_command::MockTeamCommand;
pub use team_command::TeamCommand;
#[cfg(test)]
pub use team_query::MockTeamQuery;
pub use team_query::TeamQuery;
#[cfg(test)]
pub use team_repository::MockTeamRepository;
pub use team_repository::{TeamRepository, TeamRepositoryError};
pub use unit_of_work::{
    ContestSlots, LedgerTransaction, LockedEntrant, StoreError, UnitOfWork,
};
