//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the domain's driven
//! ports backed by PostgreSQL via Diesel with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: Implementations only translate between Diesel models
//!   and domain types. Capacity rules live in the domain's ledger.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) are never exposed to the domain layer.
//! - **Row locking**: The unit of work holds `FOR UPDATE` locks for the life
//!   of a ledger transaction.
//! - **Strongly typed errors**: All database errors are mapped to port error
//!   types.
//!
//! # Example
//!
//! ```ignore
//! use backend::outbound::persistence::{DbPool, DieselUnitOfWork, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/contests")).await?;
//! let unit_of_work = DieselUnitOfWork::new(pool);
//! ```

mod diesel_contest_repository;
mod diesel_entrant_repository;
mod diesel_error_mapping;
mod diesel_team_repository;
mod diesel_unit_of_work;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_contest_repository::DieselContestRepository;
pub use diesel_entrant_repository::DieselEntrantRepository;
pub use diesel_team_repository::DieselTeamRepository;
pub use diesel_unit_of_work::DieselUnitOfWork;
pub use migrations::{MIGRATIONS, MigrationError, apply_pending_migrations, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
