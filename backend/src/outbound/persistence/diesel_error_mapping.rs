//! Shared Diesel error mapping for the persistence adapters.
//!
//! Repositories with plain query semantics use [`map_basic_diesel_error`].
//! Ledger transactions additionally distinguish lost races (serialisation
//! failures, deadlocks and uniqueness conflicts) so the engine can report them
//! as transient.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::StoreError;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

fn log_diesel_failure(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            "diesel operation failed"
        ),
    }
}

/// Map common Diesel error variants into query/connection constructors.
///
/// `NotFound` and query-builder failures map to query errors; a closed
/// connection maps to a connection error.
pub fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    log_diesel_failure(&error);

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(_, _) => query("database error"),
        _ => query("database error"),
    }
}

/// Message PostgreSQL attaches to SQLSTATE 40P01. Diesel has no kind for it
/// and reports `DatabaseErrorKind::Unknown`.
const DEADLOCK_MESSAGE: &str = "deadlock detected";

fn is_deadlock(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::Unknown, info)
            if info.message().starts_with(DEADLOCK_MESSAGE)
    )
}

/// Map Diesel errors raised inside a ledger transaction.
pub fn map_transactional_diesel_error(error: DieselError) -> StoreError {
    if is_deadlock(&error) {
        log_diesel_failure(&error);
        return StoreError::conflict("transaction deadlocked");
    }
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            log_diesel_failure(&error);
            StoreError::conflict("transaction could not be serialised")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            log_diesel_failure(&error);
            StoreError::conflict("concurrent occupancy write")
        }
        other => map_basic_diesel_error(other, StoreError::query, StoreError::connection),
    }
}

/// Map pool checkout failures for the unit of work.
pub fn map_store_pool_error(error: PoolError) -> StoreError {
    map_basic_pool_error(error, StoreError::connection)
}
