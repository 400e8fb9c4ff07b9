//! PostgreSQL-backed `UnitOfWork` for the capacity ledger.
//!
//! Each transaction owns a pooled connection for its whole life. Row locks
//! are taken with `SELECT ... FOR UPDATE` and released at commit or rollback.
//! A transaction dropped before it finishes (for example when the engine's
//! deadline fires) spawns a rollback on the current runtime; if no runtime is
//! available the connection still reports an open transaction and the pool
//! discards it instead of handing it out again.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::ports::{
    ContestSlots, LedgerTransaction, LockedEntrant, StoreError, UnitOfWork,
};
use crate::domain::{ContestId, UserId};

use super::diesel_error_mapping::{map_store_pool_error, map_transactional_diesel_error};
use super::models::{ContestSlotsRow, NewOccupancyRow, RowConversionError, to_i32, to_u32};
use super::pool::DbPool;
use super::schema::{contest, user_contest, users};

type OwnedConnection = PooledConnection<'static, AsyncPgConnection>;

/// Diesel-backed implementation of the `UnitOfWork` port.
#[derive(Clone)]
pub struct DieselUnitOfWork {
    pool: DbPool,
}

impl DieselUnitOfWork {
    /// Create a new adapter backed by the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_row_error(error: RowConversionError) -> StoreError {
    StoreError::query(error.to_string())
}

#[async_trait]
impl UnitOfWork for DieselUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        let mut conn = self.pool.get_owned().await.map_err(map_store_pool_error)?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(map_transactional_diesel_error)?;
        Ok(Box::new(DieselLedgerTransaction { conn: Some(conn) }))
    }
}

/// One open PostgreSQL transaction.
struct DieselLedgerTransaction {
    /// `None` once committed or rolled back.
    conn: Option<OwnedConnection>,
}

impl DieselLedgerTransaction {
    fn conn(&mut self) -> Result<&mut AsyncPgConnection, StoreError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| StoreError::query("transaction already finished"))
    }

    fn take(&mut self) -> Result<OwnedConnection, StoreError> {
        self.conn
            .take()
            .ok_or_else(|| StoreError::query("transaction already finished"))
    }
}

#[async_trait]
impl LedgerTransaction for DieselLedgerTransaction {
    async fn lock_entrant(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<LockedEntrant>, StoreError> {
        let row: Option<(Uuid, Option<Uuid>)> = users::table
            .filter(users::id.eq(user_id.as_uuid()))
            .select((users::id, users::selected_contest_id))
            .for_update()
            .first(self.conn()?)
            .await
            .optional()
            .map_err(map_transactional_diesel_error)?;
        Ok(row.map(|(id, selected)| LockedEntrant {
            user_id: UserId::from_uuid(id),
            selected_contest_id: selected.map(ContestId::from_uuid),
        }))
    }

    async fn lock_contest(
        &mut self,
        contest_id: ContestId,
    ) -> Result<Option<ContestSlots>, StoreError> {
        let row: Option<ContestSlotsRow> = contest::table
            .filter(contest::id.eq(contest_id.as_uuid()))
            .select(ContestSlotsRow::as_select())
            .for_update()
            .first(self.conn()?)
            .await
            .optional()
            .map_err(map_transactional_diesel_error)?;
        row.map(|row| -> Result<ContestSlots, StoreError> {
            Ok(ContestSlots {
                contest_id: ContestId::from_uuid(row.id),
                total_slots: to_u32("total_slots", row.total_slots).map_err(map_row_error)?,
                remaining_slots: to_u32("remaining_slots", row.remaining_slots)
                    .map_err(map_row_error)?,
                status: row.status().map_err(map_row_error)?,
                end_date: row.end_date,
            })
        })
        .transpose()
    }

    async fn occupied_contest(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<ContestId>, StoreError> {
        let held: Option<Uuid> = user_contest::table
            .filter(user_contest::user_id.eq(user_id.as_uuid()))
            .select(user_contest::contest_id)
            .first(self.conn()?)
            .await
            .optional()
            .map_err(map_transactional_diesel_error)?;
        Ok(held.map(ContestId::from_uuid))
    }

    async fn count_occupancy(&mut self, contest_id: ContestId) -> Result<u32, StoreError> {
        let count: i64 = user_contest::table
            .filter(user_contest::contest_id.eq(contest_id.as_uuid()))
            .count()
            .get_result(self.conn()?)
            .await
            .map_err(map_transactional_diesel_error)?;
        u32::try_from(count)
            .map_err(|_| StoreError::query(format!("occupancy count {count} out of range")))
    }

    async fn insert_occupancy(
        &mut self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<(), StoreError> {
        let row = NewOccupancyRow {
            user_id: *user_id.as_uuid(),
            contest_id: *contest_id.as_uuid(),
        };
        diesel::insert_into(user_contest::table)
            .values(&row)
            .execute(self.conn()?)
            .await
            .map(|_| ())
            .map_err(map_transactional_diesel_error)
    }

    async fn delete_occupancy(
        &mut self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<bool, StoreError> {
        let deleted = diesel::delete(
            user_contest::table
                .filter(user_contest::user_id.eq(user_id.as_uuid()))
                .filter(user_contest::contest_id.eq(contest_id.as_uuid())),
        )
        .execute(self.conn()?)
        .await
        .map_err(map_transactional_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn write_remaining_slots(
        &mut self,
        contest_id: ContestId,
        remaining_slots: u32,
    ) -> Result<(), StoreError> {
        let value = to_i32("remaining_slots", remaining_slots).map_err(map_row_error)?;
        diesel::update(contest::table.filter(contest::id.eq(contest_id.as_uuid())))
            .set(contest::remaining_slots.eq(value))
            .execute(self.conn()?)
            .await
            .map(|_| ())
            .map_err(map_transactional_diesel_error)
    }

    async fn write_selected_contest(
        &mut self,
        user_id: UserId,
        contest_id: Option<ContestId>,
    ) -> Result<(), StoreError> {
        diesel::update(users::table.filter(users::id.eq(user_id.as_uuid())))
            .set(users::selected_contest_id.eq(contest_id.map(|id| *id.as_uuid())))
            .execute(self.conn()?)
            .await
            .map(|_| ())
            .map_err(map_transactional_diesel_error)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let mut conn = self.take()?;
        AnsiTransactionManager::commit_transaction(&mut *conn)
            .await
            .map_err(map_transactional_diesel_error)
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        let mut conn = self.take()?;
        AnsiTransactionManager::rollback_transaction(&mut *conn)
            .await
            .map_err(map_transactional_diesel_error)
    }
}

impl Drop for DieselLedgerTransaction {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("rolling back abandoned ledger transaction");
                handle.spawn(async move {
                    if let Err(error) = AnsiTransactionManager::rollback_transaction(&mut *conn).await
                    {
                        warn!(%error, "rollback of abandoned ledger transaction failed");
                    }
                });
            }
            Err(_) => warn!("ledger transaction dropped outside a runtime; discarding connection"),
        }
    }
}
