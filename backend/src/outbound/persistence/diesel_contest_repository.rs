//! PostgreSQL-backed `ContestRepository` implementation using Diesel ORM.
//!
//! Deletion and the administrative override lock the contest row and count
//! occupancy in the same transaction, so neither races a ledger operation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{
    ContestDeletion, ContestRepository, ContestRepositoryError, SlotOverride,
};
use crate::domain::{Contest, ContestId, ContestStatus};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{ContestRow, NewContestRow, RowConversionError, to_i32, to_u32};
use super::pool::{DbPool, PoolError};
use super::schema::{contest, user_contest};

/// Diesel-backed implementation of the `ContestRepository` port.
#[derive(Clone)]
pub struct DieselContestRepository {
    pool: DbPool,
}

impl DieselContestRepository {
    /// Create a new adapter backed by the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ContestRepositoryError {
    map_basic_pool_error(error, |message| ContestRepositoryError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> ContestRepositoryError {
    map_basic_diesel_error(
        error,
        ContestRepositoryError::query,
        ContestRepositoryError::connection,
    )
}

fn map_row_error(error: RowConversionError) -> ContestRepositoryError {
    ContestRepositoryError::query(error.to_string())
}

/// Failure inside a repository transaction: either Diesel or a corrupt row.
enum TxError {
    Diesel(diesel::result::Error),
    Row(RowConversionError),
}

impl From<diesel::result::Error> for TxError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<TxError> for ContestRepositoryError {
    fn from(value: TxError) -> Self {
        match value {
            TxError::Diesel(error) => map_diesel_error(error),
            TxError::Row(error) => map_row_error(error),
        }
    }
}

fn count_to_u32(count: i64) -> Result<u32, TxError> {
    u32::try_from(count).map_err(|_| {
        TxError::Row(RowConversionError::OutOfRange {
            column: "occupancy",
            value: count,
        })
    })
}

#[async_trait]
impl ContestRepository for DieselContestRepository {
    async fn insert(&self, value: &Contest) -> Result<(), ContestRepositoryError> {
        let row = NewContestRow::from_contest(value).map_err(map_row_error)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(contest::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: &ContestId) -> Result<Option<Contest>, ContestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ContestRow> = contest::table
            .filter(contest::id.eq(id.as_uuid()))
            .select(ContestRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(ContestRow::into_contest)
            .transpose()
            .map_err(map_row_error)
    }

    async fn delete_if_vacant(
        &self,
        id: &ContestId,
    ) -> Result<ContestDeletion, ContestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let contest_id = *id.as_uuid();
        let outcome = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let locked: Option<uuid::Uuid> = contest::table
                        .filter(contest::id.eq(contest_id))
                        .select(contest::id)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    if locked.is_none() {
                        return Ok(ContestDeletion::NotFound);
                    }
                    let occupants: i64 = user_contest::table
                        .filter(user_contest::contest_id.eq(contest_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    if occupants > 0 {
                        return Ok(ContestDeletion::Occupied {
                            occupants: count_to_u32(occupants)?,
                        });
                    }
                    diesel::delete(contest::table.filter(contest::id.eq(contest_id)))
                        .execute(conn)
                        .await?;
                    Ok(ContestDeletion::Deleted)
                }
                .scope_boxed()
            })
            .await?;
        Ok(outcome)
    }

    async fn set_remaining_slots(
        &self,
        id: &ContestId,
        remaining_slots: u32,
    ) -> Result<SlotOverride, ContestRepositoryError> {
        let value = to_i32("remaining_slots", remaining_slots).map_err(map_row_error)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let contest_id = *id.as_uuid();
        let outcome = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let total: Option<i32> = contest::table
                        .filter(contest::id.eq(contest_id))
                        .select(contest::total_slots)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(total) = total else {
                        return Ok(SlotOverride::NotFound);
                    };
                    if value > total {
                        return Ok(SlotOverride::OutOfRange {
                            total_slots: to_u32("total_slots", total).map_err(TxError::Row)?,
                        });
                    }
                    let row: ContestRow =
                        diesel::update(contest::table.filter(contest::id.eq(contest_id)))
                            .set(contest::remaining_slots.eq(value))
                            .returning(ContestRow::as_returning())
                            .get_result(conn)
                            .await?;
                    let occupants: i64 = user_contest::table
                        .filter(user_contest::contest_id.eq(contest_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    Ok(SlotOverride::Applied {
                        contest: row.into_contest().map_err(TxError::Row)?,
                        occupants: count_to_u32(occupants)?,
                    })
                }
                .scope_boxed()
            })
            .await?;
        Ok(outcome)
    }

    async fn close(&self, id: &ContestId) -> Result<Option<Contest>, ContestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ContestRow> =
            diesel::update(contest::table.filter(contest::id.eq(id.as_uuid())))
                .set(contest::status.eq(ContestStatus::Closed.as_str()))
                .returning(ContestRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
        row.map(ContestRow::into_contest)
            .transpose()
            .map_err(map_row_error)
    }
}
