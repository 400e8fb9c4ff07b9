//! PostgreSQL-backed `EntrantRepository` over the shared `users` table.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{EntrantRepository, EntrantRepositoryError};
use crate::domain::{ContestId, Entrant, UserId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::EntrantRow;
use super::pool::{DbPool, PoolError};
use super::schema::{user_contest, users};

/// Diesel-backed implementation of the `EntrantRepository` port.
#[derive(Clone)]
pub struct DieselEntrantRepository {
    pool: DbPool,
}

impl DieselEntrantRepository {
    /// Create a new adapter backed by the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EntrantRepositoryError {
    map_basic_pool_error(error, |message| EntrantRepositoryError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> EntrantRepositoryError {
    map_basic_diesel_error(
        error,
        EntrantRepositoryError::query,
        EntrantRepositoryError::connection,
    )
}

#[async_trait]
impl EntrantRepository for DieselEntrantRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Entrant>, EntrantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<EntrantRow> = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(EntrantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(EntrantRow::into_entrant)
            .transpose()
            .map_err(|error| EntrantRepositoryError::query(error.to_string()))
    }

    async fn occupied_contest(
        &self,
        id: &UserId,
    ) -> Result<Option<ContestId>, EntrantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let held: Option<Uuid> = user_contest::table
            .filter(user_contest::user_id.eq(id.as_uuid()))
            .select(user_contest::contest_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(held.map(ContestId::from_uuid))
    }
}
