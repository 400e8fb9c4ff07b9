//! PostgreSQL-backed `TeamRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{TeamRepository, TeamRepositoryError};
use crate::domain::{Team, TeamId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewTeamRow, RowConversionError, TeamRow};
use super::pool::{DbPool, PoolError};
use super::schema::team;

/// Diesel-backed implementation of the `TeamRepository` port.
#[derive(Clone)]
pub struct DieselTeamRepository {
    pool: DbPool,
}

impl DieselTeamRepository {
    /// Create a new adapter backed by the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> TeamRepositoryError {
    map_basic_pool_error(error, |message| TeamRepositoryError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> TeamRepositoryError {
    map_basic_diesel_error(
        error,
        TeamRepositoryError::query,
        TeamRepositoryError::connection,
    )
}

fn map_row_error(error: RowConversionError) -> TeamRepositoryError {
    TeamRepositoryError::query(error.to_string())
}

#[async_trait]
impl TeamRepository for DieselTeamRepository {
    async fn insert(&self, value: &Team) -> Result<(), TeamRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(team::table)
            .values(&NewTeamRow::from(value))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, TeamRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TeamRow> = team::table
            .filter(team::id.eq(id.as_uuid()))
            .select(TeamRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(TeamRow::into_team)
            .transpose()
            .map_err(map_row_error)
    }

    async fn list(&self) -> Result<Vec<Team>, TeamRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TeamRow> = team::table
            .order((team::created_at.asc(), team::id.asc()))
            .select(TeamRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(TeamRow::into_team)
            .collect::<Result<_, _>>()
            .map_err(map_row_error)
    }
}
