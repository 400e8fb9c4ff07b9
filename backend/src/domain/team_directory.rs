//! Team directory service.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::ports::{TeamCommand, TeamQuery, TeamRepository, TeamRepositoryError};
use super::{Error, NewTeam, Team, TeamId};

/// Team service implementing the team driving ports.
pub struct TeamDirectory<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> TeamDirectory<R> {
    /// Create a new service with the given repository and clock.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

fn map_repository_error(error: TeamRepositoryError) -> Error {
    match error {
        TeamRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("team repository unavailable: {message}"))
        }
        TeamRepositoryError::Query { message } => {
            Error::internal(format!("team repository error: {message}"))
        }
    }
}

#[async_trait]
impl<R> TeamCommand for TeamDirectory<R>
where
    R: TeamRepository,
{
    async fn create_team(&self, request: NewTeam) -> Result<Team, Error> {
        let team = Team::create(TeamId::random(), request, self.clock.utc()).map_err(|error| {
            Error::invalid_request(error.to_string()).with_details(json!({
                "field": error.field(),
                "code": error.code(),
            }))
        })?;
        self.repo.insert(&team).await.map_err(map_repository_error)?;
        info!(team_id = %team.id(), "team created");
        Ok(team)
    }
}

#[async_trait]
impl<R> TeamQuery for TeamDirectory<R>
where
    R: TeamRepository,
{
    async fn get_team(&self, id: TeamId) -> Result<Team, Error> {
        self.repo
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("team {id} not found")))
    }

    async fn list_teams(&self) -> Result<Vec<Team>, Error> {
        self.repo.list().await.map_err(map_repository_error)
    }
}
