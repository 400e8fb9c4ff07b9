//! Team HTTP handlers.
//!
//! ```text
//! POST /api/v1/teams
//! GET  /api/v1/teams
//! GET  /api/v1/teams/{id}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{NewTeam, Team, TeamId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, require};

/// Request payload for creating a team.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    /// Short unique name.
    #[schema(example = "night-owls")]
    pub name: Option<String>,
    /// Name shown to users.
    #[schema(example = "Night Owls")]
    pub display_name: Option<String>,
}

/// Team representation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    /// Team identifier.
    pub id: String,
    /// Short unique name.
    pub name: String,
    /// Name shown to users.
    pub display_name: String,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<Team> for TeamResponse {
    fn from(value: Team) -> Self {
        Self {
            id: value.id().to_string(),
            name: value.name().to_owned(),
            display_name: value.display_name().to_owned(),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}

/// Create a team.
#[utoipa::path(
    post,
    path = "/api/v1/teams",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema)
    ),
    tags = ["teams"],
    operation_id = "createTeam"
)]
#[post("/teams")]
pub async fn create_team(
    state: web::Data<HttpState>,
    payload: web::Json<CreateTeamRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let request = NewTeam {
        name: require(payload.name, FieldName::new("name"))?,
        display_name: require(payload.display_name, FieldName::new("displayName"))?,
    };
    let team = state.teams.create_team(request).await?;
    Ok(HttpResponse::Created().json(TeamResponse::from(team)))
}

/// List every team, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/teams",
    responses(
        (status = 200, description = "Teams", body = [TeamResponse]),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["teams"],
    operation_id = "listTeams"
)]
#[get("/teams")]
pub async fn list_teams(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<TeamResponse>>> {
    let teams = state.teams_query.list_teams().await?;
    Ok(web::Json(teams.into_iter().map(TeamResponse::from).collect()))
}

/// Fetch a team.
#[utoipa::path(
    get,
    path = "/api/v1/teams/{id}",
    params(("id" = String, Path, description = "Team identifier")),
    responses(
        (status = 200, description = "Team", body = TeamResponse),
        (status = 400, description = "Invalid team id", body = ErrorSchema),
        (status = 404, description = "Team not found", body = ErrorSchema)
    ),
    tags = ["teams"],
    operation_id = "getTeam"
)]
#[get("/teams/{id}")]
pub async fn get_team(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<TeamResponse>> {
    let id: TeamId = parse_id(&path.into_inner(), FieldName::new("teamId"))?;
    let team = state.teams_query.get_team(id).await?;
    Ok(web::Json(TeamResponse::from(team)))
}
