//! Contest administration HTTP handlers.
//!
//! ```text
//! POST   /api/v1/contests
//! GET    /api/v1/contests/{id}
//! DELETE /api/v1/contests/{id}
//! PUT    /api/v1/contests/{id}/remaining-slots
//! POST   /api/v1/contests/{id}/close
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Contest, ContestId, Error, NewContest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_rfc3339_timestamp, require};

const CONTEST_ID: FieldName = FieldName::new("contestId");

/// Request payload for creating a contest.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContestRequest {
    /// Display name.
    #[schema(example = "Sunday Millions")]
    pub name: Option<String>,
    /// Non-negative prize amount.
    #[schema(example = 2500.0)]
    pub prize: Option<f64>,
    /// Capacity; every slot starts free.
    #[schema(example = 100)]
    pub total_slots: Option<i64>,
    /// RFC 3339 start of the registration window.
    #[schema(example = "2026-05-10T09:00:00Z")]
    pub start_date: Option<String>,
    /// RFC 3339 end of the registration window.
    #[schema(example = "2026-05-17T09:00:00Z")]
    pub end_date: Option<String>,
}

/// Request payload for the administrative slot override.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemainingSlotsRequest {
    /// New free-slot count, between 0 and the capacity.
    #[schema(example = 42)]
    pub remaining_slots: Option<i64>,
}

/// Contest representation returned by every contest endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContestResponse {
    /// Contest identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Prize amount.
    pub prize: f64,
    /// Capacity.
    pub total_slots: u32,
    /// Free slots at the time of the read.
    pub remaining_slots: u32,
    /// RFC 3339 start of the registration window.
    pub start_date: String,
    /// RFC 3339 end of the registration window.
    pub end_date: String,
    /// `active` or `closed`; an elapsed window reports `closed`.
    pub status: String,
    /// When the contest was last activated.
    pub active_date: String,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<Contest> for ContestResponse {
    fn from(value: Contest) -> Self {
        Self {
            id: value.id().to_string(),
            name: value.name().to_owned(),
            prize: value.prize(),
            total_slots: value.total_slots(),
            remaining_slots: value.remaining_slots(),
            start_date: value.start_date().to_rfc3339(),
            end_date: value.end_date().to_rfc3339(),
            status: value.status().as_str().to_owned(),
            active_date: value.active_date().to_rfc3339(),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}

fn parse_create_request(payload: CreateContestRequest) -> Result<NewContest, Error> {
    let name = require(payload.name, FieldName::new("name"))?;
    let prize = require(payload.prize, FieldName::new("prize"))?;
    let total_slots = require(payload.total_slots, FieldName::new("totalSlots"))?;
    let start_field = FieldName::new("startDate");
    let end_field = FieldName::new("endDate");
    let start_date = require(payload.start_date, start_field)?;
    let end_date = require(payload.end_date, end_field)?;

    Ok(NewContest {
        name,
        prize,
        total_slots,
        start_date: parse_rfc3339_timestamp(&start_date, start_field)?,
        end_date: parse_rfc3339_timestamp(&end_date, end_field)?,
    })
}

fn contest_id(path: web::Path<String>) -> Result<ContestId, Error> {
    parse_id(&path.into_inner(), CONTEST_ID)
}

/// Create a contest with every slot free.
#[utoipa::path(
    post,
    path = "/api/v1/contests",
    request_body = CreateContestRequest,
    responses(
        (status = 201, description = "Contest created", body = ContestResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["contests"],
    operation_id = "createContest"
)]
#[post("/contests")]
pub async fn create_contest(
    state: web::Data<HttpState>,
    payload: web::Json<CreateContestRequest>,
) -> ApiResult<HttpResponse> {
    let request = parse_create_request(payload.into_inner())?;
    let contest = state.contests.create_contest(request).await?;
    Ok(HttpResponse::Created().json(ContestResponse::from(contest)))
}

/// Fetch a contest with its effective status.
#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}",
    params(("id" = String, Path, description = "Contest identifier")),
    responses(
        (status = 200, description = "Contest", body = ContestResponse),
        (status = 400, description = "Invalid contest id", body = ErrorSchema),
        (status = 404, description = "Contest not found", body = ErrorSchema)
    ),
    tags = ["contests"],
    operation_id = "getContest"
)]
#[get("/contests/{id}")]
pub async fn get_contest(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ContestResponse>> {
    let id = contest_id(path)?;
    let contest = state.contests_query.get_contest(id).await?;
    Ok(web::Json(ContestResponse::from(contest)))
}

/// Delete a vacant contest.
#[utoipa::path(
    delete,
    path = "/api/v1/contests/{id}",
    params(("id" = String, Path, description = "Contest identifier")),
    responses(
        (status = 204, description = "Contest deleted"),
        (status = 404, description = "Contest not found", body = ErrorSchema),
        (status = 409, description = "Contest still has registrations", body = ErrorSchema)
    ),
    tags = ["contests"],
    operation_id = "deleteContest"
)]
#[delete("/contests/{id}")]
pub async fn delete_contest(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = contest_id(path)?;
    state.contests.delete_contest(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Administrative override of the remaining slot count.
#[utoipa::path(
    put,
    path = "/api/v1/contests/{id}/remaining-slots",
    params(("id" = String, Path, description = "Contest identifier")),
    request_body = RemainingSlotsRequest,
    responses(
        (status = 200, description = "Updated contest", body = ContestResponse),
        (status = 400, description = "Value outside 0..=totalSlots", body = ErrorSchema),
        (status = 404, description = "Contest not found", body = ErrorSchema)
    ),
    tags = ["contests"],
    operation_id = "setRemainingSlots"
)]
#[put("/contests/{id}/remaining-slots")]
pub async fn set_remaining_slots(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RemainingSlotsRequest>,
) -> ApiResult<web::Json<ContestResponse>> {
    let id = contest_id(path)?;
    let remaining = require(
        payload.into_inner().remaining_slots,
        FieldName::new("remainingSlots"),
    )?;
    let contest = state.contests.set_remaining_slots(id, remaining).await?;
    Ok(web::Json(ContestResponse::from(contest)))
}

/// Stop accepting registrations for a contest.
#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/close",
    params(("id" = String, Path, description = "Contest identifier")),
    responses(
        (status = 200, description = "Closed contest", body = ContestResponse),
        (status = 404, description = "Contest not found", body = ErrorSchema)
    ),
    tags = ["contests"],
    operation_id = "closeContest"
)]
#[post("/contests/{id}/close")]
pub async fn close_contest(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ContestResponse>> {
    let id = contest_id(path)?;
    let contest = state.contests.close_contest(id).await?;
    Ok(web::Json(ContestResponse::from(contest)))
}

#[cfg(test)]
#[path = "contests_tests.rs"]
mod tests;
