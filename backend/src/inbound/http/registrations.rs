//! Registration HTTP handlers: join, switch, leave and lookup.
//!
//! ```text
//! POST   /api/v1/contests/enter
//! PUT    /api/v1/contests/change/{userId}
//! DELETE /api/v1/contests/leave/{userId}
//! GET    /api/v1/registrations/{userId}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{JoinReceipt, LeaveReceipt, SwitchReceipt};
use crate::domain::{ContestId, Error, RegistrationState, ReleaseOutcome, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, require};

const USER_ID: FieldName = FieldName::new("userId");
const CONTEST_ID: FieldName = FieldName::new("contestId");

/// Request payload for joining a contest.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Acting user.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: Option<String>,
    /// Contest to join.
    #[schema(example = "6f1c1a3e-8a39-4a3f-9d6e-0b7f2f1d2c11")]
    pub contest_id: Option<String>,
}

/// Request payload for moving to another contest.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwitchRequest {
    /// Contest to move into.
    #[schema(example = "6f1c1a3e-8a39-4a3f-9d6e-0b7f2f1d2c11")]
    pub contest_id: Option<String>,
}

/// Slot granted by a join.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// Acting user.
    pub user_id: String,
    /// Contest joined.
    pub contest_id: String,
    /// Slots left after the join.
    pub remaining_slots: u32,
}

impl From<JoinReceipt> for JoinResponse {
    fn from(value: JoinReceipt) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            contest_id: value.contest_id.to_string(),
            remaining_slots: value.remaining_slots,
        }
    }
}

/// `remainingSlots` refers to the contest the user moved into.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwitchResponse {
    /// Acting user.
    pub user_id: String,
    /// Contest the slot was released from.
    pub from_contest_id: String,
    /// Contest the slot was taken in.
    pub to_contest_id: String,
    /// Slots left in the target contest.
    pub remaining_slots: u32,
}

impl From<SwitchReceipt> for SwitchResponse {
    fn from(value: SwitchReceipt) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            from_contest_id: value.from.to_string(),
            to_contest_id: value.to.to_string(),
            remaining_slots: value.remaining_slots,
        }
    }
}

/// Outcome of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeaveOutcome {
    /// A slot was returned to the contest.
    Released,
    /// The user held no slot; nothing changed.
    NotRegistered,
}

/// Result of a leave request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    /// Acting user.
    pub user_id: String,
    /// Whether a slot was released.
    pub outcome: LeaveOutcome,
    /// Contest the slot was returned to, when one was released.
    pub contest_id: Option<String>,
}

impl From<LeaveReceipt> for LeaveResponse {
    fn from(value: LeaveReceipt) -> Self {
        let (outcome, contest_id) = match value.outcome {
            ReleaseOutcome::Released(contest_id) => {
                (LeaveOutcome::Released, Some(contest_id.to_string()))
            }
            ReleaseOutcome::NotFound => (LeaveOutcome::NotRegistered, None),
        };
        Self {
            user_id: value.user_id.to_string(),
            outcome,
            contest_id,
        }
    }
}

/// A user's current registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    /// Queried user.
    pub user_id: String,
    /// Whether the user holds a slot.
    pub registered: bool,
    /// Contest holding the slot, if any.
    pub contest_id: Option<String>,
}

impl RegistrationResponse {
    fn new(user_id: UserId, state: RegistrationState) -> Self {
        let contest_id = state.contest_id();
        Self {
            user_id: user_id.to_string(),
            registered: contest_id.is_some(),
            contest_id: contest_id.map(|id| id.to_string()),
        }
    }
}

fn user_id(path: web::Path<String>) -> Result<UserId, Error> {
    parse_id(&path.into_inner(), USER_ID)
}

fn parse_join_request(payload: JoinRequest) -> Result<(UserId, ContestId), Error> {
    let user_id = require(payload.user_id, USER_ID)?;
    let contest_id = require(payload.contest_id, CONTEST_ID)?;
    Ok((parse_id(&user_id, USER_ID)?, parse_id(&contest_id, CONTEST_ID)?))
}

/// Reserve a slot in a contest for a user.
#[utoipa::path(
    post,
    path = "/api/v1/contests/enter",
    request_body = JoinRequest,
    responses(
        (status = 201, description = "Slot reserved", body = JoinResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Contest or user not found", body = ErrorSchema),
        (status = 409, description = "No slots, closed, or already registered", body = ErrorSchema),
        (status = 422, description = "User not eligible", body = ErrorSchema),
        (status = 503, description = "Transient failure; retry", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "joinContest"
)]
#[post("/contests/enter")]
pub async fn join_contest(
    state: web::Data<HttpState>,
    payload: web::Json<JoinRequest>,
) -> ApiResult<HttpResponse> {
    let (user_id, contest_id) = parse_join_request(payload.into_inner())?;
    let receipt = state.registrations.join(user_id, contest_id).await?;
    Ok(HttpResponse::Created().json(JoinResponse::from(receipt)))
}

/// Move a registered user into another contest in one step.
#[utoipa::path(
    put,
    path = "/api/v1/contests/change/{userId}",
    params(("userId" = String, Path, description = "User identifier")),
    request_body = SwitchRequest,
    responses(
        (status = 200, description = "Registration moved", body = SwitchResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Contest or user not found", body = ErrorSchema),
        (status = 409, description = "Target full or closed, or user not registered", body = ErrorSchema),
        (status = 422, description = "User not eligible", body = ErrorSchema),
        (status = 503, description = "Transient failure; retry", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "switchContest"
)]
#[put("/contests/change/{user_id}")]
pub async fn switch_contest(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<SwitchRequest>,
) -> ApiResult<web::Json<SwitchResponse>> {
    let user_id = user_id(path)?;
    let contest_id = require(payload.into_inner().contest_id, CONTEST_ID)?;
    let contest_id = parse_id(&contest_id, CONTEST_ID)?;
    let receipt = state.registrations.switch_to(user_id, contest_id).await?;
    Ok(web::Json(SwitchResponse::from(receipt)))
}

/// Release the user's slot. Leaving when not registered succeeds with
/// `not_registered`.
#[utoipa::path(
    delete,
    path = "/api/v1/contests/leave/{userId}",
    params(("userId" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Leave processed", body = LeaveResponse),
        (status = 400, description = "Invalid user id", body = ErrorSchema),
        (status = 404, description = "User not found", body = ErrorSchema),
        (status = 503, description = "Transient failure; retry", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "leaveContest"
)]
#[delete("/contests/leave/{user_id}")]
pub async fn leave_contest(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<LeaveResponse>> {
    let user_id = user_id(path)?;
    let receipt = state.registrations.leave(user_id).await?;
    Ok(web::Json(LeaveResponse::from(receipt)))
}

/// Current registration for a user.
#[utoipa::path(
    get,
    path = "/api/v1/registrations/{userId}",
    params(("userId" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Registration state", body = RegistrationResponse),
        (status = 400, description = "Invalid user id", body = ErrorSchema),
        (status = 404, description = "User not found", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "getRegistration"
)]
#[get("/registrations/{user_id}")]
pub async fn get_registration(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<RegistrationResponse>> {
    let user_id = user_id(path)?;
    let registration = state.registrations_query.registration(user_id).await?;
    Ok(web::Json(RegistrationResponse::new(user_id, registration)))
}

#[cfg(test)]
#[path = "registrations_tests.rs"]
mod tests;
