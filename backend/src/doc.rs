//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers every handler in the inbound
//! layer along with the [`ErrorSchema`] and [`ErrorCodeSchema`] wrappers that
//! describe domain errors without coupling domain types to utoipa.
//!
//! The generated specification is served by Swagger UI in debug builds.

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::OpenApi;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Contest registration API",
        description = "Contests, teams and capacity-checked slot registration."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::contests::create_contest,
        crate::inbound::http::contests::get_contest,
        crate::inbound::http::contests::delete_contest,
        crate::inbound::http::contests::set_remaining_slots,
        crate::inbound::http::contests::close_contest,
        crate::inbound::http::registrations::join_contest,
        crate::inbound::http::registrations::switch_contest,
        crate::inbound::http::registrations::leave_contest,
        crate::inbound::http::registrations::get_registration,
        crate::inbound::http::teams::create_team,
        crate::inbound::http::teams::list_teams,
        crate::inbound::http::teams::get_team,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "contests", description = "Contest administration"),
        (name = "registrations", description = "Joining, switching and leaving contests"),
        (name = "teams", description = "Team management"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
