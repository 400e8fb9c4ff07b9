//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerSettings;
pub use state_builders::{ServiceOptions, build_diesel_http_state};

use std::net::SocketAddr;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use backend::Trace;
#[cfg(debug_assertions)]
use backend::doc::ApiDoc;
use backend::inbound::http::contests::{
    close_contest, create_contest, delete_contest, get_contest, set_remaining_slots,
};
use backend::inbound::http::health::{HealthState, live, ready};
use backend::inbound::http::registrations::{
    get_registration, join_contest, leave_contest, switch_contest,
};
use backend::inbound::http::state::HttpState;
use backend::inbound::http::teams::{create_team, get_team, list_teams};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Register every API handler. Literal segments are registered before the
/// `{id}` patterns they could otherwise be mistaken for.
fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(join_contest)
        .service(switch_contest)
        .service(leave_contest)
        .service(get_registration)
        .service(create_contest)
        .service(get_contest)
        .service(delete_contest)
        .service(set_remaining_slots)
        .service(close_contest)
        .service(create_team)
        .service(list_teams)
        .service(get_team);
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(api_routes))
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server and flag readiness once it is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    bind_addr: SocketAddr,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
