//! Backend entry-point: loads settings, migrates the schema and serves the
//! contest registration API.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::outbound::persistence::{DbPool, run_pending_migrations};
use server::{ServerSettings, ServiceOptions, build_diesel_http_state, create_server};

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {err}"))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().map_err(|err| io_error("failed to load settings", err))?;
    let database_url = settings
        .database_url()
        .map_err(|err| io_error("invalid settings", err))?
        .to_owned();
    let bind_addr = settings
        .bind_addr()
        .map_err(|err| io_error("invalid settings", err))?;
    let options = ServiceOptions {
        minimum_age: settings.minimum_age(),
        operation_timeout: settings
            .operation_timeout()
            .map_err(|err| io_error("invalid settings", err))?,
    };

    run_pending_migrations(database_url)
        .await
        .map_err(|err| io_error("migration failed", err))?;
    let pool_config = settings
        .pool_config()
        .map_err(|err| io_error("invalid settings", err))?;
    let pool = DbPool::new(pool_config)
        .await
        .map_err(|err| io_error("failed to build database pool", err))?;

    let health_state = web::Data::new(HealthState::new());
    let http_state = build_diesel_http_state(&pool, options);
    info!(%bind_addr, minimum_age = options.minimum_age, "starting contest service");
    let server = create_server(health_state.clone(), http_state, bind_addr)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome
}
