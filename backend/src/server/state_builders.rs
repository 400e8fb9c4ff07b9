//! Builders wiring persistence adapters into domain services and HTTP state.

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use backend::domain::ports::{
    ContestRepository, EntrantRepository, TeamRepository, UnitOfWork,
};
use backend::domain::{
    CapacityLedger, ContestDirectory, EligibilityGate, RegistrationEngine, TeamDirectory,
};
use backend::inbound::http::state::HttpState;
use backend::outbound::persistence::{
    DbPool, DieselContestRepository, DieselEntrantRepository, DieselTeamRepository,
    DieselUnitOfWork,
};

/// Knobs that shape the registration services.
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    pub minimum_age: u32,
    pub operation_timeout: Duration,
}

/// Outbound adapters the services are built from.
pub struct Adapters<U, C, T, E> {
    pub unit_of_work: Arc<U>,
    pub contests: Arc<C>,
    pub teams: Arc<T>,
    pub entrants: Arc<E>,
}

impl Adapters<DieselUnitOfWork, DieselContestRepository, DieselTeamRepository, DieselEntrantRepository> {
    /// PostgreSQL adapters sharing one pool.
    pub fn diesel(pool: &DbPool) -> Self {
        Self {
            unit_of_work: Arc::new(DieselUnitOfWork::new(pool.clone())),
            contests: Arc::new(DieselContestRepository::new(pool.clone())),
            teams: Arc::new(DieselTeamRepository::new(pool.clone())),
            entrants: Arc::new(DieselEntrantRepository::new(pool.clone())),
        }
    }
}

/// Build the shared HTTP state from adapters and options.
pub fn build_http_state<U, C, T, E>(
    adapters: Adapters<U, C, T, E>,
    options: ServiceOptions,
    clock: Arc<dyn Clock>,
) -> web::Data<HttpState>
where
    U: UnitOfWork + 'static,
    C: ContestRepository + 'static,
    T: TeamRepository + 'static,
    E: EntrantRepository + 'static,
{
    let ledger = CapacityLedger::new(adapters.unit_of_work, clock.clone());
    let engine = RegistrationEngine::new(
        ledger,
        adapters.contests.clone(),
        adapters.entrants,
        EligibilityGate::with_minimum_age(options.minimum_age),
        clock.clone(),
    )
    .with_deadline(options.operation_timeout);

    web::Data::new(HttpState::from_services(
        Arc::new(ContestDirectory::new(adapters.contests, clock.clone())),
        Arc::new(TeamDirectory::new(adapters.teams, clock)),
        Arc::new(engine),
    ))
}

/// Production wiring: Diesel adapters and the system clock.
pub fn build_diesel_http_state(pool: &DbPool, options: ServiceOptions) -> web::Data<HttpState> {
    build_http_state(Adapters::diesel(pool), options, Arc::new(DefaultClock))
}
