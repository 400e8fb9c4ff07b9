//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use crate::domain::ports::{
    MockContestCommand, MockContestQuery, MockRegistrationCommand, MockRegistrationQuery,
    MockTeamCommand, MockTeamQuery,
};
use crate::inbound::http::state::HttpState;
use crate::middleware::Trace;

/// Mocked driving ports. Unconfigured mocks panic when called, which keeps
/// validation tests honest about never reaching the domain.
#[derive(Default)]
pub struct MockPorts {
    /// Mock for contest commands.
    pub contests: MockContestCommand,
    /// Mock for contest queries.
    pub contests_query: MockContestQuery,
    /// Mock for team commands.
    pub teams: MockTeamCommand,
    /// Mock for team queries.
    pub teams_query: MockTeamQuery,
    /// Mock for registration commands.
    pub registrations: MockRegistrationCommand,
    /// Mock for registration queries.
    pub registrations_query: MockRegistrationQuery,
}

impl MockPorts {
    /// Wrap each mock behind its port.
    pub fn into_state(self) -> HttpState {
        HttpState {
            contests: Arc::new(self.contests),
            contests_query: Arc::new(self.contests_query),
            teams: Arc::new(self.teams),
            teams_query: Arc::new(self.teams_query),
            registrations: Arc::new(self.registrations),
            registrations_query: Arc::new(self.registrations_query),
        }
    }
}

/// Build an app that mounts `configure` under `/api/v1` behind the trace
/// middleware.
pub fn test_app<F>(
    ports: MockPorts,
    configure: F,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    F: FnOnce(&mut web::ServiceConfig),
{
    App::new()
        .app_data(web::Data::new(ports.into_state()))
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure))
}
