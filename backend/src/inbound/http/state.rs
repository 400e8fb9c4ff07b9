//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    ContestCommand, ContestQuery, RegistrationCommand, RegistrationQuery, TeamCommand, TeamQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Contest administration.
    pub contests: Arc<dyn ContestCommand>,
    /// Contest reads.
    pub contests_query: Arc<dyn ContestQuery>,
    /// Team creation.
    pub teams: Arc<dyn TeamCommand>,
    /// Team reads.
    pub teams_query: Arc<dyn TeamQuery>,
    /// Join, switch and leave.
    pub registrations: Arc<dyn RegistrationCommand>,
    /// Registration reads.
    pub registrations_query: Arc<dyn RegistrationQuery>,
}

impl HttpState {
    /// Build state from services that implement both halves of each port pair.
    ///
    /// # Examples
    /// ```ignore
    /// use std::sync::Arc;
    ///
    /// use backend::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::from_services(
    ///     Arc::new(contest_directory),
    ///     Arc::new(team_directory),
    ///     Arc::new(registration_engine),
    /// );
    /// ```
    pub fn from_services<C, T, R>(contests: Arc<C>, teams: Arc<T>, registrations: Arc<R>) -> Self
    where
        C: ContestCommand + ContestQuery + 'static,
        T: TeamCommand + TeamQuery + 'static,
        R: RegistrationCommand + RegistrationQuery + 'static,
    {
        Self {
            contests: contests.clone(),
            contests_query: contests,
            teams: teams.clone(),
            teams_query: teams,
            registrations: registrations.clone(),
            registrations_query: registrations,
        }
    }
}
