//! Contest directory: creation, lookup, closure and administrative overrides.
//!
//! Validation happens before the repository is touched. Capacity changes
//! driven by registrations belong to the capacity ledger; the only slot write
//! here is the bounded administrative override, which does not reconcile
//! against occupancy and logs a warning when the two disagree.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use super::ports::{
    ContestCommand, ContestDeletion, ContestQuery, ContestRepository, ContestRepositoryError,
    SlotOverride,
};
use super::{Contest, ContestId, ContestValidationError, Error, NewContest};

/// Contest service implementing the contest driving ports.
pub struct ContestDirectory<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> ContestDirectory<R> {
    /// Create a new service with the given repository and clock.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

fn map_repository_error(error: ContestRepositoryError) -> Error {
    match error {
        ContestRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("contest repository unavailable: {message}"))
        }
        ContestRepositoryError::Query { message } => {
            Error::internal(format!("contest repository error: {message}"))
        }
    }
}

fn validation_error(error: &ContestValidationError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": error.field(),
        "code": error.code(),
    }))
}

fn contest_not_found(id: ContestId) -> Error {
    Error::not_found(format!("contest {id} not found"))
}

#[async_trait]
impl<R> ContestCommand for ContestDirectory<R>
where
    R: ContestRepository,
{
    async fn create_contest(&self, request: NewContest) -> Result<Contest, Error> {
        let contest = Contest::create(ContestId::random(), request, self.clock.utc())
            .map_err(|error| validation_error(&error))?;
        self.repo
            .insert(&contest)
            .await
            .map_err(map_repository_error)?;
        info!(
            contest_id = %contest.id(),
            total_slots = contest.total_slots(),
            "contest created"
        );
        Ok(contest)
    }

    async fn delete_contest(&self, id: ContestId) -> Result<(), Error> {
        match self
            .repo
            .delete_if_vacant(&id)
            .await
            .map_err(map_repository_error)?
        {
            ContestDeletion::Deleted => {
                info!(contest_id = %id, "contest deleted");
                Ok(())
            }
            ContestDeletion::NotFound => Err(contest_not_found(id)),
            ContestDeletion::Occupied { occupants } => Err(Error::conflict(format!(
                "contest {id} still has {occupants} registered users"
            ))
            .with_details(json!({ "occupants": occupants }))
            .with_reason("contest_occupied")),
        }
    }

    async fn set_remaining_slots(
        &self,
        id: ContestId,
        remaining_slots: i64,
    ) -> Result<Contest, Error> {
        let Ok(value) = u32::try_from(remaining_slots) else {
            return Err(
                Error::invalid_request("remaining slots must be a non-negative integer")
                    .with_details(json!({ "field": "remainingSlots" }))
                    .with_reason("remaining_out_of_range"),
            );
        };
        match self
            .repo
            .set_remaining_slots(&id, value)
            .await
            .map_err(map_repository_error)?
        {
            SlotOverride::Applied { contest, occupants } => {
                let expected = contest.total_slots().saturating_sub(occupants);
                if contest.remaining_slots() != expected {
                    warn!(
                        contest_id = %id,
                        remaining_slots = contest.remaining_slots(),
                        occupants,
                        total_slots = contest.total_slots(),
                        "remaining slots overridden out of step with occupancy"
                    );
                } else {
                    info!(contest_id = %id, remaining_slots = value, "remaining slots overridden");
                }
                Ok(contest.as_of(self.clock.utc()))
            }
            SlotOverride::OutOfRange { total_slots } => Err(Error::invalid_request(format!(
                "remaining slots must lie between 0 and {total_slots}"
            ))
            .with_details(json!({ "field": "remainingSlots", "totalSlots": total_slots }))
            .with_reason("remaining_out_of_range")),
            SlotOverride::NotFound => Err(contest_not_found(id)),
        }
    }

    async fn close_contest(&self, id: ContestId) -> Result<Contest, Error> {
        let contest = self
            .repo
            .close(&id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| contest_not_found(id))?;
        info!(contest_id = %id, "contest closed");
        Ok(contest)
    }
}

#[async_trait]
impl<R> ContestQuery for ContestDirectory<R>
where
    R: ContestRepository,
{
    async fn get_contest(&self, id: ContestId) -> Result<Contest, Error> {
        self.repo
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .map(|contest| contest.as_of(self.clock.utc()))
            .ok_or_else(|| contest_not_found(id))
    }
}
