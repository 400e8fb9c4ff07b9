//! In-memory implementation of every outbound port.
//!
//! Transactions are fully serialised: `begin` takes an owned lock on the whole
//! store and works on a private copy that `commit` writes back. Dropping a
//! transaction (or calling `rollback`) discards the copy. This is stricter
//! than row locking but exercises the same ledger contract, so concurrency
//! property tests can run without PostgreSQL.
//!
//! Fault hooks let tests force connection failures, commit conflicts and
//! stalls inside a transaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::ports::{
    ContestDeletion, ContestRepository, ContestRepositoryError, ContestSlots, EntrantRepository,
    EntrantRepositoryError, LedgerTransaction, LockedEntrant, SlotOverride, StoreError,
    TeamRepository, TeamRepositoryError, UnitOfWork,
};
use crate::domain::{
    Contest, ContestDraft, ContestId, ContestStatus, Entrant, Team, TeamId, UserId,
};

#[derive(Debug, Clone, Copy)]
struct EntrantRow {
    age: u32,
    selected_contest_id: Option<ContestId>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    contests: BTreeMap<ContestId, ContestDraft>,
    teams: Vec<Team>,
    entrants: HashMap<UserId, EntrantRow>,
    occupancy: HashMap<UserId, ContestId>,
}

impl StoreState {
    fn occupants(&self, contest_id: ContestId) -> u32 {
        let count = self
            .occupancy
            .values()
            .filter(|held| **held == contest_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_begin: Option<StoreError>,
    fail_commit: Option<StoreError>,
    stall: Option<Duration>,
}

#[derive(Debug, Default)]
struct Shared {
    faults: Mutex<Faults>,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Shared {
    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Shared in-memory store. Clones observe the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<AsyncMutex<StoreState>>,
    shared: Arc<Shared>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user row with no registration.
    pub async fn add_entrant(&self, user_id: UserId, age: u32) {
        self.state.lock().await.entrants.insert(
            user_id,
            EntrantRow {
                age,
                selected_contest_id: None,
            },
        );
    }

    /// Seed a contest as stored, bypassing the repository.
    pub async fn add_contest(&self, contest: &Contest) {
        self.state
            .lock()
            .await
            .contests
            .insert(contest.id(), ContestDraft::from(contest));
    }

    /// Stored free-slot counter; `None` for an unknown contest.
    pub async fn remaining_slots(&self, contest_id: ContestId) -> Option<u32> {
        self.state
            .lock()
            .await
            .contests
            .get(&contest_id)
            .map(|draft| draft.remaining_slots)
    }

    /// Occupancy records referencing the contest.
    pub async fn occupants(&self, contest_id: ContestId) -> u32 {
        self.state.lock().await.occupants(contest_id)
    }

    /// Contest held according to the occupancy record.
    pub async fn occupancy_of(&self, user_id: UserId) -> Option<ContestId> {
        self.state.lock().await.occupancy.get(&user_id).copied()
    }

    /// Cached selection on the user row.
    pub async fn selected_contest(&self, user_id: UserId) -> Option<ContestId> {
        self.state
            .lock()
            .await
            .entrants
            .get(&user_id)
            .and_then(|row| row.selected_contest_id)
    }

    /// Overwrite the cache column without touching occupancy.
    pub async fn set_selected_cache(&self, user_id: UserId, contest_id: Option<ContestId>) {
        if let Some(row) = self.state.lock().await.entrants.get_mut(&user_id) {
            row.selected_contest_id = contest_id;
        }
    }

    /// Insert an occupancy record without touching `remaining_slots`.
    pub async fn force_occupancy(&self, user_id: UserId, contest_id: ContestId) {
        self.state.lock().await.occupancy.insert(user_id, contest_id);
    }

    /// Whether `remaining + occupancy == total` holds for every contest.
    pub async fn capacity_balanced(&self) -> bool {
        let state = self.state.lock().await;
        state.contests.values().all(|draft| {
            draft.remaining_slots.checked_add(state.occupants(draft.id)) == Some(draft.total_slots)
        })
    }

    /// Fail the next `begin` with `error`.
    pub fn fail_next_begin(&self, error: StoreError) {
        self.shared.faults().fail_begin = Some(error);
    }

    /// Fail the next `commit` with `error`; the writes are discarded.
    pub fn fail_next_commit(&self, error: StoreError) {
        self.shared.faults().fail_commit = Some(error);
    }

    /// Make every remaining-slot write inside a transaction sleep first.
    pub fn stall_writes(&self, duration: Duration) {
        self.shared.faults().stall = Some(duration);
    }

    /// Transactions committed so far.
    pub fn commits(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    /// Transactions rolled back, explicitly or on drop.
    pub fn rollbacks(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
    shared: Arc<Shared>,
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        if let Some(error) = self.shared.faults().fail_begin.take() {
            return Err(error);
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            shared: Arc::clone(&self.shared),
        }))
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn lock_entrant(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<LockedEntrant>, StoreError> {
        Ok(self
            .working
            .entrants
            .get(&user_id)
            .map(|row| LockedEntrant {
                user_id,
                selected_contest_id: row.selected_contest_id,
            }))
    }

    async fn lock_contest(
        &mut self,
        contest_id: ContestId,
    ) -> Result<Option<ContestSlots>, StoreError> {
        Ok(self
            .working
            .contests
            .get(&contest_id)
            .map(|draft| ContestSlots {
                contest_id,
                total_slots: draft.total_slots,
                remaining_slots: draft.remaining_slots,
                status: draft.status,
                end_date: draft.end_date,
            }))
    }

    async fn occupied_contest(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<ContestId>, StoreError> {
        Ok(self.working.occupancy.get(&user_id).copied())
    }

    async fn count_occupancy(&mut self, contest_id: ContestId) -> Result<u32, StoreError> {
        Ok(self.working.occupants(contest_id))
    }

    async fn insert_occupancy(
        &mut self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<(), StoreError> {
        if self.working.occupancy.contains_key(&user_id) {
            return Err(StoreError::conflict(format!(
                "user {user_id} already holds a slot"
            )));
        }
        self.working.occupancy.insert(user_id, contest_id);
        Ok(())
    }

    async fn delete_occupancy(
        &mut self,
        user_id: UserId,
        contest_id: ContestId,
    ) -> Result<bool, StoreError> {
        if self.working.occupancy.get(&user_id) == Some(&contest_id) {
            self.working.occupancy.remove(&user_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn write_remaining_slots(
        &mut self,
        contest_id: ContestId,
        remaining_slots: u32,
    ) -> Result<(), StoreError> {
        let stall = self.shared.faults().stall;
        if let Some(duration) = stall {
            tokio::time::sleep(duration).await;
        }
        let draft = self
            .working
            .contests
            .get_mut(&contest_id)
            .ok_or_else(|| StoreError::query(format!("contest {contest_id} missing")))?;
        if remaining_slots > draft.total_slots {
            return Err(StoreError::query("remaining_slots check constraint"));
        }
        draft.remaining_slots = remaining_slots;
        Ok(())
    }

    async fn write_selected_contest(
        &mut self,
        user_id: UserId,
        contest_id: Option<ContestId>,
    ) -> Result<(), StoreError> {
        let row = self
            .working
            .entrants
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::query(format!("user {user_id} missing")))?;
        row.selected_contest_id = contest_id;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self {
            mut guard,
            working,
            shared,
        } = *self;
        if let Some(error) = shared.faults().fail_commit.take() {
            shared.rollbacks.fetch_add(1, Ordering::SeqCst);
            return Err(error);
        }
        *guard = working;
        shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn rehydrate(draft: &ContestDraft) -> Result<Contest, ContestRepositoryError> {
    Contest::new(draft.clone()).map_err(|error| ContestRepositoryError::query(error.to_string()))
}

#[async_trait]
impl ContestRepository for InMemoryStore {
    async fn insert(&self, contest: &Contest) -> Result<(), ContestRepositoryError> {
        let mut state = self.state.lock().await;
        if state.contests.contains_key(&contest.id()) {
            return Err(ContestRepositoryError::query(format!(
                "contest {} already exists",
                contest.id()
            )));
        }
        state
            .contests
            .insert(contest.id(), ContestDraft::from(contest));
        Ok(())
    }

    async fn find_by_id(&self, id: &ContestId) -> Result<Option<Contest>, ContestRepositoryError> {
        self.state
            .lock()
            .await
            .contests
            .get(id)
            .map(rehydrate)
            .transpose()
    }

    async fn delete_if_vacant(
        &self,
        id: &ContestId,
    ) -> Result<ContestDeletion, ContestRepositoryError> {
        let mut state = self.state.lock().await;
        if !state.contests.contains_key(id) {
            return Ok(ContestDeletion::NotFound);
        }
        let occupants = state.occupants(*id);
        if occupants > 0 {
            return Ok(ContestDeletion::Occupied { occupants });
        }
        state.contests.remove(id);
        for row in state.entrants.values_mut() {
            if row.selected_contest_id == Some(*id) {
                row.selected_contest_id = None;
            }
        }
        Ok(ContestDeletion::Deleted)
    }

    async fn set_remaining_slots(
        &self,
        id: &ContestId,
        remaining_slots: u32,
    ) -> Result<SlotOverride, ContestRepositoryError> {
        let mut state = self.state.lock().await;
        let occupants = state.occupants(*id);
        let Some(draft) = state.contests.get_mut(id) else {
            return Ok(SlotOverride::NotFound);
        };
        if remaining_slots > draft.total_slots {
            return Ok(SlotOverride::OutOfRange {
                total_slots: draft.total_slots,
            });
        }
        draft.remaining_slots = remaining_slots;
        let contest = rehydrate(draft)?;
        Ok(SlotOverride::Applied { contest, occupants })
    }

    async fn close(&self, id: &ContestId) -> Result<Option<Contest>, ContestRepositoryError> {
        let mut state = self.state.lock().await;
        state
            .contests
            .get_mut(id)
            .map(|draft| {
                draft.status = ContestStatus::Closed;
                rehydrate(draft)
            })
            .transpose()
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn insert(&self, team: &Team) -> Result<(), TeamRepositoryError> {
        let mut state = self.state.lock().await;
        if state.teams.iter().any(|existing| existing.id() == team.id()) {
            return Err(TeamRepositoryError::query(format!(
                "team {} already exists",
                team.id()
            )));
        }
        state.teams.push(team.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, TeamRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .teams
            .iter()
            .find(|team| team.id() == *id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Team>, TeamRepositoryError> {
        let mut teams = self.state.lock().await.teams.clone();
        teams.sort_by_key(Team::created_at);
        Ok(teams)
    }
}

#[async_trait]
impl EntrantRepository for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Entrant>, EntrantRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .entrants
            .get(id)
            .map(|row| Entrant::new(*id, row.age, row.selected_contest_id)))
    }

    async fn occupied_contest(
        &self,
        id: &UserId,
    ) -> Result<Option<ContestId>, EntrantRepositoryError> {
        Ok(self.state.lock().await.occupancy.get(id).copied())
    }
}
