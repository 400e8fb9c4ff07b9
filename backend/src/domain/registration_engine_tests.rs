//! Tests for the registration engine.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::eligibility::MockEligibilityRule;
use crate::domain::ports::{MockContestRepository, MockEntrantRepository};
use crate::domain::{ErrorCode, Ineligibility, NewContest};
use crate::test_support::{InMemoryStore, MutableClock};

type StoreEngine = RegistrationEngine<InMemoryStore, InMemoryStore, InMemoryStore>;

fn fixture_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-06-01T18:30:00Z")
        .expect("fixture timestamp")
        .with_timezone(&Utc)
}

fn contest(total_slots: i64) -> Contest {
    let now = fixture_now();
    Contest::create(
        ContestId::random(),
        NewContest {
            name: "Summer open".to_owned(),
            prize: 500.0,
            total_slots,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
        },
        now,
    )
    .expect("valid contest")
}

struct Harness {
    store: InMemoryStore,
    clock: Arc<MutableClock>,
    engine: StoreEngine,
}

impl Harness {
    fn with_gate(gate: EligibilityGate) -> Self {
        let store = InMemoryStore::new();
        let clock = Arc::new(MutableClock::new(fixture_now()));
        let shared = Arc::new(store.clone());
        let ledger = CapacityLedger::new(shared.clone(), clock.clone());
        let engine = RegistrationEngine::new(ledger, shared.clone(), shared, gate, clock.clone());
        Self {
            store,
            clock,
            engine,
        }
    }

    async fn contest(&self, total_slots: i64) -> ContestId {
        let contest = contest(total_slots);
        self.store.add_contest(&contest).await;
        contest.id()
    }

    async fn entrant(&self, age: u32) -> UserId {
        let user_id = UserId::random();
        self.store.add_entrant(user_id, age).await;
        user_id
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::with_gate(EligibilityGate::with_minimum_age(18))
}

#[rstest]
#[tokio::test]
async fn join_returns_a_receipt(harness: Harness) {
    let contest_id = harness.contest(5).await;
    let user_id = harness.entrant(21).await;

    let receipt = harness
        .engine
        .join(user_id, contest_id)
        .await
        .expect("join succeeds");

    assert_eq!(
        receipt,
        JoinReceipt {
            user_id,
            contest_id,
            remaining_slots: 4,
        }
    );
    assert_eq!(
        harness.engine.registration(user_id).await,
        Ok(RegistrationState::RegisteredIn(contest_id))
    );
}

#[rstest]
#[tokio::test]
async fn underage_entrant_is_refused_without_touching_the_ledger(harness: Harness) {
    let contest_id = harness.contest(5).await;
    let user_id = harness.entrant(17).await;

    let error = harness
        .engine
        .join(user_id, contest_id)
        .await
        .expect_err("underage");

    assert_eq!(
        error,
        RegistrationError::NotEligible(Ineligibility::Underage {
            age: 17,
            minimum: 18,
        })
    );
    assert_eq!(harness.store.remaining_slots(contest_id).await, Some(5));
    assert_eq!(harness.store.commits() + harness.store.rollbacks(), 0);
}

#[rstest]
#[tokio::test]
async fn additional_rules_apply_without_engine_changes() {
    let mut rule = MockEligibilityRule::new();
    rule.expect_evaluate().returning(|_, _| {
        Err(Ineligibility::Rule {
            rule: "region".to_owned(),
            message: "contest is limited to one region".to_owned(),
        })
    });
    let harness = Harness::with_gate(EligibilityGate::with_minimum_age(18).with_rule(rule));
    let contest_id = harness.contest(5).await;
    let user_id = harness.entrant(40).await;

    let error = RegistrationCommand::join(&harness.engine, user_id, contest_id)
        .await
        .expect_err("rule rejects");

    assert_eq!(error.code(), ErrorCode::Unprocessable);
    assert_eq!(error.reason(), Some("not_eligible"));
    let rule = error
        .details()
        .and_then(|details| details.get("rule"))
        .and_then(|value| value.as_str());
    assert_eq!(rule, Some("region"));
}

#[rstest]
#[tokio::test]
async fn join_reports_missing_contest_and_user(harness: Harness) {
    let contest_id = harness.contest(5).await;
    let user_id = harness.entrant(30).await;
    let missing_contest = ContestId::random();
    let missing_user = UserId::random();

    assert_eq!(
        harness.engine.join(user_id, missing_contest).await,
        Err(RegistrationError::ContestNotFound {
            contest_id: missing_contest,
        })
    );
    assert_eq!(
        harness.engine.join(missing_user, contest_id).await,
        Err(RegistrationError::UserNotFound {
            user_id: missing_user,
        })
    );
}

#[rstest]
#[tokio::test]
async fn join_after_the_window_closes_is_rejected(harness: Harness) {
    let contest_id = harness.contest(5).await;
    let user_id = harness.entrant(30).await;
    harness.clock.set(fixture_now() + Duration::days(8));

    let error = RegistrationCommand::join(&harness.engine, user_id, contest_id)
        .await
        .expect_err("closed");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.reason(), Some("contest_closed"));
}

#[rstest]
#[tokio::test]
async fn full_contest_maps_to_no_slots_conflict(harness: Harness) {
    let contest_id = harness.contest(1).await;
    let first = harness.entrant(30).await;
    let second = harness.entrant(30).await;
    harness.engine.join(first, contest_id).await.expect("join");

    let error = RegistrationCommand::join(&harness.engine, second, contest_id)
        .await
        .expect_err("full");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.reason(), Some("no_slots"));
}

#[rstest]
#[tokio::test]
async fn switch_moves_between_contests(harness: Harness) {
    let from = harness.contest(3).await;
    let to = harness.contest(3).await;
    let user_id = harness.entrant(30).await;
    harness.engine.join(user_id, from).await.expect("join");

    let receipt = harness
        .engine
        .switch_to(user_id, to)
        .await
        .expect("switch succeeds");

    assert_eq!(
        receipt,
        SwitchReceipt {
            user_id,
            from,
            to,
            remaining_slots: 2,
        }
    );
    assert_eq!(harness.store.remaining_slots(from).await, Some(3));
    assert!(harness.store.capacity_balanced().await);
}

#[rstest]
#[tokio::test]
async fn switch_requires_a_different_registered_contest(harness: Harness) {
    let contest_id = harness.contest(3).await;
    let user_id = harness.entrant(30).await;

    assert_eq!(
        harness.engine.switch_to(user_id, contest_id).await,
        Err(RegistrationError::NotRegistered { user_id })
    );

    harness.engine.join(user_id, contest_id).await.expect("join");
    assert_eq!(
        harness.engine.switch_to(user_id, contest_id).await,
        Err(RegistrationError::AlreadyRegistered { contest_id })
    );
}

#[rstest]
#[tokio::test]
async fn switch_into_a_full_contest_keeps_the_original_slot(harness: Harness) {
    let from = harness.contest(3).await;
    let to = harness.contest(1).await;
    let user_id = harness.entrant(30).await;
    let occupant = harness.entrant(30).await;
    harness.engine.join(user_id, from).await.expect("join");
    harness.engine.join(occupant, to).await.expect("join");

    let error = harness
        .engine
        .switch_to(user_id, to)
        .await
        .expect_err("target full");

    assert_eq!(error, RegistrationError::NoSlots { contest_id: to });
    assert_eq!(harness.store.occupancy_of(user_id).await, Some(from));
    assert_eq!(harness.store.remaining_slots(from).await, Some(2));
}

#[rstest]
#[tokio::test]
async fn leave_twice_releases_once(harness: Harness) {
    let contest_id = harness.contest(2).await;
    let user_id = harness.entrant(30).await;
    harness.engine.join(user_id, contest_id).await.expect("join");

    let first = harness.engine.leave(user_id).await.expect("first leave");
    let second = harness.engine.leave(user_id).await.expect("second leave");

    assert_eq!(first.outcome, ReleaseOutcome::Released(contest_id));
    assert_eq!(second.outcome, ReleaseOutcome::NotFound);
    assert_eq!(harness.store.remaining_slots(contest_id).await, Some(2));
    assert_eq!(
        harness.engine.registration(user_id).await,
        Ok(RegistrationState::Unregistered)
    );
}

#[rstest]
#[tokio::test]
async fn leave_for_unknown_user_is_not_found(harness: Harness) {
    let user_id = UserId::random();

    let error = RegistrationCommand::leave(&harness.engine, user_id)
        .await
        .expect_err("unknown user");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn expired_deadline_is_transient_and_leaves_no_trace() {
    let mut harness = Harness::with_gate(EligibilityGate::with_minimum_age(18));
    harness.engine = harness.engine.with_deadline(StdDuration::from_millis(50));
    let contest_id = harness.contest(2).await;
    let user_id = harness.entrant(30).await;
    harness.store.stall_writes(StdDuration::from_secs(30));

    let error = RegistrationCommand::join(&harness.engine, user_id, contest_id)
        .await
        .expect_err("deadline expires");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(harness.store.remaining_slots(contest_id).await, Some(2));
    assert_eq!(harness.store.occupancy_of(user_id).await, None);
    assert_eq!(harness.store.commits(), 0);
}

#[rstest]
#[tokio::test]
async fn store_conflicts_surface_as_transient(harness: Harness) {
    let contest_id = harness.contest(2).await;
    let user_id = harness.entrant(30).await;
    harness
        .store
        .fail_next_commit(crate::domain::ports::StoreError::conflict("serialization failure"));

    let error = harness
        .engine
        .join(user_id, contest_id)
        .await
        .expect_err("conflict");

    assert!(error.is_transient());
    assert_eq!(harness.store.remaining_slots(contest_id).await, Some(2));
}

#[rstest]
#[tokio::test]
async fn invariant_violation_is_redacted_as_internal(harness: Harness) {
    let contest_id = harness.contest(2).await;
    let squatter = harness.entrant(30).await;
    let user_id = harness.entrant(30).await;
    harness.store.force_occupancy(squatter, contest_id).await;

    let error = RegistrationCommand::join(&harness.engine, user_id, contest_id)
        .await
        .expect_err("imbalance");

    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(error.reason(), None);
}

#[rstest]
#[case(
    ContestRepositoryError::connection("pool timed out"),
    ErrorCode::ServiceUnavailable
)]
#[case(ContestRepositoryError::query("bad row"), ErrorCode::InternalError)]
#[tokio::test]
async fn contest_repository_failures_are_classified(
    #[case] failure: ContestRepositoryError,
    #[case] expected: ErrorCode,
) {
    let store = InMemoryStore::new();
    let mut contests = MockContestRepository::new();
    contests
        .expect_find_by_id()
        .times(1)
        .return_once(move |_| Err(failure));
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(fixture_now()));
    let engine = RegistrationEngine::new(
        CapacityLedger::new(Arc::new(store.clone()), clock.clone()),
        Arc::new(contests),
        Arc::new(store),
        EligibilityGate::default(),
        clock,
    );

    let error = RegistrationCommand::join(&engine, UserId::random(), ContestId::random())
        .await
        .expect_err("repository failure");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn entrant_lookup_outage_is_transient() {
    let store = InMemoryStore::new();
    let contest = contest(3);
    store.add_contest(&contest).await;
    let mut entrants = MockEntrantRepository::new();
    entrants
        .expect_find_by_id()
        .times(1)
        .return_once(|_| Err(EntrantRepositoryError::connection("reset by peer")));
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(fixture_now()));
    let engine = RegistrationEngine::new(
        CapacityLedger::new(Arc::new(store.clone()), clock.clone()),
        Arc::new(store),
        Arc::new(entrants),
        EligibilityGate::default(),
        clock,
    );

    let error = engine
        .join(UserId::random(), contest.id())
        .await
        .expect_err("outage");

    assert!(error.is_transient());
}
