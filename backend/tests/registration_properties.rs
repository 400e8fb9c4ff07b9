//! Concurrency properties of the registration engine over the in-memory store.
//!
//! Every scenario fires many operations at once and then checks that each
//! contest still satisfies `remaining + occupied == total` and that no user
//! holds more than one slot.

use std::sync::Arc;
use std::time::Duration;

use backend::domain::{
    CapacityLedger, Contest, ContestId, EligibilityGate, NewContest, RegistrationEngine,
    RegistrationError, RegistrationState, ReleaseOutcome, UserId,
};
use backend::test_support::{InMemoryStore, MutableClock};
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use rstest::{fixture, rstest};

type Engine = RegistrationEngine<InMemoryStore, InMemoryStore, InMemoryStore>;

fn fixture_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-05-10T09:00:00Z")
        .expect("fixture timestamp")
        .with_timezone(&Utc)
}

struct World {
    store: InMemoryStore,
    engine: Arc<Engine>,
}

impl World {
    fn new(deadline: Duration) -> Self {
        let store = InMemoryStore::new();
        let shared = Arc::new(store.clone());
        let clock = Arc::new(MutableClock::new(fixture_now()));
        let ledger = CapacityLedger::new(shared.clone(), clock.clone());
        let engine = RegistrationEngine::new(
            ledger,
            shared.clone(),
            shared,
            EligibilityGate::with_minimum_age(18),
            clock,
        )
        .with_deadline(deadline);
        Self {
            store,
            engine: Arc::new(engine),
        }
    }

    async fn contest(&self, total_slots: i64) -> ContestId {
        let now = fixture_now();
        let contest = Contest::create(
            ContestId::random(),
            NewContest {
                name: format!("Cup of {total_slots}"),
                prize: 50.0,
                total_slots,
                start_date: now - TimeDelta::hours(1),
                end_date: now + TimeDelta::days(2),
            },
            now,
        )
        .expect("valid contest");
        self.store.add_contest(&contest).await;
        contest.id()
    }

    async fn entrants(&self, count: usize, age: u32) -> Vec<UserId> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let id = UserId::random();
            self.store.add_entrant(id, age).await;
            ids.push(id);
        }
        ids
    }
}

#[fixture]
fn world() -> World {
    World::new(Duration::from_secs(5))
}

#[rstest]
#[case(50, 7)]
#[case(20, 20)]
#[case(8, 30)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_grant_exactly_the_available_slots(
    world: World,
    #[case] users: usize,
    #[case] slots: i64,
) {
    let contest_id = world.contest(slots).await;
    let entrants = world.entrants(users, 30).await;

    let attempts = entrants.iter().map(|&user_id| {
        let engine = Arc::clone(&world.engine);
        tokio::spawn(async move { engine.join(user_id, contest_id).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("join task"))
        .collect();

    let expected = users.min(usize::try_from(slots).expect("positive slots"));
    let granted = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(granted, expected);
    assert!(
        results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .all(|error| matches!(error, RegistrationError::NoSlots { .. }))
    );
    let remaining = u32::try_from(slots).expect("slots fit") - u32::try_from(granted).expect("fit");
    assert_eq!(world.store.remaining_slots(contest_id).await, Some(remaining));
    assert!(world.store.capacity_balanced().await);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_user_racing_two_contests_holds_one_slot(world: World) {
    let first = world.contest(5).await;
    let second = world.contest(5).await;
    let user_id = world.entrants(1, 30).await[0];

    let (a, b) = tokio::join!(
        world.engine.join(user_id, first),
        world.engine.join(user_id, second)
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser,
        Err(RegistrationError::AlreadyRegistered { .. })
    ));
    assert_eq!(
        world.store.occupants(first).await + world.store.occupants(second).await,
        1
    );
    assert!(world.store.capacity_balanced().await);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_leaves_release_each_slot_once(world: World) {
    let contest_id = world.contest(4).await;
    let user_id = world.entrants(1, 30).await[0];
    world
        .engine
        .join(user_id, contest_id)
        .await
        .expect("join succeeds");

    let leaves = (0..6).map(|_| {
        let engine = Arc::clone(&world.engine);
        tokio::spawn(async move { engine.leave(user_id).await })
    });
    let outcomes: Vec<_> = join_all(leaves)
        .await
        .into_iter()
        .map(|left| left.expect("leave task").expect("leave succeeds").outcome)
        .collect();

    let released = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, ReleaseOutcome::Released(_)))
        .count();
    assert_eq!(released, 1);
    assert_eq!(world.store.remaining_slots(contest_id).await, Some(4));
    assert_eq!(
        world.engine.registration(user_id).await.expect("lookup"),
        RegistrationState::Unregistered
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_switch_traffic_keeps_every_contest_balanced(world: World) {
    let contests = [
        world.contest(6).await,
        world.contest(3).await,
        world.contest(4).await,
    ];
    let entrants = world.entrants(9, 25).await;
    for (index, &user_id) in entrants.iter().enumerate() {
        let target = if index < 6 { contests[0] } else { contests[2] };
        world
            .engine
            .join(user_id, target)
            .await
            .expect("seed join succeeds");
    }

    let moves = entrants.iter().enumerate().map(|(index, &user_id)| {
        let engine = Arc::clone(&world.engine);
        let target = contests[(index + 1) % contests.len()];
        tokio::spawn(async move {
            if index % 4 == 3 {
                engine.leave(user_id).await.map(|_| ())
            } else {
                engine.switch_to(user_id, target).await.map(|_| ())
            }
        })
    });
    for result in join_all(moves).await {
        match result.expect("move task") {
            Ok(())
            | Err(RegistrationError::NoSlots { .. })
            | Err(RegistrationError::AlreadyRegistered { .. }) => {}
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }

    assert!(world.store.capacity_balanced().await);
    for &user_id in &entrants {
        let held = world.store.occupancy_of(user_id).await;
        assert_eq!(world.store.selected_contest(user_id).await, held);
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn switch_into_a_full_contest_changes_nothing(world: World) {
    let home = world.contest(3).await;
    let full = world.contest(1).await;
    let users = world.entrants(2, 30).await;
    world.engine.join(users[0], home).await.expect("join home");
    world.engine.join(users[1], full).await.expect("fill target");

    let error = world
        .engine
        .switch_to(users[0], full)
        .await
        .expect_err("target is full");

    assert!(matches!(error, RegistrationError::NoSlots { contest_id } if contest_id == full));
    assert_eq!(world.store.occupancy_of(users[0]).await, Some(home));
    assert_eq!(world.store.remaining_slots(home).await, Some(2));
    assert_eq!(world.store.remaining_slots(full).await, Some(0));
}

#[rstest]
#[tokio::test]
async fn join_leave_join_restores_the_counter(world: World) {
    let contest_id = world.contest(5).await;
    let users = world.entrants(3, 40).await;
    for &user_id in &users {
        world.engine.join(user_id, contest_id).await.expect("join");
    }
    assert_eq!(world.store.remaining_slots(contest_id).await, Some(2));

    for &user_id in &users {
        world.engine.leave(user_id).await.expect("leave");
    }
    assert_eq!(world.store.remaining_slots(contest_id).await, Some(5));
    assert_eq!(world.store.occupants(contest_id).await, 0);
}

#[rstest]
#[tokio::test]
async fn underage_entrants_never_consume_slots(world: World) {
    let contest_id = world.contest(2).await;
    let minors = world.entrants(4, 17).await;

    for user_id in minors {
        let error = world
            .engine
            .join(user_id, contest_id)
            .await
            .expect_err("minor is refused");
        assert!(matches!(error, RegistrationError::NotEligible(_)));
    }

    assert_eq!(world.store.remaining_slots(contest_id).await, Some(2));
    assert_eq!(world.store.commits(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_expiry_rolls_back_and_allows_a_retry() {
    let world = World::new(Duration::from_millis(20));
    let contest_id = world.contest(1).await;
    let user_id = world.entrants(1, 30).await[0];
    world.store.stall_writes(Duration::from_millis(200));

    let error = world
        .engine
        .join(user_id, contest_id)
        .await
        .expect_err("stalled write exceeds the deadline");
    assert!(error.is_transient());
    assert_eq!(world.store.remaining_slots(contest_id).await, Some(1));
    assert_eq!(world.store.occupancy_of(user_id).await, None);

    world.store.stall_writes(Duration::ZERO);
    let receipt = world
        .engine
        .join(user_id, contest_id)
        .await
        .expect("retry succeeds");
    assert_eq!(receipt.remaining_slots, 0);
    assert!(world.store.capacity_balanced().await);
}
