//! Embedded PostgreSQL helpers shared by the Diesel suites.
//!
//! Every test gets its own database cloned from a template that already has
//! the migrations applied. The template name carries a hash of the
//! migrations directory, so a schema change provisions a fresh template.
//! Seeding and inspection go through `postgres` rather than Diesel so the
//! adapters under test never see the setup traffic.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use backend::domain::{ContestId, UserId};
use backend::outbound::persistence::MIGRATIONS;
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::MigrationHarness;
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "contests_template";
const TEMPLATE_PROVISION_RETRIES: usize = 5;
const TEMPLATE_PROVISION_RETRY_DELAY: Duration = Duration::from_millis(500);

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_database_name() -> Result<String, String> {
    let hash = hash_directory(migrations_dir()).map_err(|err| format!("hash migrations: {err}"))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Create the migrated template unless it already exists.
fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, String> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        let url = cluster.connection().database_url(&template_name);
        migrate_schema(&url)?;
    }
    Ok(template_name)
}

fn provision_attempt(cluster: &ClusterHandle, attempt: usize) -> Result<TemporaryDatabase, String> {
    let template_name = ensure_template_database(cluster)
        .map_err(|err| format!("attempt {attempt}/{TEMPLATE_PROVISION_RETRIES}: {err}"))?;
    let db_name = format!("test_{}", Uuid::new_v4());
    cluster
        .temporary_database_from_template(db_name.as_str(), template_name.as_str())
        .map_err(|err| {
            format!(
                "create database from template: attempt {attempt}/{TEMPLATE_PROVISION_RETRIES}: {err:?}"
            )
        })
}

/// Provision a temporary database cloned from the migration template.
pub fn provision_template_database(cluster: &ClusterHandle) -> Result<TemporaryDatabase, String> {
    let mut last_error = String::from("create database from template: no attempts made");
    for attempt in 1..=TEMPLATE_PROVISION_RETRIES {
        match provision_attempt(cluster, attempt) {
            Ok(database) => return Ok(database),
            Err(error) => last_error = error,
        }
        if attempt < TEMPLATE_PROVISION_RETRIES {
            std::thread::sleep(TEMPLATE_PROVISION_RETRY_DELAY);
        }
    }
    Err(last_error)
}

/// Apply every embedded migration to `url`.
pub fn migrate_schema(url: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| format!("connect: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err}"))?;
    Ok(())
}

/// Direct SQL access to a test database, bypassing the adapters.
pub struct SeedClient {
    client: Client,
}

impl SeedClient {
    pub fn connect(url: &str) -> Result<Self, String> {
        let client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
        Ok(Self { client })
    }

    /// Insert a row into the externally owned `users` table.
    pub fn insert_entrant(&mut self, user_id: UserId, age: i32) -> Result<(), String> {
        self.client
            .execute(
                "INSERT INTO users (id, age) VALUES ($1, $2)",
                &[user_id.as_uuid(), &age],
            )
            .map(|_| ())
            .map_err(|err| format_postgres_error(&err))
    }

    pub fn remaining_slots(&mut self, contest_id: ContestId) -> Result<i32, String> {
        let row = self
            .client
            .query_one(
                "SELECT remaining_slots FROM contest WHERE id = $1",
                &[contest_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }

    pub fn occupants(&mut self, contest_id: ContestId) -> Result<i64, String> {
        let row = self
            .client
            .query_one(
                "SELECT count(*) FROM user_contest WHERE contest_id = $1",
                &[contest_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }

    /// The `(occupancy, cache)` pair for a user.
    pub fn registration_of(
        &mut self,
        user_id: UserId,
    ) -> Result<(Option<Uuid>, Option<Uuid>), String> {
        let held = self
            .client
            .query_opt(
                "SELECT contest_id FROM user_contest WHERE user_id = $1",
                &[user_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?
            .map(|row| row.get::<_, Uuid>(0));
        let cached = self
            .client
            .query_one(
                "SELECT selected_contest_id FROM users WHERE id = $1",
                &[user_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?
            .get::<_, Option<Uuid>>(0);
        Ok((held, cached))
    }

    /// Whether `remaining + occupied == total` holds for every contest.
    pub fn capacity_balanced(&mut self) -> Result<bool, String> {
        let row = self
            .client
            .query_one(
                concat!(
                    "SELECT count(*) FROM contest c ",
                    "WHERE c.remaining_slots + ",
                    "(SELECT count(*) FROM user_contest o WHERE o.contest_id = c.id) ",
                    "<> c.total_slots"
                ),
                &[],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get::<_, i64>(0) == 0)
    }
}
