//! Bootstrap of the process-wide embedded PostgreSQL cluster.
//!
//! `pg-embed-setup-unpriv` installs into `/var/tmp` by default, which
//! sandboxed runners cannot write to. When `PG_RUNTIME_DIR` or `PG_DATA_DIR`
//! is unset both are pointed at a per-process directory under the target
//! directory for the duration of the bootstrap. Environment mutation is
//! serialised through `env-lock`.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use pg_embedded_setup_unpriv::ClusterHandle;

static PG_EMBED_BOOTSTRAP_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;
const STABLE_PASSWORD: &str = "contests_embedded_test";

fn pg_embed_target_dir() -> PathBuf {
    if let Some(target_dir) = std::env::var_os("CARGO_TARGET_DIR") {
        return PathBuf::from(target_dir).join("pg-embed");
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("target")
        .join("pg-embed")
}

fn create_pg_embed_dirs() -> Result<(PathBuf, PathBuf), std::io::Error> {
    let base = pg_embed_target_dir().join(format!("cluster-{}", std::process::id()));
    let runtime_dir = base.join("install");
    let data_dir = base.join("data");
    std::fs::create_dir_all(&runtime_dir)?;
    std::fs::create_dir_all(&data_dir)?;
    Ok((runtime_dir, data_dir))
}

/// Binary downloads fail intermittently when suites start in parallel.
fn is_transient_error(err: &str) -> bool {
    const TRANSIENT_PATTERNS: [&str; 7] = [
        "error decoding response body",
        "connection reset",
        "connection refused",
        "timed out",
        "temporarily unavailable",
        "dns error",
        "failed to lookup",
    ];
    let err_lower = err.to_lowercase();
    TRANSIENT_PATTERNS
        .iter()
        .any(|pattern| err_lower.contains(pattern))
}

/// Return the shared cluster, starting it on first use.
///
/// A fixed `PG_PASSWORD` keeps a reused data directory reachable; a random
/// password would not match the one `initdb` recorded.
pub fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let _bootstrap_guard = PG_EMBED_BOOTSTRAP_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let password = std::env::var("PG_PASSWORD").unwrap_or_else(|_| STABLE_PASSWORD.to_owned());
    let (runtime_dir, data_dir) =
        match (std::env::var("PG_RUNTIME_DIR"), std::env::var("PG_DATA_DIR")) {
            (Ok(runtime_dir), Ok(data_dir)) => (runtime_dir, data_dir),
            _ => {
                let (runtime_dir, data_dir) =
                    create_pg_embed_dirs().map_err(|err| err.to_string())?;
                (
                    runtime_dir.to_string_lossy().into_owned(),
                    data_dir.to_string_lossy().into_owned(),
                )
            }
        };
    let _env_guard = env_lock::lock_env([
        ("PG_PASSWORD", Some(password)),
        ("PG_RUNTIME_DIR", Some(runtime_dir)),
        ("PG_DATA_DIR", Some(data_dir)),
    ]);

    let mut last_error = String::new();
    for attempt in 0..=MAX_RETRIES {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(err) => {
                last_error = format!("{err:?}");
                if attempt == MAX_RETRIES || !is_transient_error(&last_error) {
                    break;
                }
                let delay = Duration::from_millis(RETRY_DELAY_MS * (1 << attempt));
                eprintln!(
                    "pg-embed: transient error on attempt {}/{}, retrying in {delay:?}: {last_error}",
                    attempt + 1,
                    MAX_RETRIES + 1,
                );
                std::thread::sleep(delay);
            }
        }
    }
    Err(last_error)
}
