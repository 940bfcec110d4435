#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use hotspot_map::db::{LocalRepository, MemoryViewStateStore};
use hotspot_map::models::{TimeWindow, ViewportBounds};
use hotspot_map::services::RefreshController;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Every repository-selection variable cleared.
pub const CLEAN_REPO_ENV: &[(&str, Option<&str>)] = &[
    ("REPOSITORY_TYPE", None),
    ("REPOSITORY_QUERY_MODE", None),
    ("DATABASE_URL", None),
    ("PG_DATABASE_URL", None),
    ("SNAPSHOT_PATH", None),
];

pub fn event_record(lat: f64, lng: f64, timestamp: DateTime<Utc>) -> Value {
    json!({"lat": lat, "lng": lng, "timestamp": timestamp.to_rfc3339()})
}

/// A record stamped with the current time.
pub fn recent_record(lat: f64, lng: f64) -> Value {
    event_record(lat, lng, Utc::now())
}

/// Central Madrid, roughly 20 km across.
pub fn madrid_bounds() -> ViewportBounds {
    ViewportBounds::new(40.5, 40.3, -3.6, -3.8)
}

/// Local repository holding `count` recent events around Puerta del Sol.
pub fn madrid_repo(count: usize) -> LocalRepository {
    let repo = LocalRepository::new();
    for i in 0..count {
        let offset = i as f64 * 0.00001;
        repo.insert_record(format!("sol-{}", i), recent_record(40.4168 + offset, -3.7038 + offset));
    }
    repo
}

pub fn controller_for(repo: LocalRepository, window: TimeWindow) -> Arc<RefreshController> {
    Arc::new(RefreshController::new(
        Arc::new(repo),
        Arc::new(MemoryViewStateStore::new()),
        window,
    ))
}
