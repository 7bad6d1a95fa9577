//! Prompt cache and single-flight coalescing for agent turns.
//!
//! A turn is identified by a digest of everything the agent sees: the
//! priority-grouped courses and the full message history. Identical turns are
//! served from the `prompt_cache` table; identical turns that arrive while the
//! first one is still running wait for its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::OnceCell;

use super::agent::AgentMessage;
use crate::db::{calculate_checksum, FullRepository};
use crate::models::{Course, WeekMap};

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    priority_grouped: &'a WeekMap<Course>,
    messages: &'a [AgentMessage],
}

/// Hex SHA-256 of the turn context.
///
/// The JSON fed to the hash has a fixed field and weekday order, so equal
/// contexts always yield equal keys.
pub fn cache_key(priority_grouped: &WeekMap<Course>, messages: &[AgentMessage]) -> String {
    let input = CacheKeyInput {
        priority_grouped,
        messages,
    };
    // Serializing plain structs, strings and enums into a String cannot fail.
    let json = serde_json::to_string(&input).unwrap_or_default();
    calculate_checksum(&json)
}

/// Best-effort view of the prompt cache table.
///
/// Lookups and stores never fail a turn: repository errors are logged and
/// treated as a miss or a skipped write.
#[derive(Clone)]
pub struct PromptCache {
    repo: Arc<dyn FullRepository>,
}

impl PromptCache {
    pub fn new(repo: Arc<dyn FullRepository>) -> Self {
        Self { repo }
    }

    pub async fn lookup(&self, key: &str) -> Option<String> {
        match self.repo.get_cached_response(key).await {
            Ok(Some(entry)) => {
                debug!("Prompt cache hit for {}", key);
                Some(entry.response)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Prompt cache lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn store(&self, key: &str, response: &str) {
        if let Err(e) = self.repo.store_cached_response(key, response).await {
            warn!("Failed to store prompt cache entry {}: {}", key, e);
        }
    }
}

/// Coalesces concurrent calls that share a key.
///
/// The first caller for a key runs the work; callers arriving before it
/// finishes await the same result. Once the work completes the key is
/// released, so later callers start fresh.
pub struct SingleFlight<T> {
    inflight: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless a call for the same key is already in
    /// flight. Returns the value and whether this caller ran the work.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            let mut inflight = self.inflight.lock();
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut leader = false;
        let value = cell
            .get_or_init(|| {
                leader = true;
                work()
            })
            .await
            .clone();

        if leader {
            let mut inflight = self.inflight.lock();
            if inflight
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                inflight.remove(key);
            }
        } else {
            debug!("Joined in-flight turn {}", key);
        }

        (value, leader)
    }

    /// Number of keys currently being worked on.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }
}
