//! Tracking for chat turns that run in the background.
//!
//! An HTTP chat turn returns immediately with a turn id while the agent run
//! is dispatched and polled in a spawned task. Progress lines and the final
//! reply are kept here in memory for clients to poll or stream.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SessionId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: TurnLogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnLogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Running,
    Completed,
    Failed,
}

impl TurnStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, TurnStatus::Running)
    }
}

/// One tracked chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: String,
    pub session_id: SessionId,
    pub status: TurnStatus,
    pub logs: Vec<TurnLogEntry>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Serialized [`crate::services::chat::ChatTurn`] once completed.
    pub result: Option<serde_json::Value>,
}

/// How long a finished turn stays readable before it is evicted.
pub const DEFAULT_TURN_RETENTION_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct TurnTracker {
    turns: Arc<RwLock<HashMap<String, Turn>>>,
    retention: Duration,
}

impl Default for TurnTracker {
    fn default() -> Self {
        Self::with_retention(Duration::minutes(DEFAULT_TURN_RETENTION_MINUTES))
    }
}

impl TurnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            turns: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Register a running turn for `session_id` and return its id.
    ///
    /// Finished turns past the retention window are evicted first.
    pub fn start(&self, session_id: SessionId) -> String {
        self.prune_finished();
        let turn_id = Uuid::new_v4().to_string();
        let turn = Turn {
            turn_id: turn_id.clone(),
            session_id,
            status: TurnStatus::Running,
            logs: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        };
        self.turns.write().insert(turn_id.clone(), turn);
        turn_id
    }

    pub fn log(&self, turn_id: &str, level: TurnLogLevel, message: impl Into<String>) {
        if let Some(turn) = self.turns.write().get_mut(turn_id) {
            turn.logs.push(TurnLogEntry {
                timestamp: Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    pub fn complete(&self, turn_id: &str, result: serde_json::Value) {
        if let Some(turn) = self.turns.write().get_mut(turn_id) {
            turn.status = TurnStatus::Completed;
            turn.completed_at = Some(Utc::now());
            turn.result = Some(result);
        }
    }

    /// Mark a turn failed, recording `error_message` as its last log line.
    pub fn fail(&self, turn_id: &str, error_message: impl Into<String>) {
        if let Some(turn) = self.turns.write().get_mut(turn_id) {
            let now = Utc::now();
            turn.status = TurnStatus::Failed;
            turn.completed_at = Some(now);
            turn.logs.push(TurnLogEntry {
                timestamp: now,
                level: TurnLogLevel::Error,
                message: error_message.into(),
            });
        }
    }

    /// Drop finished turns that completed before the retention window.
    /// Running turns are kept. Returns the number evicted.
    pub fn prune_finished(&self) -> usize {
        let cutoff = Utc::now() - self.retention;
        let mut turns = self.turns.write();
        let before = turns.len();
        turns.retain(|_, turn| match turn.completed_at {
            Some(done) if turn.status.is_finished() => done > cutoff,
            _ => true,
        });
        before - turns.len()
    }

    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }

    pub fn get(&self, turn_id: &str) -> Option<Turn> {
        self.turns.read().get(turn_id).cloned()
    }

    /// Log entries from index `from` on, with the turn's current status.
    pub fn logs_since(&self, turn_id: &str, from: usize) -> Option<(Vec<TurnLogEntry>, TurnStatus)> {
        self.turns.read().get(turn_id).map(|turn| {
            let logs = turn.logs.get(from..).map(<[_]>::to_vec).unwrap_or_default();
            (logs, turn.status)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_lifecycle() {
        let tracker = TurnTracker::new();
        let id = tracker.start(SessionId::new(7));

        let turn = tracker.get(&id).unwrap();
        assert_eq!(turn.status, TurnStatus::Running);
        assert_eq!(turn.session_id, SessionId::new(7));

        tracker.log(&id, TurnLogLevel::Info, "Dispatched run");
        tracker.complete(&id, serde_json::json!({"reply": "hi"}));

        let turn = tracker.get(&id).unwrap();
        assert_eq!(turn.status, TurnStatus::Completed);
        assert!(turn.completed_at.is_some());
        assert_eq!(turn.result.unwrap()["reply"], "hi");
        assert_eq!(turn.logs.len(), 1);
    }

    #[test]
    fn test_fail_appends_error_log() {
        let tracker = TurnTracker::new();
        let id = tracker.start(SessionId::new(1));
        tracker.fail(&id, "timed out");

        let turn = tracker.get(&id).unwrap();
        assert_eq!(turn.status, TurnStatus::Failed);
        assert!(turn.status.is_finished());
        assert_eq!(turn.logs.last().unwrap().level, TurnLogLevel::Error);
        assert_eq!(turn.logs.last().unwrap().message, "timed out");
    }

    #[test]
    fn test_finished_turns_are_evicted_after_retention() {
        let tracker = TurnTracker::with_retention(Duration::zero());
        let done = tracker.start(SessionId::new(1));
        let failed = tracker.start(SessionId::new(1));
        let running = tracker.start(SessionId::new(2));
        tracker.complete(&done, serde_json::json!({"reply": "hi"}));
        tracker.fail(&failed, "agent unavailable");

        let next = tracker.start(SessionId::new(3));

        assert!(tracker.get(&done).is_none());
        assert!(tracker.get(&failed).is_none());
        assert!(tracker.get(&running).is_some());
        assert!(tracker.get(&next).is_some());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_recent_turns_survive_pruning() {
        let tracker = TurnTracker::new();
        let id = tracker.start(SessionId::new(1));
        tracker.complete(&id, serde_json::json!({}));

        assert_eq!(tracker.prune_finished(), 0);
        assert!(tracker.get(&id).is_some());
    }

    #[test]
    fn test_logs_since_returns_tail() {
        let tracker = TurnTracker::new();
        let id = tracker.start(SessionId::new(1));
        tracker.log(&id, TurnLogLevel::Info, "a");
        tracker.log(&id, TurnLogLevel::Info, "b");

        let (logs, status) = tracker.logs_since(&id, 1).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "b");
        assert_eq!(status, TurnStatus::Running);

        let (logs, _) = tracker.logs_since(&id, 10).unwrap();
        assert!(logs.is_empty());
        assert!(tracker.logs_since("missing", 0).is_none());
    }
}
