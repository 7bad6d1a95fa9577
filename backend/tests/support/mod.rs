//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use studyplan::models::{Category, Course, Intensity, Weekday};
use studyplan::services::agent::{AgentClient, AgentError, AgentRequest, RunId, RunStatus, RunStatusSource};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Variables are restored on unwind, and calls are serialized because the
/// environment is process-global and tests run in parallel.
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

/// Agent whose runs complete on the first status check with queued replies.
pub struct QueueAgent {
    replies: Mutex<VecDeque<String>>,
    completed: Mutex<Vec<(String, String)>>,
    requests: Mutex<Vec<AgentRequest>>,
    dispatched: AtomicU32,
}

impl QueueAgent {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            completed: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            dispatched: AtomicU32::new(0),
        }
    }

    pub fn dispatch_count(&self) -> u32 {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AgentRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RunStatusSource for QueueAgent {
    async fn run_status(&self, run_id: &RunId) -> Result<RunStatus, AgentError> {
        let completed = self.completed.lock().unwrap();
        match completed.iter().find(|(id, _)| *id == run_id.0) {
            Some((_, reply)) => Ok(RunStatus::Completed {
                reply: reply.clone(),
            }),
            None => Ok(RunStatus::Pending),
        }
    }
}

#[async_trait]
impl AgentClient for QueueAgent {
    async fn dispatch(&self, request: &AgentRequest) -> Result<RunId, AgentError> {
        let n = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Transport("connection refused".to_string()))?;
        let run_id = format!("01HQUEUE{}", n);
        self.completed.lock().unwrap().push((run_id.clone(), reply));
        Ok(RunId(run_id))
    }
}

pub fn course(name: &str, day: Weekday, category: Category, intensity: Intensity) -> Course {
    Course::new(name, day, category, intensity).unwrap()
}

/// A first-year timetable spread over three days.
pub fn first_year_courses() -> Vec<Course> {
    vec![
        course("GST111", Weekday::Tuesday, Category::Theory, Intensity::Bulky),
        course("MTH101", Weekday::Tuesday, Category::Calculation, Intensity::Hard),
        course("CSC101", Weekday::Wednesday, Category::Coding, Intensity::Mid),
        course("PHY101", Weekday::Friday, Category::Calculation, Intensity::HardToGrasp),
        course("CHM101", Weekday::Friday, Category::Theory, Intensity::Easy),
    ]
}
