//! In-process agent double shared by the service and HTTP unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::agent::{AgentClient, AgentError, AgentRequest, RunId, RunStatus, RunStatusSource};
use super::poller::RunPoller;
use super::ChatService;
use crate::db::{FullRepository, LocalRepository};

/// Answers each dispatched run with the next queued reply.
///
/// A run reports `Running` for `checks_before_done - 1` status checks and then
/// completes. With the queue empty, dispatch fails.
pub struct ScriptedAgent {
    replies: Mutex<VecDeque<String>>,
    runs: Mutex<HashMap<String, (String, u32)>>,
    requests: Mutex<Vec<AgentRequest>>,
    dispatched: AtomicU32,
    checks_before_done: u32,
    delay: Duration,
}

impl ScriptedAgent {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            runs: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            dispatched: AtomicU32::new(0),
            checks_before_done: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn with_checks(mut self, checks: u32) -> Self {
        self.checks_before_done = checks.max(1);
        self
    }

    /// Delay every dispatch, so concurrent turns overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn dispatch_count(&self) -> u32 {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RunStatusSource for ScriptedAgent {
    async fn run_status(&self, run_id: &RunId) -> Result<RunStatus, AgentError> {
        let mut runs = self.runs.lock();
        let (reply, checks) = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| AgentError::InvalidResponse(format!("unknown run {}", run_id)))?;
        *checks += 1;
        if *checks >= self.checks_before_done {
            Ok(RunStatus::Completed {
                reply: reply.clone(),
            })
        } else {
            Ok(RunStatus::Running("Running".to_string()))
        }
    }
}

#[async_trait]
impl AgentClient for ScriptedAgent {
    async fn dispatch(&self, request: &AgentRequest) -> Result<RunId, AgentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let n = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());
        let reply = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| AgentError::Status {
                status: 503,
                body: "no scripted reply left".to_string(),
            })?;
        let run_id = format!("run-{}", n);
        self.runs.lock().insert(run_id.clone(), (reply, 0));
        Ok(RunId(run_id))
    }
}

/// A chat service over a fresh in-memory repository.
pub fn service_with(agent: Arc<ScriptedAgent>) -> (ChatService, LocalRepository) {
    let repo = LocalRepository::new();
    let shared: Arc<dyn FullRepository> = Arc::new(repo.clone());
    let service = ChatService::new(shared, agent, RunPoller::new(Duration::from_millis(1), 5));
    (service, repo)
}
