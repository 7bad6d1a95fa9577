//! Client for the hosted agent runtime.
//!
//! A chat turn is dispatched as an event; the runtime answers with a run id
//! that is then polled (see [`crate::services::poller`]) until the run
//! completes and the assistant reply can be read from its output.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{ChatRole, Course, WeekMap};
use crate::services::prioritizer::course_names_for_day;

/// Opaque identifier of one agent run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message as sent to the agent: role and content only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Everything the agent needs for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub system: String,
    pub priority_grouped: WeekMap<Course>,
    /// Full conversation so far, oldest first, ending with the new user message.
    pub messages: Vec<AgentMessage>,
}

impl AgentRequest {
    pub fn new(priority_grouped: WeekMap<Course>, messages: Vec<AgentMessage>) -> Self {
        Self {
            system: system_prompt(&priority_grouped),
            priority_grouped,
            messages,
        }
    }
}

/// Observed state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The runtime has not registered the run yet.
    Pending,
    /// Registered but not finished; carries the runtime's status string.
    Running(String),
    Completed { reply: String },
    Failed(String),
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed { .. } | RunStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("Agent request failed: {0}")]
    Transport(String),

    #[error("Agent runtime returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected agent response: {0}")]
    InvalidResponse(String),

    #[error("Agent run {run_id} ended with status {status}")]
    RunFailed { run_id: RunId, status: String },

    #[error("Agent run {run_id} did not complete after {attempts} status checks")]
    PollTimeout { run_id: RunId, attempts: u32 },

    #[error("Agent configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Transport(err.to_string())
    }
}

/// Source of run status, polled by [`crate::services::poller::RunPoller`].
#[async_trait]
pub trait RunStatusSource: Send + Sync {
    async fn run_status(&self, run_id: &RunId) -> Result<RunStatus, AgentError>;
}

/// Dispatches chat turns to the agent runtime.
#[async_trait]
pub trait AgentClient: RunStatusSource {
    /// Start a run for `request` and return its id without waiting for it.
    async fn dispatch(&self, request: &AgentRequest) -> Result<RunId, AgentError>;
}

/// Build the scheduling assistant's instructions from the student's courses.
pub fn system_prompt(priority_grouped: &WeekMap<Course>) -> String {
    let mut subjects = Vec::new();
    for (day, courses) in priority_grouped.iter() {
        if !courses.is_empty() {
            subjects.push(format!("{}: {}", day, course_names_for_day(priority_grouped, day)));
        }
    }
    let subjects = if subjects.is_empty() {
        "none provided yet".to_string()
    } else {
        subjects.join("; ")
    };

    format!(
        "You are a friendly and encouraging university scheduling assistant. \
         Your goal is to help a student find specific times to study for their subjects. \
         The subjects per day, hardest first, are: {subjects}. \
         A study session for each subject should be about 1-2 hours. \
         Ask questions to understand the student's fixed schedule (classes, appointments) \
         and personal activities (like sports or breaks). \
         Once you have enough information, propose a complete schedule for all study subjects, \
         writing each session as its own block separated by a blank line:\n\n\
         **Day:** <weekday>\n**Start Time:** <time>\n**End Time:** <time>\n**Courses:** <course>"
    )
}

/// Connection settings for the hosted runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the runtime, e.g. `http://localhost:8288`.
    pub server_host: String,
    /// Key used to send events.
    pub event_key: String,
    /// Bearer token for the run status API.
    pub signing_key: String,
    #[serde(default = "default_event_name")]
    pub event_name: String,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
}

fn default_event_name() -> String {
    "AiTableAgent".to_string()
}

fn default_request_timeout_sec() -> u64 {
    30
}

impl AgentConfig {
    /// Overlay environment variables on `base` (usually the `[agent]` file
    /// section).
    ///
    /// # Environment Variables
    /// - `AGENT_SERVER_HOST`: runtime base URL
    /// - `AGENT_EVENT_KEY`: event key
    /// - `AGENT_SIGNING_KEY`: signing key for the REST API
    /// - `AGENT_EVENT_NAME` (default: `AiTableAgent`)
    /// - `AGENT_REQUEST_TIMEOUT_SEC` (default: 30)
    ///
    /// Each variable replaces only its own field. Without a `base`, the three
    /// key variables must all be set once any `AGENT_*` variable is; with no
    /// variables set at all, `base` is returned unchanged.
    pub fn overlay_env(base: Option<Self>) -> Result<Option<Self>, String> {
        let server_host = std::env::var("AGENT_SERVER_HOST").ok();
        let event_key = std::env::var("AGENT_EVENT_KEY").ok();
        let signing_key = std::env::var("AGENT_SIGNING_KEY").ok();
        let event_name = std::env::var("AGENT_EVENT_NAME").ok();
        let request_timeout_sec = crate::config::env_parsed::<u64>("AGENT_REQUEST_TIMEOUT_SEC")?;

        let any_set = server_host.is_some()
            || event_key.is_some()
            || signing_key.is_some()
            || event_name.is_some()
            || request_timeout_sec.is_some();
        if !any_set {
            return Ok(base);
        }

        let mut config = match base {
            Some(config) => config,
            None => Self {
                server_host: server_host
                    .clone()
                    .ok_or("AGENT_SERVER_HOST must be set when no [agent] section is configured")?,
                event_key: event_key
                    .clone()
                    .ok_or("AGENT_EVENT_KEY must be set when no [agent] section is configured")?,
                signing_key: signing_key
                    .clone()
                    .ok_or("AGENT_SIGNING_KEY must be set when no [agent] section is configured")?,
                event_name: default_event_name(),
                request_timeout_sec: default_request_timeout_sec(),
            },
        };

        if let Some(value) = server_host {
            config.server_host = value;
        }
        if let Some(value) = event_key {
            config.event_key = value;
        }
        if let Some(value) = signing_key {
            config.signing_key = value;
        }
        if let Some(value) = event_name {
            config.event_name = value;
        }
        if let Some(value) = request_timeout_sec {
            config.request_timeout_sec = value;
        }
        Ok(Some(config))
    }
}

/// [`AgentClient`] talking to the runtime's event and REST APIs over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    http: reqwest::Client,
    config: AgentConfig,
}

impl HttpAgentClient {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        if config.server_host.trim().is_empty() {
            return Err(AgentError::Configuration(
                "server_host must not be empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.server_host.trim_end_matches('/'), path)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, AgentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl RunStatusSource for HttpAgentClient {
    async fn run_status(&self, run_id: &RunId) -> Result<RunStatus, AgentError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/events/{}/runs", run_id)))
            .bearer_auth(&self.config.signing_key)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        parse_run_status(&body)
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn dispatch(&self, request: &AgentRequest) -> Result<RunId, AgentError> {
        let event = json!({
            "name": self.config.event_name,
            "data": {
                "userInput": {
                    "system": request.system,
                    "priorityGrouped": request.priority_grouped,
                    "message": request.messages,
                }
            }
        });

        let response = self
            .http
            .post(self.url(&format!("/e/{}", self.config.event_key)))
            .json(&event)
            .send()
            .await?;
        let body = Self::read_json(response).await?;

        let run_id = body
            .get("ids")
            .and_then(|ids| ids.get(0))
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::InvalidResponse("missing run id in event response".to_string()))?;
        debug!("Dispatched agent run {}", run_id);
        Ok(RunId(run_id.to_string()))
    }
}

/// Interpret the runtime's `GET /v1/events/{id}/runs` payload.
pub fn parse_run_status(body: &Value) -> Result<RunStatus, AgentError> {
    let run = match body.get("data").and_then(Value::as_array) {
        Some(runs) if !runs.is_empty() => &runs[0],
        _ => return Ok(RunStatus::Pending),
    };

    let status = run
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidResponse("run without status".to_string()))?;

    match status {
        "Completed" => {
            let output = run.get("output").unwrap_or(&Value::Null);
            let reply = reply_from_output(output).ok_or_else(|| {
                AgentError::InvalidResponse("completed run carries no reply text".to_string())
            })?;
            Ok(RunStatus::Completed { reply })
        }
        "Failed" | "Cancelled" => {
            warn!("Agent run ended with status {}", status);
            Ok(RunStatus::Failed(status.to_string()))
        }
        other => Ok(RunStatus::Running(other.to_string())),
    }
}

/// Dig the assistant text out of a run output.
///
/// Accepts a plain string, an agent result (`{"output": [{"content": ..}]}`),
/// or an array whose first element is either of those.
fn reply_from_output(output: &Value) -> Option<String> {
    match output {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.first().and_then(reply_from_output),
        Value::Object(map) => map
            .get("output")
            .and_then(|inner| inner.get(0))
            .and_then(|message| message.get("content"))
            .and_then(|content| match content {
                Value::String(text) => Some(text.clone()),
                _ => reply_from_output(content),
            })
            .or_else(|| map.get("content").and_then(Value::as_str).map(str::to_string)),
        _ => None,
    }
}
