//! Bounded polling of an agent run until it reaches a terminal state.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::agent::{AgentError, RunId, RunStatus, RunStatusSource};

/// Polling cadence for agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    220
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollConfig {
    /// Override fields from `POLL_INTERVAL_MS` and `POLL_MAX_ATTEMPTS`.
    ///
    /// Unset variables keep the current value. A value that does not parse,
    /// or zero attempts, is an error.
    pub fn apply_env(&mut self) -> Result<(), String> {
        if let Some(interval) = crate::config::env_parsed::<u64>("POLL_INTERVAL_MS")? {
            self.interval_ms = interval;
        }
        if let Some(attempts) = crate::config::env_parsed::<u32>("POLL_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err("POLL_MAX_ATTEMPTS must be at least 1".to_string());
            }
            self.max_attempts = attempts;
        }
        Ok(())
    }
}

/// Reply of a completed run and the number of status checks it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub reply: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct RunPoller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for RunPoller {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

impl RunPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(Duration::from_millis(config.interval_ms), config.max_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Check `run_id` until it completes, fails, or `max_attempts` checks
    /// have been spent.
    ///
    /// An error from the status source ends polling immediately.
    pub async fn poll<S>(&self, source: &S, run_id: &RunId) -> Result<PollOutcome, AgentError>
    where
        S: RunStatusSource + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            match source.run_status(run_id).await? {
                RunStatus::Completed { reply } => {
                    debug!("Run {} completed after {} check(s)", run_id, attempt);
                    return Ok(PollOutcome {
                        reply,
                        attempts: attempt,
                    });
                }
                RunStatus::Failed(status) => {
                    warn!("Run {} failed with status {}", run_id, status);
                    return Err(AgentError::RunFailed {
                        run_id: run_id.clone(),
                        status,
                    });
                }
                RunStatus::Pending | RunStatus::Running(_) => {}
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        warn!(
            "Run {} still not complete after {} checks",
            run_id, self.max_attempts
        );
        Err(AgentError::PollTimeout {
            run_id: run_id.clone(),
            attempts: self.max_attempts,
        })
    }
}
