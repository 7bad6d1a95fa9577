//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::FullRepository;
use crate::services::agent::AgentClient;
use crate::services::{ChatService, RunPoller, TurnTracker};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn FullRepository>,
    pub chat: Arc<ChatService>,
    /// Background chat turns started by `POST /v1/sessions/{id}/messages`.
    pub turns: TurnTracker,
}

impl AppState {
    pub fn new(repository: Arc<dyn FullRepository>, agent: Arc<dyn AgentClient>, poller: RunPoller) -> Self {
        let chat = ChatService::new(repository.clone(), agent, poller);
        Self {
            repository,
            chat: Arc::new(chat),
            turns: TurnTracker::new(),
        }
    }
}
