//! Chat session and message storage.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{ChatMessage, ChatRole, ChatSession, NewChatSession, SessionId};

/// Storage for chat sessions and their message history.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to be shared across request handlers.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Check if the backing store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if healthy
    /// - `Ok(false)` if unhealthy but no error occurred
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Create a session and return it with its assigned id and timestamp.
    async fn create_session(&self, session: &NewChatSession) -> RepositoryResult<ChatSession>;

    /// Fetch one session.
    ///
    /// # Errors
    /// `RepositoryError::NotFound` if no session has this id.
    async fn get_session(&self, session_id: SessionId) -> RepositoryResult<ChatSession>;

    /// All sessions owned by `user_id`, newest first.
    async fn list_sessions(&self, user_id: &str) -> RepositoryResult<Vec<ChatSession>>;

    /// Append a message to a session.
    ///
    /// # Errors
    /// `RepositoryError::NotFound` if the session does not exist.
    async fn append_message(
        &self,
        session_id: SessionId,
        role: ChatRole,
        content: &str,
    ) -> RepositoryResult<ChatMessage>;

    /// Messages of a session ordered by creation time, ties broken by id.
    async fn list_messages(&self, session_id: SessionId) -> RepositoryResult<Vec<ChatMessage>>;
}
