//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::{AgentError, ChatError};

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
    Repository(RepositoryError),
    Agent(AgentError),
}

impl AppError {
    fn parts(self) -> (StatusCode, ApiError) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Repository(e) => {
                let msg = e.to_string();
                match e {
                    RepositoryError::NotFound { .. } => {
                        (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg))
                    }
                    RepositoryError::ValidationError { .. } => {
                        (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
                    }
                    e if e.is_retryable() => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        ApiError::new("REPOSITORY_UNAVAILABLE", msg),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("REPOSITORY_ERROR", msg),
                    ),
                }
            }
            AppError::Agent(e) => {
                let status = match e {
                    AgentError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    AgentError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, ApiError::new("AGENT_ERROR", e.to_string()))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.parts();
        if status.is_server_error() {
            tracing::warn!(code = %error.code, "{}", error.message);
        }
        (status, Json(error)).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::Internal(msg) => f.write_str(msg),
            AppError::Repository(e) => write!(f, "{}", e),
            AppError::Agent(e) => write!(f, "{}", e),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(e) => e.into(),
            ChatError::Agent(e) => AppError::Agent(e),
            ChatError::Repository(e) => AppError::Repository(e),
            e @ ChatError::NotOwner { .. } => AppError::Forbidden(e.to_string()),
            e @ ChatError::MissingCourses(_) => AppError::Conflict(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionId;
    use crate::services::RunId;

    fn status_of(err: AppError) -> StatusCode {
        err.parts().0
    }

    #[test]
    fn test_chat_errors_map_to_status_codes() {
        assert_eq!(
            status_of(ChatError::Validation(ValidationError::EmptyMessage).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                ChatError::NotOwner {
                    entity: "chat session",
                    id: "1".to_string(),
                    user_id: "u2".to_string(),
                }
                .into()
            ),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ChatError::MissingCourses(SessionId::new(1)).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                ChatError::Agent(AgentError::PollTimeout {
                    run_id: RunId("r".to_string()),
                    attempts: 220,
                })
                .into()
            ),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_repository_errors_map_by_kind() {
        assert_eq!(
            status_of(RepositoryError::not_found_entity("chat_session", 9).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RepositoryError::connection("pool exhausted").into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(RepositoryError::query("syntax").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
