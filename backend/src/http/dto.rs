//! Data Transfer Objects for the HTTP API.
//!
//! Domain types that already derive Serialize/Deserialize (sessions,
//! messages, courses, timetables) are returned as they are; the types here
//! cover request bodies, query strings and response envelopes.

use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, ChatSession, Course, CourseDraft, ExtractedSchedule, SessionContext, SessionId};
use crate::services::extractor::{RejectedBlock, SkippedBlock};
use crate::services::turn_tracker::{Turn, TurnLogEntry, TurnStatus};
use crate::services::{ExtractionOutcome, LatestExtraction, ResumedSession};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Database connection status
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizeRequest {
    pub courses: Vec<CourseDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

/// Extraction result. `found` is false when the text has no schedule block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub found: bool,
    pub schedule: Option<ExtractedSchedule>,
    #[serde(default)]
    pub rejected: Vec<RejectedBlock>,
    #[serde(default)]
    pub skipped: Vec<SkippedBlock>,
    /// Set by the session extract endpoint only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_saved: Option<bool>,
}

impl From<ExtractionOutcome> for ExtractResponse {
    fn from(outcome: ExtractionOutcome) -> Self {
        match outcome.into_extraction() {
            Some(extraction) => Self {
                found: true,
                schedule: Some(extraction.schedule),
                rejected: extraction.rejected,
                skipped: extraction.skipped,
                schedule_saved: None,
            },
            None => Self {
                found: false,
                schedule: None,
                rejected: Vec::new(),
                skipped: Vec::new(),
                schedule_saved: None,
            },
        }
    }
}

impl From<LatestExtraction> for ExtractResponse {
    fn from(latest: LatestExtraction) -> Self {
        Self {
            schedule_saved: Some(latest.schedule_saved),
            ..latest.outcome.into()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub courses: Vec<CourseDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<ChatSession>,
    pub total: usize,
}

/// Session context plus its message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetailResponse {
    pub context: SessionContext,
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

impl From<ResumedSession> for SessionDetailResponse {
    fn from(resumed: ResumedSession) -> Self {
        Self {
            context: resumed.context,
            title: resumed.title,
            messages: resumed.messages,
        }
    }
}

/// `?user_id=` on routes that read one user's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub user_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub turn_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseListResponse {
    pub courses: Vec<Course>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnStatusResponse {
    pub turn_id: String,
    pub session_id: SessionId,
    pub status: TurnStatus,
    pub logs: Vec<TurnLogEntry>,
    pub result: Option<serde_json::Value>,
}

impl From<Turn> for TurnStatusResponse {
    fn from(turn: Turn) -> Self {
        Self {
            turn_id: turn.turn_id,
            session_id: turn.session_id,
            status: turn.status,
            logs: turn.logs,
            result: turn.result,
        }
    }
}
