//! HTTP handlers for the REST API.
//!
//! Handlers parse requests, call into [`crate::services`] and map results to
//! JSON. Chat turns are slow (the agent run is polled), so
//! `POST /v1/sessions/{id}/messages` hands the turn to a background task and
//! returns a turn id immediately.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use tracing::{info, warn};

use super::dto::{
    CourseListResponse, CreateSessionRequest, ExtractRequest, ExtractResponse, HealthResponse,
    PrioritizeRequest, SendMessageRequest, SendMessageResponse, SessionDetailResponse,
    SessionListResponse, TurnStatusResponse, UserQuery,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::{Course, SessionContext, SessionId, StudentCoursesId, ValidationError};
use crate::services::turn_tracker::TurnLogLevel;
use crate::services::{
    extract_schedule, group_courses, ChatService, ChatTurn, CourseFilter, GroupedCourses,
    TimetableView, TurnTracker,
};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Stateless helpers
// =============================================================================

/// POST /v1/courses/prioritize
///
/// Validate course drafts and return them grouped by weekday, both in input
/// order and sorted by intensity.
pub async fn prioritize_courses(Json(request): Json<PrioritizeRequest>) -> HandlerResult<GroupedCourses> {
    let courses = Course::from_drafts(request.courses)?;
    Ok(Json(group_courses(&courses)))
}

/// POST /v1/extract
pub async fn extract_text(Json(request): Json<ExtractRequest>) -> HandlerResult<ExtractResponse> {
    Ok(Json(extract_schedule(&request.text).into()))
}

// =============================================================================
// Sessions
// =============================================================================

/// POST /v1/sessions
///
/// Store the student's courses and open a chat session over them.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionContext>), AppError> {
    let courses = Course::from_drafts(request.courses)?;
    let ctx = state
        .chat
        .start_session(&request.user_id, request.title, &courses)
        .await?;
    Ok((StatusCode::CREATED, Json(ctx)))
}

/// GET /v1/users/{user_id}/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> HandlerResult<SessionListResponse> {
    let sessions = state.chat.list_sessions(&user_id).await?;
    let total = sessions.len();
    Ok(Json(SessionListResponse { sessions, total }))
}

/// GET /v1/courses
///
/// Shared catalog of every course students have submitted, filtered by the
/// query string (`owner`, `search`, `university`, `level`, `department`).
pub async fn course_catalog(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> HandlerResult<CourseListResponse> {
    let courses = state.chat.course_catalog(&filter).await?;
    let total = courses.len();
    Ok(Json(CourseListResponse { courses, total }))
}

/// GET /v1/users/{user_id}/courses
///
/// The catalog restricted to one user's submissions.
pub async fn list_user_courses(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(filter): Query<CourseFilter>,
) -> HandlerResult<CourseListResponse> {
    let filter = CourseFilter {
        owner: Some(user_id),
        ..filter
    };
    let courses = state.chat.course_catalog(&filter).await?;
    let total = courses.len();
    Ok(Json(CourseListResponse { courses, total }))
}

/// GET /v1/sessions/{session_id}?user_id=
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> HandlerResult<SessionDetailResponse> {
    let resumed = state
        .chat
        .resume_session(&query.user_id, SessionId::new(session_id))
        .await?;
    Ok(Json(resumed.into()))
}

/// POST /v1/sessions/{session_id}/messages
///
/// Start a chat turn in the background. Track it at `/v1/turns/{turn_id}`.
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>), AppError> {
    if request.content.trim().is_empty() {
        return Err(ValidationError::EmptyMessage.into());
    }
    let session_id = SessionId::new(session_id);
    let ctx = state
        .chat
        .resume_session(&request.user_id, session_id)
        .await?
        .context;

    let turn_id = state.turns.start(session_id);
    tokio::spawn(run_turn(
        state.chat.clone(),
        state.turns.clone(),
        turn_id.clone(),
        ctx,
        request.content,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(SendMessageResponse {
            message: format!("Message accepted. Track progress at /v1/turns/{}/logs", turn_id),
            turn_id,
        }),
    ))
}

async fn run_turn(
    chat: Arc<ChatService>,
    turns: TurnTracker,
    turn_id: String,
    ctx: SessionContext,
    content: String,
) {
    turns.log(&turn_id, TurnLogLevel::Info, "Sending message to the scheduling agent");

    let turn = match chat.send_message(&ctx, &content).await {
        Ok(turn) => turn,
        Err(e) => {
            warn!(turn_id = %turn_id, session_id = %ctx.session_id, "Chat turn failed: {}", e);
            turns.fail(&turn_id, e.to_string());
            return;
        }
    };

    log_turn_outcome(&turns, &turn_id, &turn);
    match serde_json::to_value(&turn) {
        Ok(result) => {
            info!(turn_id = %turn_id, session_id = %ctx.session_id, "Chat turn completed");
            turns.complete(&turn_id, result);
        }
        Err(e) => turns.fail(&turn_id, format!("Failed to serialize turn result: {}", e)),
    }
}

fn log_turn_outcome(turns: &TurnTracker, turn_id: &str, turn: &ChatTurn) {
    if turn.from_cache {
        turns.log(turn_id, TurnLogLevel::Info, "Answered from the prompt cache");
    } else {
        turns.log(
            turn_id,
            TurnLogLevel::Info,
            format!("Agent replied after {} status check(s)", turn.attempts),
        );
    }

    match &turn.extraction {
        Some(extraction) => {
            if turn.schedule_saved {
                turns.log(
                    turn_id,
                    TurnLogLevel::Success,
                    format!("Saved schedule with {} block(s)", extraction.schedule.len()),
                );
            }
            let dropped = extraction.rejected.len() + extraction.skipped.len();
            if dropped > 0 {
                turns.log(
                    turn_id,
                    TurnLogLevel::Warning,
                    format!("Ignored {} malformed schedule block(s)", dropped),
                );
            }
        }
        None => turns.log(turn_id, TurnLogLevel::Info, "No schedule in this reply yet"),
    }
}

/// POST /v1/sessions/{session_id}/extract
///
/// Re-read the latest assistant message and save any schedule it contains.
pub async fn extract_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(request): Json<UserQuery>,
) -> HandlerResult<ExtractResponse> {
    let ctx = state
        .chat
        .resume_session(&request.user_id, SessionId::new(session_id))
        .await?
        .context;
    let latest = state.chat.extract_latest(&ctx).await?;
    Ok(Json(latest.into()))
}

/// GET /v1/timetables/{student_courses_id}?user_id=
pub async fn get_timetable(
    State(state): State<AppState>,
    Path(student_courses_id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> HandlerResult<TimetableView> {
    let view = state
        .chat
        .timetable(&query.user_id, StudentCoursesId::new(student_courses_id))
        .await?;
    Ok(Json(view))
}

// =============================================================================
// Background turns
// =============================================================================

/// GET /v1/turns/{turn_id}
pub async fn get_turn_status(
    State(state): State<AppState>,
    Path(turn_id): Path<String>,
) -> HandlerResult<TurnStatusResponse> {
    let turn = state
        .turns
        .get(&turn_id)
        .ok_or_else(|| AppError::NotFound(format!("Turn {} not found", turn_id)))?;
    Ok(Json(turn.into()))
}

/// GET /v1/turns/{turn_id}/logs
///
/// Stream turn logs via Server-Sent Events, ending with a `complete` event
/// that carries the final status and result.
pub async fn stream_turn_logs(
    State(state): State<AppState>,
    Path(turn_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.turns.get(&turn_id).is_none() {
        return Err(AppError::NotFound(format!("Turn {} not found", turn_id)));
    }

    let tracker = state.turns.clone();
    let stream = async_stream::stream! {
        let mut sent = 0;
        loop {
            let Some((logs, status)) = tracker.logs_since(&turn_id, sent) else {
                break;
            };
            for entry in &logs {
                let data = serde_json::to_string(entry).unwrap_or_default();
                yield Ok(Event::default().data(data));
            }
            sent += logs.len();

            if status.is_finished() {
                let result = tracker.get(&turn_id).and_then(|t| t.result);
                let final_event = serde_json::json!({
                    "status": status,
                    "result": result,
                });
                yield Ok(Event::default()
                    .event("complete")
                    .data(serde_json::to_string(&final_event).unwrap_or_default()));
                break;
            }

            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
