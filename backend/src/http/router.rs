//! Router configuration for the HTTP API.
//!
//! Sets up all routes and middleware (CORS, compression, tracing).

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS for the browser client
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/courses", get(handlers::course_catalog))
        .route("/courses/prioritize", post(handlers::prioritize_courses))
        .route("/extract", post(handlers::extract_text))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{session_id}", get(handlers::get_session))
        .route("/sessions/{session_id}/messages", post(handlers::send_message))
        .route("/sessions/{session_id}/extract", post(handlers::extract_session))
        .route("/users/{user_id}/sessions", get(handlers::list_sessions))
        .route("/users/{user_id}/courses", get(handlers::list_user_courses))
        .route("/timetables/{student_courses_id}", get(handlers::get_timetable))
        .route("/turns/{turn_id}", get(handlers::get_turn_status))
        .route("/turns/{turn_id}/logs", get(handlers::stream_turn_logs));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
