//! # studyplan
//!
//! Backend for a conversational study planner.
//!
//! A student submits their courses, chats with a hosted scheduling agent about
//! their week, and gets back study blocks that are parsed out of the agent's
//! replies and stored as a timetable.
//!
//! ## Architecture
//!
//! - [`models`]: courses, weekdays, chat records and extracted schedules
//! - [`db`]: repository traits with in-memory and Postgres backends
//! - [`services`]: prioritizer, agent client, run poller, prompt cache,
//!   schedule extractor and the [`services::ChatService`] tying them together
//! - [`config`]: `repository.toml` plus environment overrides
//! - [`http`]: Axum REST API (feature `http-server`)

// RepositoryError carries an ErrorContext for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
