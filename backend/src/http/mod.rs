//! Axum REST API over the chat service.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP layer (axum handlers)                               │
//! │  request parsing, JSON, CORS, compression, error mapping  │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  ChatService + TurnTracker (services/)                    │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository layer (db/)                                   │
//! │  LocalRepository / PostgresRepository                     │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
