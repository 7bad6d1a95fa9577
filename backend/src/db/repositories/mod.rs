//! Repository backends:
//! - `local`: in-memory, for tests and local development
//! - `postgres`: Diesel over r2d2 (feature `postgres-repo`)
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use postgres::{PostgresConfig, PostgresRepository};
