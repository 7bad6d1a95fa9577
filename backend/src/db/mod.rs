//! Persistence layer for chat sessions, student courses and the prompt cache.
//!
//! Storage is reached through the repository traits in [`repository`], so
//! backends can be swapped without touching the service layer:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers / ChatService                            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │  Arc<dyn FullRepository>
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/)                        │
//! │  ChatRepository · CourseRepository · PromptCacheRepo.   │
//! └───────────────────┬─────────────────────────────────────┘
//!          ┌──────────┴───────────┐
//!   LocalRepository        PostgresRepository
//!   (in-memory)            (Diesel + r2d2, feature `postgres-repo`)
//! ```
//!
//! Use [`RepositoryFactory`] to build a backend from the environment or from a
//! `repository.toml` file.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod checksum;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use checksum::calculate_checksum;
pub use repo_config::RepositoryConfig;

pub use factory::{RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ChatRepository, CourseRepository, ErrorContext, FullRepository, PromptCacheRepository,
    RepositoryError, RepositoryResult,
};

use std::sync::Arc;

/// Build the repository described by `config`.
///
/// The caller owns the returned handle and passes it on explicitly, usually
/// into the HTTP `AppState`.
pub async fn init_repository(config: &RepositoryConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
    RepositoryFactory::from_repository_config(config).await
}
