//! Repository traits for the persistence boundary.
//!
//! Storage is split into three focused traits:
//!
//! - [`ChatRepository`]: chat sessions and their messages
//! - [`CourseRepository`]: student-courses records and negotiated schedules
//! - [`PromptCacheRepository`]: cached agent replies keyed by context digest
//!
//! [`FullRepository`] is implemented for anything that implements all three,
//! and is what the service and HTTP layers hold as `Arc<dyn FullRepository>`.

pub mod chat;
pub mod courses;
pub mod error;
pub mod prompt_cache;

pub use chat::ChatRepository;
pub use courses::CourseRepository;
pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use prompt_cache::PromptCacheRepository;

/// Composite bound for a complete repository backend.
pub trait FullRepository: ChatRepository + CourseRepository + PromptCacheRepository {}

impl<T> FullRepository for T where T: ChatRepository + CourseRepository + PromptCacheRepository {}
