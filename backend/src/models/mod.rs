//! Domain types shared by the services, repositories and HTTP layer.

pub mod chat;
pub mod course;
pub mod error;
pub mod macros;
pub mod schedule;
pub mod week;

pub use chat::*;
pub use course::*;
pub use error::ValidationError;
pub use schedule::*;
pub use week::*;
