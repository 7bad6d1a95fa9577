//! Business logic between the HTTP layer and the repositories.
//!
//! [`ChatService`] drives a chat turn end to end; the other modules are the
//! pieces it is built from and can be used on their own.

pub mod agent;
pub mod chat;
pub mod extractor;
pub mod poller;
pub mod prioritizer;
pub mod prompt_cache;
pub mod timetable;
pub mod turn_tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{AgentClient, AgentConfig, AgentError, HttpAgentClient, RunId, RunStatus};
pub use chat::{ChatError, ChatResult, ChatService, ChatTurn, LatestExtraction, ResumedSession};
pub use extractor::{extract_schedule, Extraction, ExtractionOutcome};
pub use poller::{PollConfig, RunPoller};
pub use prioritizer::{group_courses, GroupedCourses};
pub use timetable::{CourseFilter, TimetableView};
pub use turn_tracker::{Turn, TurnStatus, TurnTracker};
