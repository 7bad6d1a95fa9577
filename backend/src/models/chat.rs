//! Chat sessions, messages and the student-courses record they are tied to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::course::Course;
use super::schedule::ExtractedSchedule;
use super::week::WeekMap;
use crate::define_id_type;

define_id_type!(i64, SessionId);
define_id_type!(i64, MessageId);
define_id_type!(i64, StudentCoursesId);

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(format!("Unknown chat role: {}", other)),
        }
    }
}

/// A conversation between one student and the scheduling agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub user_id: String,
    pub title: String,
    /// Courses record the conversation is planning for.
    pub student_courses_id: Option<StudentCoursesId>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a [`ChatSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatSession {
    pub user_id: String,
    pub title: String,
    pub student_courses_id: Option<StudentCoursesId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A student's submitted courses plus the schedule negotiated for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentCourses {
    pub id: StudentCoursesId,
    pub user_id: String,
    /// Courses per weekday in the order they were entered.
    pub courses: WeekMap<Course>,
    /// Same courses, each day sorted by intensity rank.
    pub priority_grouped: WeekMap<Course>,
    pub schedule: Option<ExtractedSchedule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudentCourses {
    pub user_id: String,
    pub courses: WeekMap<Course>,
    pub priority_grouped: WeekMap<Course>,
}

/// Cached agent reply keyed by a digest of the request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCacheEntry {
    pub prompt_key: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Identifiers a client carries between steps of the chat flow.
///
/// Returned when a session is started or resumed and handed back explicitly on
/// every later call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub session_id: SessionId,
    pub student_courses_id: StudentCoursesId,
}
