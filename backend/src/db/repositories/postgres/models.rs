use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::{chat_messages, chat_sessions, prompt_cache, student_courses};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    ChatMessage, ChatRole, ChatSession, MessageId, PromptCacheEntry, SessionId, StudentCourses,
    StudentCoursesId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatSessionRow {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub student_courses_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_sessions)]
pub struct NewChatSessionRow {
    pub user_id: String,
    pub title: String,
    pub student_courses_id: Option<i64>,
}

impl From<ChatSessionRow> for ChatSession {
    fn from(row: ChatSessionRow) -> Self {
        ChatSession {
            id: SessionId::new(row.id),
            user_id: row.user_id,
            title: row.title,
            student_courses_id: row.student_courses_id.map(StudentCoursesId::new),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMessageRow {
    pub id: i64,
    pub session_id: i64,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessageRow {
    pub session_id: i64,
    pub role: String,
    pub content: String,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = RepositoryError;

    fn try_from(row: ChatMessageRow) -> RepositoryResult<Self> {
        let role: ChatRole = row.role.parse().map_err(RepositoryError::internal)?;
        Ok(ChatMessage {
            id: MessageId::new(row.id),
            session_id: SessionId::new(row.session_id),
            role,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = student_courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StudentCoursesRow {
    pub id: i64,
    pub user_id: String,
    pub courses_json: Value,
    pub priority_grouped_json: Value,
    pub schedule_json: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = student_courses)]
pub struct NewStudentCoursesRow {
    pub user_id: String,
    pub courses_json: Value,
    pub priority_grouped_json: Value,
}

impl TryFrom<StudentCoursesRow> for StudentCourses {
    type Error = RepositoryError;

    fn try_from(row: StudentCoursesRow) -> RepositoryResult<Self> {
        Ok(StudentCourses {
            id: StudentCoursesId::new(row.id),
            user_id: row.user_id,
            courses: serde_json::from_value(row.courses_json)?,
            priority_grouped: serde_json::from_value(row.priority_grouped_json)?,
            schedule: row.schedule_json.map(serde_json::from_value).transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = prompt_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PromptCacheRow {
    pub prompt_key: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl From<PromptCacheRow> for PromptCacheEntry {
    fn from(row: PromptCacheRow) -> Self {
        PromptCacheEntry {
            prompt_key: row.prompt_key,
            response: row.response,
            created_at: row.created_at,
        }
    }
}
