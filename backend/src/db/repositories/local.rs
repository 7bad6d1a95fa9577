//! In-memory repository implementation.
//!
//! Implements every repository trait over `HashMap`s behind one lock, for
//! unit tests and local development. Data does not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::db::repository::*;
use crate::models::{
    ChatMessage, ChatRole, ChatSession, ExtractedSchedule, MessageId, NewChatSession,
    NewStudentCourses, PromptCacheEntry, SessionId, StudentCourses, StudentCoursesId,
};

/// In-memory repository.
///
/// # Example
/// ```
/// use studyplan::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.session_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    sessions: HashMap<SessionId, ChatSession>,
    messages: HashMap<SessionId, Vec<ChatMessage>>,
    student_courses: HashMap<StudentCoursesId, StudentCourses>,
    prompt_cache: HashMap<String, PromptCacheEntry>,

    next_session_id: i64,
    next_message_id: i64,
    next_student_courses_id: i64,

    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
            messages: HashMap::new(),
            student_courses: HashMap::new(),
            prompt_cache: HashMap::new(),
            next_session_id: 1,
            next_message_id: 1,
            next_student_courses_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost connection: while unhealthy every call fails with a
    /// retryable connection error.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Drop all stored data, keeping the health flag.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let is_healthy = data.is_healthy;
        *data = LocalData {
            is_healthy,
            ..Default::default()
        };
    }

    pub fn session_count(&self) -> usize {
        self.data.read().sessions.len()
    }

    pub fn cache_entry_count(&self) -> usize {
        self.data.read().prompt_cache.len()
    }

    fn ensure_healthy(&self, operation: &str) -> RepositoryResult<()> {
        if self.data.read().is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection_with_context(
                "Local repository is marked unhealthy",
                ErrorContext::new(operation),
            ))
        }
    }
}

#[async_trait]
impl ChatRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_session(&self, session: &NewChatSession) -> RepositoryResult<ChatSession> {
        self.ensure_healthy("create_session")?;
        let mut data = self.data.write();

        if let Some(sc_id) = session.student_courses_id {
            if !data.student_courses.contains_key(&sc_id) {
                return Err(RepositoryError::validation_with_context(
                    format!("student_courses {} does not exist", sc_id),
                    ErrorContext::new("create_session").with_entity("chat_session"),
                ));
            }
        }

        let id = SessionId::new(data.next_session_id);
        data.next_session_id += 1;

        let created = ChatSession {
            id,
            user_id: session.user_id.clone(),
            title: session.title.clone(),
            student_courses_id: session.student_courses_id,
            created_at: Utc::now(),
        };
        data.sessions.insert(id, created.clone());
        data.messages.insert(id, Vec::new());
        Ok(created)
    }

    async fn get_session(&self, session_id: SessionId) -> RepositoryResult<ChatSession> {
        self.ensure_healthy("get_session")?;
        self.data
            .read()
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_entity("chat_session", session_id)
                    .with_operation("get_session")
            })
    }

    async fn list_sessions(&self, user_id: &str) -> RepositoryResult<Vec<ChatSession>> {
        self.ensure_healthy("list_sessions")?;
        let mut sessions: Vec<ChatSession> = self
            .data
            .read()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn append_message(
        &self,
        session_id: SessionId,
        role: ChatRole,
        content: &str,
    ) -> RepositoryResult<ChatMessage> {
        self.ensure_healthy("append_message")?;
        let mut data = self.data.write();

        if !data.sessions.contains_key(&session_id) {
            return Err(
                RepositoryError::not_found_entity("chat_session", session_id)
                    .with_operation("append_message"),
            );
        }

        let id = MessageId::new(data.next_message_id);
        data.next_message_id += 1;

        let message = ChatMessage {
            id,
            session_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        data.messages
            .entry(session_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, session_id: SessionId) -> RepositoryResult<Vec<ChatMessage>> {
        self.ensure_healthy("list_messages")?;
        let data = self.data.read();
        if !data.sessions.contains_key(&session_id) {
            return Err(
                RepositoryError::not_found_entity("chat_session", session_id)
                    .with_operation("list_messages"),
            );
        }
        let mut messages = data.messages.get(&session_id).cloned().unwrap_or_default();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }
}

#[async_trait]
impl CourseRepository for LocalRepository {
    async fn store_student_courses(
        &self,
        record: &NewStudentCourses,
    ) -> RepositoryResult<StudentCourses> {
        self.ensure_healthy("store_student_courses")?;
        let mut data = self.data.write();

        let id = StudentCoursesId::new(data.next_student_courses_id);
        data.next_student_courses_id += 1;

        let now = Utc::now();
        let stored = StudentCourses {
            id,
            user_id: record.user_id.clone(),
            courses: record.courses.clone(),
            priority_grouped: record.priority_grouped.clone(),
            schedule: None,
            created_at: now,
            updated_at: now,
        };
        data.student_courses.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_student_courses(&self, id: StudentCoursesId) -> RepositoryResult<StudentCourses> {
        self.ensure_healthy("get_student_courses")?;
        self.data
            .read()
            .student_courses
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_entity("student_courses", id)
                    .with_operation("get_student_courses")
            })
    }

    async fn list_student_courses(&self, user_id: &str) -> RepositoryResult<Vec<StudentCourses>> {
        self.ensure_healthy("list_student_courses")?;
        let mut records: Vec<StudentCourses> = self
            .data
            .read()
            .student_courses
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn list_all_student_courses(&self) -> RepositoryResult<Vec<StudentCourses>> {
        self.ensure_healthy("list_all_student_courses")?;
        let mut records: Vec<StudentCourses> =
            self.data.read().student_courses.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn update_schedule(
        &self,
        id: StudentCoursesId,
        schedule: &ExtractedSchedule,
    ) -> RepositoryResult<StudentCourses> {
        self.ensure_healthy("update_schedule")?;
        let mut data = self.data.write();
        let record = data.student_courses.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found_entity("student_courses", id).with_operation("update_schedule")
        })?;
        record.schedule = Some(schedule.clone());
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[async_trait]
impl PromptCacheRepository for LocalRepository {
    async fn get_cached_response(&self, prompt_key: &str) -> RepositoryResult<Option<PromptCacheEntry>> {
        self.ensure_healthy("get_cached_response")?;
        Ok(self.data.read().prompt_cache.get(prompt_key).cloned())
    }

    async fn store_cached_response(
        &self,
        prompt_key: &str,
        response: &str,
    ) -> RepositoryResult<PromptCacheEntry> {
        self.ensure_healthy("store_cached_response")?;
        let mut data = self.data.write();
        let entry = data
            .prompt_cache
            .entry(prompt_key.to_string())
            .or_insert_with(|| PromptCacheEntry {
                prompt_key: prompt_key.to_string(),
                response: response.to_string(),
                created_at: Utc::now(),
            });
        Ok(entry.clone())
    }
}
