//! Chat orchestration: sessions, turns against the agent, and schedule
//! persistence.
//!
//! A turn persists the user's message, sends the stored priority-grouped
//! courses with the whole conversation to the agent (or answers from the
//! prompt cache), persists the reply, and saves any schedule the reply
//! contains onto the student's courses record.

use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::agent::{AgentClient, AgentError, AgentMessage, AgentRequest};
use super::extractor::{extract_schedule, Extraction, ExtractionOutcome};
use super::poller::RunPoller;
use super::prioritizer::group_courses;
use super::prompt_cache::{cache_key, PromptCache, SingleFlight};
use super::timetable::{course_catalog, CourseFilter, TimetableView};
use crate::db::{FullRepository, RepositoryError};
use crate::models::{
    ChatMessage, ChatRole, ChatSession, Course, NewChatSession, NewStudentCourses, SessionContext,
    SessionId, StudentCourses, StudentCoursesId, ValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{entity} {id} does not belong to user '{user_id}'")]
    NotOwner {
        entity: &'static str,
        id: String,
        user_id: String,
    },

    #[error("Chat session {0} is not linked to a course list")]
    MissingCourses(SessionId),
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Outcome of one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    /// Whether the reply came from the prompt cache rather than a new run.
    pub from_cache: bool,
    /// Status checks spent on the run; 0 for cached replies.
    pub attempts: u32,
    /// Present when the reply contained at least one schedule block.
    pub extraction: Option<Extraction>,
    /// Whether a non-empty schedule was written to the courses record.
    pub schedule_saved: bool,
}

impl ChatTurn {
    pub fn reply(&self) -> &str {
        &self.assistant_message.content
    }
}

/// A session reopened by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumedSession {
    pub context: SessionContext,
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

/// Result of re-running extraction on the latest assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestExtraction {
    pub outcome: ExtractionOutcome,
    pub schedule_saved: bool,
}

#[derive(Debug, Clone)]
struct AgentReply {
    text: String,
    from_cache: bool,
    attempts: u32,
}

pub struct ChatService {
    repo: Arc<dyn FullRepository>,
    agent: Arc<dyn AgentClient>,
    poller: RunPoller,
    cache: PromptCache,
    flights: SingleFlight<Result<AgentReply, AgentError>>,
}

impl ChatService {
    pub fn new(repo: Arc<dyn FullRepository>, agent: Arc<dyn AgentClient>, poller: RunPoller) -> Self {
        Self {
            cache: PromptCache::new(repo.clone()),
            repo,
            agent,
            poller,
            flights: SingleFlight::new(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repo
    }

    /// Store the student's courses and open a chat session for them.
    ///
    /// Without a title the session is called "Chat for <first day with
    /// courses>".
    pub async fn start_session(
        &self,
        user_id: &str,
        title: Option<String>,
        courses: &[Course],
    ) -> ChatResult<SessionContext> {
        let user_id = require_user(user_id)?;
        let grouped = group_courses(courses);

        let record = self
            .repo
            .store_student_courses(&NewStudentCourses {
                user_id: user_id.to_string(),
                courses: grouped.grouped,
                priority_grouped: grouped.priority_grouped,
            })
            .await?;

        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_title(&record));

        let session = self
            .repo
            .create_session(&NewChatSession {
                user_id: user_id.to_string(),
                title,
                student_courses_id: Some(record.id),
            })
            .await?;

        info!(
            "Started chat session {} for user {} with {} course(s)",
            session.id,
            user_id,
            courses.len()
        );
        Ok(SessionContext {
            user_id: user_id.to_string(),
            session_id: session.id,
            student_courses_id: record.id,
        })
    }

    /// Reopen one of the user's sessions with its message history.
    pub async fn resume_session(&self, user_id: &str, session_id: SessionId) -> ChatResult<ResumedSession> {
        let user_id = require_user(user_id)?;
        let session = self.owned_session(user_id, session_id).await?;
        let student_courses_id = session
            .student_courses_id
            .ok_or(ChatError::MissingCourses(session_id))?;
        let messages = self.repo.list_messages(session_id).await?;

        Ok(ResumedSession {
            context: SessionContext {
                user_id: user_id.to_string(),
                session_id,
                student_courses_id,
            },
            title: session.title,
            messages,
        })
    }

    pub async fn list_sessions(&self, user_id: &str) -> ChatResult<Vec<ChatSession>> {
        let user_id = require_user(user_id)?;
        Ok(self.repo.list_sessions(user_id).await?)
    }

    /// Run one chat turn.
    pub async fn send_message(&self, ctx: &SessionContext, text: &str) -> ChatResult<ChatTurn> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let record = self.verify_context(ctx).await?;

        let user_message = self
            .repo
            .append_message(ctx.session_id, ChatRole::User, text)
            .await?;

        let history: Vec<AgentMessage> = self
            .repo
            .list_messages(ctx.session_id)
            .await?
            .into_iter()
            .map(|m| AgentMessage {
                role: m.role,
                content: m.content,
            })
            .collect();

        let key = cache_key(&record.priority_grouped, &history);
        let (reply, _) = self
            .flights
            .run(&key, || self.fetch_reply(&key, &record, &history))
            .await;
        let reply = reply?;

        let assistant_message = self
            .repo
            .append_message(ctx.session_id, ChatRole::Assistant, &reply.text)
            .await?;

        let outcome = extract_schedule(&reply.text);
        let schedule_saved = self.save_schedule(ctx.student_courses_id, &outcome).await?;

        Ok(ChatTurn {
            user_message,
            assistant_message,
            from_cache: reply.from_cache,
            attempts: reply.attempts,
            extraction: outcome.into_extraction(),
            schedule_saved,
        })
    }

    /// Extract a schedule from the newest message if the assistant wrote it.
    pub async fn extract_latest(&self, ctx: &SessionContext) -> ChatResult<LatestExtraction> {
        self.verify_context(ctx).await?;
        let messages = self.repo.list_messages(ctx.session_id).await?;

        let outcome = match messages.last() {
            Some(last) if last.role == ChatRole::Assistant => extract_schedule(&last.content),
            _ => ExtractionOutcome::NotFound,
        };
        let schedule_saved = self.save_schedule(ctx.student_courses_id, &outcome).await?;
        Ok(LatestExtraction {
            outcome,
            schedule_saved,
        })
    }

    pub async fn timetable(&self, user_id: &str, id: StudentCoursesId) -> ChatResult<TimetableView> {
        let user_id = require_user(user_id)?;
        let record = self.owned_courses(user_id, id).await?;
        Ok(TimetableView::from_record(&record))
    }

    /// Courses submitted by all students, or only by `filter.owner` when set.
    pub async fn course_catalog(&self, filter: &CourseFilter) -> ChatResult<Vec<Course>> {
        let records = match filter.owner.as_deref().map(str::trim) {
            Some(owner) if !owner.is_empty() => self.repo.list_student_courses(owner).await?,
            _ => self.repo.list_all_student_courses().await?,
        };
        Ok(course_catalog(&records, filter))
    }

    async fn fetch_reply(
        &self,
        key: &str,
        record: &StudentCourses,
        history: &[AgentMessage],
    ) -> Result<AgentReply, AgentError> {
        if let Some(text) = self.cache.lookup(key).await {
            return Ok(AgentReply {
                text,
                from_cache: true,
                attempts: 0,
            });
        }

        let request = AgentRequest::new(record.priority_grouped.clone(), history.to_vec());
        let run_id = self.agent.dispatch(&request).await?;
        debug!("Polling run {} for cache key {}", run_id, key);
        let outcome = self.poller.poll(self.agent.as_ref(), &run_id).await?;

        self.cache.store(key, &outcome.reply).await;
        Ok(AgentReply {
            text: outcome.reply,
            from_cache: false,
            attempts: outcome.attempts,
        })
    }

    async fn save_schedule(&self, id: StudentCoursesId, outcome: &ExtractionOutcome) -> ChatResult<bool> {
        match outcome.schedule() {
            Some(schedule) if !schedule.is_empty() => {
                self.repo.update_schedule(id, schedule).await?;
                info!("Saved schedule with {} block(s) to courses record {}", schedule.len(), id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn owned_session(&self, user_id: &str, session_id: SessionId) -> ChatResult<ChatSession> {
        let session = self.repo.get_session(session_id).await?;
        if session.user_id != user_id {
            return Err(ChatError::NotOwner {
                entity: "chat session",
                id: session_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(session)
    }

    async fn owned_courses(&self, user_id: &str, id: StudentCoursesId) -> ChatResult<StudentCourses> {
        let record = self.repo.get_student_courses(id).await?;
        if record.user_id != user_id {
            return Err(ChatError::NotOwner {
                entity: "course list",
                id: id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(record)
    }

    async fn verify_context(&self, ctx: &SessionContext) -> ChatResult<StudentCourses> {
        let user_id = require_user(&ctx.user_id)?;
        self.owned_session(user_id, ctx.session_id).await?;
        self.owned_courses(user_id, ctx.student_courses_id).await
    }
}

fn require_user(user_id: &str) -> Result<&str, ValidationError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        Err(ValidationError::MissingUserId)
    } else {
        Ok(user_id)
    }
}

fn default_title(record: &StudentCourses) -> String {
    match record.courses.first_non_empty_day() {
        Some(day) => format!("Chat for {}", day),
        None => "Chat for your week".to_string(),
    }
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod chat_tests;
