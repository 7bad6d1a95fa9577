//! Postgres repository implementation using Diesel.
//!
//! Tables: `student_courses`, `chat_sessions`, `chat_messages` and
//! `prompt_cache` (see `migrations/`). Course maps and schedules are stored as
//! JSONB in the weekday-keyed shape produced by [`crate::models::WeekMap`].
//!
//! Blocking Diesel calls run on `spawn_blocking` over an r2d2 pool; retryable
//! failures are retried with exponential backoff. Pending migrations run when
//! the repository is created.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ChatRepository, CourseRepository, ErrorContext, PromptCacheRepository, RepositoryError,
    RepositoryResult,
};
use crate::models::{
    ChatMessage, ChatRole, ChatSession, ExtractedSchedule, NewChatSession, NewStudentCourses,
    PromptCacheEntry, SessionId, StudentCourses, StudentCoursesId,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Retry attempts for transient failures
    pub max_retries: u32,
    /// First retry delay; doubles with each retry
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    /// - `PG_MAX_RETRIES`: Maximum retry attempts (default: 3)
    /// - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Build the pool and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        info!("Postgres migrations are up to date");
        Ok(())
    }

    /// Run `f` on a pooled connection, retrying retryable failures up to
    /// `max_retries` times with doubling delay.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        debug!("Retrying Postgres operation after: {}", e);
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        return Err(e);
                    }
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

#[async_trait]
impl ChatRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_session(&self, session: &NewChatSession) -> RepositoryResult<ChatSession> {
        let row = NewChatSessionRow {
            user_id: session.user_id.clone(),
            title: session.title.clone(),
            student_courses_id: session.student_courses_id.map(|id| id.value()),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(chat_sessions::table)
                .values(&row)
                .returning(ChatSessionRow::as_returning())
                .get_result::<ChatSessionRow>(conn)
                .map(ChatSession::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_session"))
        })
        .await
    }

    async fn get_session(&self, session_id: SessionId) -> RepositoryResult<ChatSession> {
        self.with_conn(move |conn| {
            chat_sessions::table
                .find(session_id.value())
                .select(ChatSessionRow::as_select())
                .first::<ChatSessionRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(ChatSession::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_entity("chat_session", session_id)
                        .with_operation("get_session")
                })
        })
        .await
    }

    async fn list_sessions(&self, user_id: &str) -> RepositoryResult<Vec<ChatSession>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let rows = chat_sessions::table
                .filter(chat_sessions::user_id.eq(&user_id))
                .order((chat_sessions::created_at.desc(), chat_sessions::id.desc()))
                .select(ChatSessionRow::as_select())
                .load::<ChatSessionRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(ChatSession::from).collect())
        })
        .await
    }

    async fn append_message(
        &self,
        session_id: SessionId,
        role: ChatRole,
        content: &str,
    ) -> RepositoryResult<ChatMessage> {
        let row = NewChatMessageRow {
            session_id: session_id.value(),
            role: role.as_str().to_string(),
            content: content.to_string(),
        };
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let exists = chat_sessions::table
                    .find(session_id.value())
                    .select(chat_sessions::id)
                    .first::<i64>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .is_some();
                if !exists {
                    return Err(RepositoryError::not_found_entity("chat_session", session_id)
                        .with_operation("append_message"));
                }

                let inserted = diesel::insert_into(chat_messages::table)
                    .values(&row)
                    .returning(ChatMessageRow::as_returning())
                    .get_result::<ChatMessageRow>(tx)
                    .map_err(map_diesel_error)?;
                ChatMessage::try_from(inserted)
            })
        })
        .await
    }

    async fn list_messages(&self, session_id: SessionId) -> RepositoryResult<Vec<ChatMessage>> {
        self.with_conn(move |conn| {
            let rows = chat_messages::table
                .filter(chat_messages::session_id.eq(session_id.value()))
                .order((chat_messages::created_at.asc(), chat_messages::id.asc()))
                .select(ChatMessageRow::as_select())
                .load::<ChatMessageRow>(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(ChatMessage::try_from).collect()
        })
        .await
    }
}

#[async_trait]
impl CourseRepository for PostgresRepository {
    async fn store_student_courses(
        &self,
        record: &NewStudentCourses,
    ) -> RepositoryResult<StudentCourses> {
        let row = NewStudentCoursesRow {
            user_id: record.user_id.clone(),
            courses_json: serde_json::to_value(&record.courses)?,
            priority_grouped_json: serde_json::to_value(&record.priority_grouped)?,
        };
        self.with_conn(move |conn| {
            let inserted = diesel::insert_into(student_courses::table)
                .values(&row)
                .returning(StudentCoursesRow::as_returning())
                .get_result::<StudentCoursesRow>(conn)
                .map_err(|e| map_diesel_error(e).with_operation("store_student_courses"))?;
            StudentCourses::try_from(inserted)
        })
        .await
    }

    async fn get_student_courses(&self, id: StudentCoursesId) -> RepositoryResult<StudentCourses> {
        self.with_conn(move |conn| {
            let row = student_courses::table
                .find(id.value())
                .select(StudentCoursesRow::as_select())
                .first::<StudentCoursesRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found_entity("student_courses", id)
                        .with_operation("get_student_courses")
                })?;
            StudentCourses::try_from(row)
        })
        .await
    }

    async fn list_student_courses(&self, user_id: &str) -> RepositoryResult<Vec<StudentCourses>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let rows = student_courses::table
                .filter(student_courses::user_id.eq(&user_id))
                .order(student_courses::id.asc())
                .select(StudentCoursesRow::as_select())
                .load::<StudentCoursesRow>(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(StudentCourses::try_from).collect()
        })
        .await
    }

    async fn list_all_student_courses(&self) -> RepositoryResult<Vec<StudentCourses>> {
        self.with_conn(move |conn| {
            let rows = student_courses::table
                .order(student_courses::id.asc())
                .select(StudentCoursesRow::as_select())
                .load::<StudentCoursesRow>(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(StudentCourses::try_from).collect()
        })
        .await
    }

    async fn update_schedule(
        &self,
        id: StudentCoursesId,
        schedule: &ExtractedSchedule,
    ) -> RepositoryResult<StudentCourses> {
        let schedule_json = serde_json::to_value(schedule)?;
        let updated_at = chrono::Utc::now();
        self.with_conn(move |conn| {
            let row = diesel::update(student_courses::table.find(id.value()))
                .set((
                    student_courses::schedule_json.eq(Some(schedule_json.clone())),
                    student_courses::updated_at.eq(updated_at),
                ))
                .returning(StudentCoursesRow::as_returning())
                .get_result::<StudentCoursesRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found_entity("student_courses", id)
                        .with_operation("update_schedule")
                })?;
            StudentCourses::try_from(row)
        })
        .await
    }
}

#[async_trait]
impl PromptCacheRepository for PostgresRepository {
    async fn get_cached_response(&self, prompt_key: &str) -> RepositoryResult<Option<PromptCacheEntry>> {
        let prompt_key = prompt_key.to_string();
        self.with_conn(move |conn| {
            prompt_cache::table
                .find(&prompt_key)
                .select(PromptCacheRow::as_select())
                .first::<PromptCacheRow>(conn)
                .optional()
                .map(|row| row.map(PromptCacheEntry::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn store_cached_response(
        &self,
        prompt_key: &str,
        response: &str,
    ) -> RepositoryResult<PromptCacheEntry> {
        let row = PromptCacheRow {
            prompt_key: prompt_key.to_string(),
            response: response.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(prompt_cache::table)
                .values(&row)
                .on_conflict(prompt_cache::prompt_key)
                .do_nothing()
                .execute(conn)
                .map_err(map_diesel_error)?;

            prompt_cache::table
                .find(&row.prompt_key)
                .select(PromptCacheRow::as_select())
                .first::<PromptCacheRow>(conn)
                .map(PromptCacheEntry::from)
                .map_err(map_diesel_error)
        })
        .await
    }
}
