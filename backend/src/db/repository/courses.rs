//! Student-courses records and the schedules negotiated for them.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{ExtractedSchedule, NewStudentCourses, StudentCourses, StudentCoursesId};

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist a student's grouped courses. The new record has no schedule.
    async fn store_student_courses(
        &self,
        record: &NewStudentCourses,
    ) -> RepositoryResult<StudentCourses>;

    /// # Errors
    /// `RepositoryError::NotFound` if the record does not exist.
    async fn get_student_courses(&self, id: StudentCoursesId) -> RepositoryResult<StudentCourses>;

    /// Every record owned by `user_id`, oldest first.
    async fn list_student_courses(&self, user_id: &str) -> RepositoryResult<Vec<StudentCourses>>;

    /// Every record from every student, oldest first. Backs the shared
    /// course catalog.
    async fn list_all_student_courses(&self) -> RepositoryResult<Vec<StudentCourses>>;

    /// Replace the stored schedule and bump `updated_at`.
    async fn update_schedule(
        &self,
        id: StudentCoursesId,
        schedule: &ExtractedSchedule,
    ) -> RepositoryResult<StudentCourses>;
}
