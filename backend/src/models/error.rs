//! Validation errors raised while constructing domain values from raw input.

/// Input rejected at the boundary where courses and schedule entries are built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown weekday '{0}'")]
    UnknownWeekday(String),

    #[error("Unknown course category '{0}' (expected calculation, coding or theory)")]
    UnknownCategory(String),

    #[error(
        "Unknown intensity '{0}' (expected hard, both-hard-bulky, hard-to-grasp, mid, bulky or easy)"
    )]
    UnknownIntensity(String),

    #[error("Course name is required")]
    EmptyCourseName,

    #[error("Message content is required")]
    EmptyMessage,

    #[error("A user id is required")]
    MissingUserId,
}
