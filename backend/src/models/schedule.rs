//! Structured schedule entries recovered from assistant replies.

use serde::{Deserialize, Serialize};

use super::week::{WeekMap, Weekday};

/// One study block parsed out of free-form assistant text.
///
/// Field names are capitalized on the wire to stay compatible with schedules
/// already stored by earlier clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedBlock {
    #[serde(rename = "Day")]
    pub day: Weekday,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
}

/// Weekday-keyed schedule produced by a single extraction pass.
pub type ExtractedSchedule = WeekMap<ExtractedBlock>;
