//! Read models over stored student courses: the annotated timetable and the
//! course catalog.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::extractor::clean_course_name;
use crate::models::{
    Category, Course, ExtractedBlock, ExtractedSchedule, Intensity, IntensityBand, StudentCourses,
    StudentCoursesId, WeekMap, Weekday,
};

/// One scheduled study block with the attributes of the course it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(flatten)]
    pub block: ExtractedBlock,
    /// `None` when the block's course is not among the student's courses.
    pub intensity: Option<Intensity>,
    pub band: Option<IntensityBand>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableView {
    pub student_courses_id: StudentCoursesId,
    /// Empty on every day until a schedule has been extracted.
    pub schedule: WeekMap<TimetableEntry>,
    pub has_schedule: bool,
}

impl TimetableView {
    pub fn from_record(record: &StudentCourses) -> Self {
        let (schedule, has_schedule) = match &record.schedule {
            Some(schedule) => (annotate(schedule, &record.priority_grouped), true),
            None => (WeekMap::new(), false),
        };
        Self {
            student_courses_id: record.id,
            schedule,
            has_schedule,
        }
    }
}

/// Find the course a block refers to, searching every day.
///
/// Matches on the exact course name once parenthetical notes are removed.
pub fn find_course<'a>(priority_grouped: &'a WeekMap<Course>, block_course: &str) -> Option<&'a Course> {
    let wanted = clean_course_name(block_course);
    priority_grouped.values().find(|c| c.name == wanted)
}

/// Attach intensity, band and category to each block of `schedule`.
pub fn annotate(schedule: &ExtractedSchedule, priority_grouped: &WeekMap<Course>) -> WeekMap<TimetableEntry> {
    schedule.map(|block| {
        let course = find_course(priority_grouped, &block.course);
        TimetableEntry {
            block: block.clone(),
            intensity: course.map(|c| c.intensity),
            band: course.map(|c| c.intensity.band()),
            category: course.map(|c| c.category),
        }
    })
}

/// Catalog filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFilter {
    /// Only courses submitted by this user. Unset means every student.
    #[serde(default)]
    pub owner: Option<String>,
    /// Case-insensitive substring of the course name.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl CourseFilter {
    pub fn matches(&self, course: &Course) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => course
                .name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        };
        search_ok
            && tag_matches(&self.university, &course.university)
            && tag_matches(&self.level, &course.level)
            && tag_matches(&self.department, &course.department)
    }
}

impl CourseFilter {
    fn owns(&self, record: &StudentCourses) -> bool {
        match self.owner.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(owner) => record.user_id == owner,
        }
    }
}

fn tag_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(wanted) => actual.as_deref() == Some(wanted),
    }
}

/// Every course across `records`, each (name, weekday) pair once, in record
/// and weekday order, then filtered.
pub fn course_catalog(records: &[StudentCourses], filter: &CourseFilter) -> Vec<Course> {
    let mut seen: HashSet<(String, Weekday)> = HashSet::new();
    records
        .iter()
        .filter(|record| filter.owns(record))
        .flat_map(|record| record.courses.values())
        .filter(|course| seen.insert((course.name.clone(), course.day)))
        .filter(|course| filter.matches(course))
        .cloned()
        .collect()
}
