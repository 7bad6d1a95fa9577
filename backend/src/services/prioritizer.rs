//! Course prioritizer: partitions courses by weekday and orders each day by
//! intensity.

use serde::{Deserialize, Serialize};

use crate::models::{Course, WeekMap, Weekday};

/// Both views of a course list partitioned by weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupedCourses {
    /// Each day's courses in input order.
    pub grouped: WeekMap<Course>,
    /// Each day's courses stably sorted by [`crate::models::Intensity::rank`].
    pub priority_grouped: WeekMap<Course>,
}

/// Group courses by weekday and derive the priority-sorted view.
///
/// Every weekday is present in both mappings, and each input course appears
/// exactly once in each. Courses sharing an intensity keep their input order.
pub fn group_courses(courses: &[Course]) -> GroupedCourses {
    let mut grouped = WeekMap::new();
    for course in courses {
        grouped.push(course.day, course.clone());
    }

    let mut priority_grouped = grouped.clone();
    priority_grouped.for_each_day_mut(|_, day_courses| {
        // sort_by_key is stable
        day_courses.sort_by_key(|c| c.intensity.rank());
    });

    GroupedCourses {
        grouped,
        priority_grouped,
    }
}

/// Comma-separated course names for one day, in priority order.
pub fn course_names_for_day(priority_grouped: &WeekMap<Course>, day: Weekday) -> String {
    priority_grouped
        .get(day)
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "prioritizer_tests.rs"]
mod prioritizer_tests;
