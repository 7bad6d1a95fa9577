//! Course entries and the enums that classify them.
//!
//! A [`Course`] can only be obtained by validating a [`CourseDraft`], so every
//! course that reaches the prioritizer already carries a known weekday,
//! category and intensity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::week::Weekday;

/// Kind of work a course involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Calculation,
    Coding,
    Theory,
}

impl Category {
    /// Intensity preselected for a new course of this category.
    pub fn default_intensity(self) -> Intensity {
        match self {
            Category::Theory => Intensity::Bulky,
            Category::Calculation | Category::Coding => Intensity::Mid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Calculation => "calculation",
            Category::Coding => "coding",
            Category::Theory => "theory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calculation" => Ok(Category::Calculation),
            "coding" => Ok(Category::Coding),
            "theory" => Ok(Category::Theory),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// Difficulty / workload tag. Only used to order a day's courses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intensity {
    Hard,
    Easy,
    Mid,
    HardToGrasp,
    Bulky,
    BothHardBulky,
}

/// Study order, most demanding first.
pub const PRIORITY_ORDER: [Intensity; 6] = [
    Intensity::Hard,
    Intensity::BothHardBulky,
    Intensity::HardToGrasp,
    Intensity::Mid,
    Intensity::Bulky,
    Intensity::Easy,
];

/// Coarse grouping of intensities for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityBand {
    High,
    Moderate,
    Light,
}

impl Intensity {
    /// Rank in [`PRIORITY_ORDER`]; lower ranks are studied first.
    pub fn rank(self) -> u8 {
        match self {
            Intensity::Hard => 0,
            Intensity::BothHardBulky => 1,
            Intensity::HardToGrasp => 2,
            Intensity::Mid => 3,
            Intensity::Bulky => 4,
            Intensity::Easy => 5,
        }
    }

    pub fn band(self) -> IntensityBand {
        match self {
            Intensity::Hard | Intensity::HardToGrasp | Intensity::BothHardBulky => {
                IntensityBand::High
            }
            Intensity::Mid | Intensity::Bulky => IntensityBand::Moderate,
            Intensity::Easy => IntensityBand::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Hard => "hard",
            Intensity::Easy => "easy",
            Intensity::Mid => "mid",
            Intensity::HardToGrasp => "hard-to-grasp",
            Intensity::Bulky => "bulky",
            Intensity::BothHardBulky => "both-hard-bulky",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intensity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        PRIORITY_ORDER
            .iter()
            .copied()
            .find(|i| i.as_str() == needle)
            .ok_or_else(|| ValidationError::UnknownIntensity(s.to_string()))
    }
}

/// A validated course entry. Immutable once built.
///
/// Build from input with [`Course::new`] or [`Course::from_drafts`], which
/// validate. `Deserialize` exists for reading back records this crate
/// already stored (course maps in `student_courses`) and does not re-run
/// validation, so request bodies must go through [`CourseDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
    pub day: Weekday,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub category: Category,
    pub intensity: Intensity,
    #[serde(default, alias = "University", skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(default, alias = "Level", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, alias = "Department", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Unvalidated course input as it arrives from a form or API request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub name: String,
    pub day: String,
    #[serde(default)]
    pub time: Option<String>,
    pub category: String,
    /// Falls back to the category's default intensity when omitted.
    #[serde(default)]
    pub intensity: Option<String>,
    #[serde(default, alias = "University")]
    pub university: Option<String>,
    #[serde(default, alias = "Level")]
    pub level: Option<String>,
    #[serde(default, alias = "Department")]
    pub department: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<CourseDraft> for Course {
    type Error = ValidationError;

    fn try_from(draft: CourseDraft) -> Result<Self, Self::Error> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyCourseName);
        }
        let day: Weekday = draft.day.parse()?;
        let category: Category = draft.category.parse()?;
        let intensity = match non_blank(draft.intensity) {
            Some(raw) => raw.parse()?,
            None => category.default_intensity(),
        };

        Ok(Course {
            name,
            day,
            time: non_blank(draft.time),
            category,
            intensity,
            university: non_blank(draft.university),
            level: non_blank(draft.level),
            department: non_blank(draft.department),
        })
    }
}

impl Course {
    /// Build a course with only the required attributes.
    pub fn new(
        name: impl Into<String>,
        day: Weekday,
        category: Category,
        intensity: Intensity,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyCourseName);
        }
        Ok(Course {
            name,
            day,
            time: None,
            category,
            intensity,
            university: None,
            level: None,
            department: None,
        })
    }

    /// Validate a batch of drafts, failing on the first invalid entry.
    pub fn from_drafts(drafts: Vec<CourseDraft>) -> Result<Vec<Course>, ValidationError> {
        drafts.into_iter().map(Course::try_from).collect()
    }
}
