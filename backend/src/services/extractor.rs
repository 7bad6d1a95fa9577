//! Schedule extraction from assistant replies.
//!
//! The agent is asked to finish a conversation with one labelled block per
//! study session:
//!
//! ```text
//! **Day:** Monday
//! **Start Time:** 5:00 PM
//! **End Time:** 6:00 PM
//! **Courses:** MTH101 (core)
//! ```
//!
//! Blocks are separated by a blank line. Extraction is best effort: a block
//! that deviates from this layout is skipped, but every skipped `**Day:**`
//! label is reported with the first field that could not be found so callers
//! can tell the user what went wrong.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{ExtractedBlock, ExtractedSchedule, Weekday};

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r").expect("valid regex"));
static TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").expect("valid regex"));
static HORIZONTAL_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

static BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\*\*Day:\*\*\s*(.+?)\s*\n+",
        r"\*\*Start Time:\*\*\s*(.+?)\s*\n+",
        r"\*\*End Time:\*\*\s*(.+?)\s*\n+",
        r"\*\*Courses:\*\*\s*(.+?)(?:\n\n|\z)",
    ))
    .expect("valid regex")
});

static DAY_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\*\*Day:\*\*").expect("valid regex"));
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid regex"));

/// Labelled fields of a schedule block, in the order they must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockField {
    Day,
    StartTime,
    EndTime,
    Courses,
}

impl BlockField {
    const ORDER: [BlockField; 4] = [
        BlockField::Day,
        BlockField::StartTime,
        BlockField::EndTime,
        BlockField::Courses,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BlockField::Day => "**day:**",
            BlockField::StartTime => "**start time:**",
            BlockField::EndTime => "**end time:**",
            BlockField::Courses => "**courses:**",
        }
    }
}

/// Byte range within the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

/// A `**Day:**` label that did not start a well-formed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBlock {
    pub span: TextSpan,
    /// First expected field that was absent, or `None` when every label was
    /// present but the layout around them did not match.
    pub missing_field: Option<BlockField>,
}

/// A well-formed block whose day value is not a weekday name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedBlock {
    pub span: TextSpan,
    pub day: String,
    pub reason: String,
}

/// Result of a pass that matched at least one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub schedule: ExtractedSchedule,
    pub rejected: Vec<RejectedBlock>,
    pub skipped: Vec<SkippedBlock>,
}

/// Outcome of running the extractor over one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// The text contains no labelled block at all. Expected while the
    /// conversation is still gathering information.
    NotFound,
    Found(Extraction),
}

impl ExtractionOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ExtractionOutcome::Found(_))
    }

    pub fn schedule(&self) -> Option<&ExtractedSchedule> {
        match self {
            ExtractionOutcome::Found(extraction) => Some(&extraction.schedule),
            ExtractionOutcome::NotFound => None,
        }
    }

    pub fn into_extraction(self) -> Option<Extraction> {
        match self {
            ExtractionOutcome::Found(extraction) => Some(extraction),
            ExtractionOutcome::NotFound => None,
        }
    }
}

/// Normalize line endings and whitespace so block boundaries are predictable.
///
/// CR/CRLF become LF, trailing spaces/tabs are dropped from every line (so a
/// whitespace-only line counts as blank), any run of blank lines becomes a
/// single blank line, runs of spaces/tabs become one space, and the result is
/// trimmed.
pub fn normalize_text(text: &str) -> String {
    let text = LINE_BREAKS.replace_all(text, "\n");
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let text = HORIZONTAL_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Remove parenthesized annotations such as `(MTH101)` or `(core)`.
pub fn clean_course_name(raw: &str) -> String {
    PARENTHETICAL.replace_all(raw.trim(), "").trim().to_string()
}

/// Extract every labelled study block from `text`.
pub fn extract_schedule(text: &str) -> ExtractionOutcome {
    let text = normalize_text(text);

    let mut schedule = ExtractedSchedule::new();
    let mut rejected = Vec::new();
    let mut matched = Vec::new();

    for caps in BLOCK.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        let span = TextSpan {
            start: whole.start(),
            end: whole.end(),
        };
        matched.push(span);

        let field = |i: usize| caps.get(i).map(|m| m.as_str().trim()).unwrap_or_default();
        let day_raw = field(1);

        match day_raw.parse::<Weekday>() {
            Ok(day) => schedule.push(
                day,
                ExtractedBlock {
                    day,
                    course: clean_course_name(field(4)),
                    start: field(2).to_string(),
                    end: field(3).to_string(),
                },
            ),
            Err(e) => {
                warn!("Rejecting schedule block at {}..{}: {}", span.start, span.end, e);
                rejected.push(RejectedBlock {
                    span,
                    day: day_raw.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if matched.is_empty() {
        debug!("No schedule block found in {} bytes of text", text.len());
        return ExtractionOutcome::NotFound;
    }

    let skipped = find_skipped_blocks(&text, &matched);
    if !skipped.is_empty() {
        warn!("Skipped {} malformed schedule block(s)", skipped.len());
    }

    ExtractionOutcome::Found(Extraction {
        schedule,
        rejected,
        skipped,
    })
}

/// Report every `**Day:**` label that lies outside all matched blocks.
fn find_skipped_blocks(text: &str, matched: &[TextSpan]) -> Vec<SkippedBlock> {
    let labels: Vec<usize> = DAY_LABEL.find_iter(text).map(|m| m.start()).collect();
    let lower = text.to_ascii_lowercase();

    labels
        .iter()
        .enumerate()
        .filter(|(_, start)| !matched.iter().any(|span| (span.start..span.end).contains(*start)))
        .map(|(i, &start)| {
            // A candidate block runs until the next day label or the end of text.
            let end = labels.get(i + 1).copied().unwrap_or(text.len());
            SkippedBlock {
                span: TextSpan { start, end },
                missing_field: first_missing_field(&lower[start..end]),
            }
        })
        .collect()
}

fn first_missing_field(segment: &str) -> Option<BlockField> {
    let mut cursor = 0;
    for field in BlockField::ORDER {
        match segment[cursor..].find(field.label()) {
            Some(pos) => cursor += pos + field.label().len(),
            None => return Some(field),
        }
    }
    None
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod extractor_tests;
