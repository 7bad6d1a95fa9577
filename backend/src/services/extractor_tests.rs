use proptest::prelude::*;

use super::*;

const SINGLE_BLOCK: &str =
    "**Day:** Monday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** MTH101";

fn found(outcome: ExtractionOutcome) -> Extraction {
    outcome.into_extraction().expect("expected a schedule")
}

#[test]
fn test_single_block_extraction() {
    let extraction = found(extract_schedule(SINGLE_BLOCK));

    assert_eq!(
        extraction.schedule.get(Weekday::Monday),
        &[ExtractedBlock {
            day: Weekday::Monday,
            course: "MTH101".to_string(),
            start: "5:00 PM".to_string(),
            end: "6:00 PM".to_string(),
        }]
    );
    for day in Weekday::ALL.iter().filter(|d| **d != Weekday::Monday) {
        assert!(extraction.schedule.get(*day).is_empty());
    }
    assert!(extraction.rejected.is_empty());
    assert!(extraction.skipped.is_empty());
}

#[test]
fn test_single_block_json_shape() {
    let extraction = found(extract_schedule(SINGLE_BLOCK));
    let value = serde_json::to_value(&extraction.schedule).unwrap();

    assert_eq!(
        value["Monday"],
        serde_json::json!([{"Day": "Monday", "Course": "MTH101", "Start": "5:00 PM", "End": "6:00 PM"}])
    );
    assert_eq!(value["Sunday"], serde_json::json!([]));
}

#[test]
fn test_parenthetical_is_stripped_from_course() {
    let text = "**Day:** Tuesday\n**Start Time:** 9:00 AM\n**End Time:** 10:30 AM\n**Courses:** MTH101 (core)";
    let extraction = found(extract_schedule(text));
    assert_eq!(extraction.schedule.get(Weekday::Tuesday)[0].course, "MTH101");
}

#[test]
fn test_clean_course_name_handles_several_annotations() {
    assert_eq!(clean_course_name("MTH101 (core), PHY102 (lab)"), "MTH101, PHY102");
    assert_eq!(clean_course_name("  Calculus (MTH101)  "), "Calculus");
    assert_eq!(clean_course_name("CSC201"), "CSC201");
}

#[test]
fn test_no_blocks_reports_not_found() {
    let outcome = extract_schedule("Could you tell me when your football practice ends?");
    assert_eq!(outcome, ExtractionOutcome::NotFound);
    assert!(!outcome.is_found());
    assert!(outcome.schedule().is_none());
}

#[test]
fn test_multiple_blocks_with_messy_whitespace() {
    let text = concat!(
        "Here is your plan:\r\n\r\n\r\n",
        "**Day:**   Monday\r\n**Start Time:** 5:00 PM\r\n**End Time:**\t\t6:00 PM\r\n**Courses:** MTH101\r\n\r\n\r\n",
        "**DAY:** wednesday\n**start time:** 7:00 PM\n**End Time:** 8:00 PM\n**Courses:** CSC201 (practice)\n\n",
        "**Day:** Monday\n**Start Time:** 8:00 PM\n**End Time:** 9:00 PM\n**Courses:** GST101\n\n",
        "Good luck!"
    );
    let extraction = found(extract_schedule(text));

    let monday = extraction.schedule.get(Weekday::Monday);
    assert_eq!(monday.len(), 2);
    assert_eq!(monday[0].course, "MTH101");
    assert_eq!(monday[0].end, "6:00 PM");
    assert_eq!(monday[1].course, "GST101");

    let wednesday = extraction.schedule.get(Weekday::Wednesday);
    assert_eq!(wednesday.len(), 1);
    assert_eq!(wednesday[0].day, Weekday::Wednesday);
    assert_eq!(wednesday[0].course, "CSC201");
    assert_eq!(wednesday[0].start, "7:00 PM");
}

#[test]
fn test_unknown_day_is_rejected_not_keyed() {
    let text = concat!(
        "**Day:** Funday\n**Start Time:** 1:00 PM\n**End Time:** 2:00 PM\n**Courses:** ART100\n\n",
        "**Day:** Friday\n**Start Time:** 1:00 PM\n**End Time:** 2:00 PM\n**Courses:** MTH101"
    );
    let extraction = found(extract_schedule(text));

    assert_eq!(extraction.schedule.len(), 1);
    assert_eq!(extraction.schedule.get(Weekday::Friday).len(), 1);
    assert_eq!(extraction.rejected.len(), 1);
    assert_eq!(extraction.rejected[0].day, "Funday");
}

#[test]
fn test_block_missing_field_is_reported() {
    let text = concat!(
        "**Day:** Monday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** MTH101\n\n",
        "**Day:** Tuesday\n**Start Time:** 5:00 PM\n**Courses:** PHY101"
    );
    let extraction = found(extract_schedule(text));

    assert_eq!(extraction.schedule.len(), 1);
    assert_eq!(extraction.skipped.len(), 1);
    assert_eq!(extraction.skipped[0].missing_field, Some(BlockField::EndTime));
    assert!(text.len() >= extraction.skipped[0].span.end);
}

#[test]
fn test_reordered_fields_are_skipped() {
    let text = concat!(
        "**Day:** Monday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** MTH101\n\n",
        "**Day:** Thursday\n**End Time:** 6:00 PM\n**Start Time:** 5:00 PM\n**Courses:** BIO101"
    );
    let extraction = found(extract_schedule(text));

    assert!(extraction.schedule.get(Weekday::Thursday).is_empty());
    assert_eq!(extraction.skipped.len(), 1);
    assert_eq!(extraction.skipped[0].missing_field, Some(BlockField::EndTime));
}

#[test]
fn test_prose_after_courses_without_blank_line_skips_block() {
    let text = "**Day:** Monday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** MTH101\nEnjoy!";
    assert_eq!(extract_schedule(text), ExtractionOutcome::NotFound);
}

#[test]
fn test_label_inside_matched_block_is_not_skipped() {
    let text = "**Day:** **Day:** Monday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** MTH101";
    let extraction = found(extract_schedule(text));

    assert!(extraction.schedule.is_empty());
    assert_eq!(extraction.rejected.len(), 1);
    assert!(extraction.skipped.is_empty());
}

#[test]
fn test_whitespace_only_separator_line_splits_blocks() {
    let text = concat!(
        "**Day:** Monday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** MTH101\n  \n",
        "**Day:** Tuesday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** PHY101"
    );
    let extraction = found(extract_schedule(text));

    assert_eq!(extraction.schedule.get(Weekday::Monday)[0].course, "MTH101");
    assert_eq!(extraction.schedule.get(Weekday::Tuesday)[0].course, "PHY101");
    assert!(extraction.skipped.is_empty());
}

#[test]
fn test_normalize_text_rules() {
    assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
    assert_eq!(normalize_text("a\n\n\n\nb"), "a\n\nb");
    assert_eq!(normalize_text("a  \t b"), "a b");
    assert_eq!(normalize_text("a \n \t \nb"), "a\n\nb");
    assert_eq!(normalize_text("  \n padded \n  "), "padded");
}

proptest! {
    #[test]
    fn prop_normalize_is_idempotent(raw in "[a-z \t\r\n*:]{0,80}") {
        let once = normalize_text(&raw);
        let twice = normalize_text(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_extraction_is_stable_on_normalized_text(raw in "[a-zA-Z \t\r\n*:]{0,60}") {
        let normalized = normalize_text(&raw);
        prop_assert_eq!(extract_schedule(&raw), extract_schedule(&normalized));
    }
}
