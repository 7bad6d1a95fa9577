use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::db::{ChatRepository, CourseRepository};
use crate::models::{Category, Intensity, Weekday};
use crate::services::test_support::{service_with, ScriptedAgent};

const SCHEDULE_REPLY: &str = "Here is your plan.\n\n\
**Day:** Monday\n**Start Time:** 5:00 PM\n**End Time:** 6:00 PM\n**Courses:** MTH101 (revision)\n\n\
**Day:** Wednesday\n**Start Time:** 7:00 PM\n**End Time:** 8:00 PM\n**Courses:** GST101";

fn courses() -> Vec<Course> {
    vec![
        Course::new("GST101", Weekday::Wednesday, Category::Theory, Intensity::Easy).unwrap(),
        Course::new("MTH101", Weekday::Monday, Category::Calculation, Intensity::Hard).unwrap(),
        Course::new("PHY101", Weekday::Monday, Category::Theory, Intensity::Mid).unwrap(),
    ]
}

#[tokio::test]
async fn test_start_session_stores_grouped_courses() {
    let (service, repo) = service_with(Arc::new(ScriptedAgent::new(Vec::<String>::new())));

    let ctx = service.start_session("u1", None, &courses()).await.unwrap();
    assert_eq!(ctx.user_id, "u1");

    let session = repo.get_session(ctx.session_id).await.unwrap();
    assert_eq!(session.title, "Chat for Monday");
    assert_eq!(session.student_courses_id, Some(ctx.student_courses_id));

    let record = repo.get_student_courses(ctx.student_courses_id).await.unwrap();
    let monday: Vec<&str> = record
        .priority_grouped
        .get(Weekday::Monday)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(monday, vec!["MTH101", "PHY101"]);
    assert!(record.schedule.is_none());
}

#[tokio::test]
async fn test_start_session_with_title_and_no_courses() {
    let (service, repo) = service_with(Arc::new(ScriptedAgent::new(Vec::<String>::new())));

    let named = service
        .start_session("u1", Some("  Exam week  ".to_string()), &courses())
        .await
        .unwrap();
    assert_eq!(repo.get_session(named.session_id).await.unwrap().title, "Exam week");

    let empty = service.start_session("u1", None, &[]).await.unwrap();
    assert_eq!(
        repo.get_session(empty.session_id).await.unwrap().title,
        "Chat for your week"
    );
}

#[tokio::test]
async fn test_blank_user_is_rejected() {
    let (service, repo) = service_with(Arc::new(ScriptedAgent::new(Vec::<String>::new())));

    let err = service.start_session("  ", None, &courses()).await.unwrap_err();
    assert!(matches!(err, ChatError::Validation(ValidationError::MissingUserId)));
    assert_eq!(repo.session_count(), 0);
}

#[tokio::test]
async fn test_send_message_saves_reply_and_schedule() {
    let agent = Arc::new(ScriptedAgent::new([SCHEDULE_REPLY]).with_checks(3));
    let (service, repo) = service_with(agent.clone());
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let turn = service
        .send_message(&ctx, "  I play football on Tuesdays  ")
        .await
        .unwrap();

    assert_eq!(turn.user_message.content, "I play football on Tuesdays");
    assert_eq!(turn.reply(), SCHEDULE_REPLY);
    assert!(!turn.from_cache);
    assert_eq!(turn.attempts, 3);
    assert!(turn.schedule_saved);
    let extraction = turn.extraction.unwrap();
    assert_eq!(extraction.schedule.len(), 2);
    assert_eq!(extraction.schedule.get(Weekday::Monday)[0].course, "MTH101");

    let record = repo.get_student_courses(ctx.student_courses_id).await.unwrap();
    assert_eq!(record.schedule.unwrap(), extraction.schedule);

    let messages = repo.list_messages(ctx.session_id).await.unwrap();
    let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);

    let requests = agent.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 1);
    assert!(requests[0].system.contains("Monday: MTH101, PHY101"));
}

#[tokio::test]
async fn test_follow_up_carries_full_history() {
    let agent = Arc::new(ScriptedAgent::new([
        "When do your classes end?",
        SCHEDULE_REPLY,
    ]));
    let (service, _repo) = service_with(agent.clone());
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let first = service.send_message(&ctx, "Plan my week").await.unwrap();
    assert!(first.extraction.is_none());
    assert!(!first.schedule_saved);

    service.send_message(&ctx, "Around 4 PM").await.unwrap();
    let requests = agent.requests();
    let history: Vec<&str> = requests[1].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        history,
        vec!["Plan my week", "When do your classes end?", "Around 4 PM"]
    );
}

#[tokio::test]
async fn test_empty_message_is_rejected_before_storage() {
    let agent = Arc::new(ScriptedAgent::new(["unused"]));
    let (service, repo) = service_with(agent.clone());
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let err = service.send_message(&ctx, " \n ").await.unwrap_err();
    assert!(matches!(err, ChatError::Validation(ValidationError::EmptyMessage)));
    assert!(repo.list_messages(ctx.session_id).await.unwrap().is_empty());
    assert_eq!(agent.dispatch_count(), 0);
}

#[tokio::test]
async fn test_agent_failure_keeps_user_message() {
    let agent = Arc::new(ScriptedAgent::new(Vec::<String>::new()));
    let (service, repo) = service_with(agent);
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let err = service.send_message(&ctx, "Hello").await.unwrap_err();
    assert!(matches!(err, ChatError::Agent(AgentError::Status { status: 503, .. })));

    let messages = repo.list_messages(ctx.session_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, ChatRole::User);
}

#[tokio::test]
async fn test_poll_timeout_surfaces_as_agent_error() {
    let agent = Arc::new(ScriptedAgent::new(["late"]).with_checks(50));
    let (service, _repo) = service_with(agent);
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let err = service.send_message(&ctx, "Hello").await.unwrap_err();
    assert!(matches!(err, ChatError::Agent(AgentError::PollTimeout { attempts: 5, .. })));
}

#[tokio::test]
async fn test_identical_context_is_answered_from_cache() {
    let agent = Arc::new(ScriptedAgent::new([SCHEDULE_REPLY]));
    let (service, repo) = service_with(agent.clone());

    let first = service.start_session("u1", None, &courses()).await.unwrap();
    let second = service.start_session("u2", None, &courses()).await.unwrap();

    let fresh = service.send_message(&first, "Plan my week").await.unwrap();
    let cached = service.send_message(&second, "Plan my week").await.unwrap();

    assert!(!fresh.from_cache);
    assert!(cached.from_cache);
    assert_eq!(cached.attempts, 0);
    assert_eq!(cached.reply(), SCHEDULE_REPLY);
    assert!(cached.schedule_saved);
    assert_eq!(agent.dispatch_count(), 1);
    assert_eq!(repo.cache_entry_count(), 1);
}

#[tokio::test]
async fn test_concurrent_identical_turns_dispatch_once() {
    let agent = Arc::new(ScriptedAgent::new([SCHEDULE_REPLY]).with_delay(Duration::from_millis(50)));
    let (service, _repo) = service_with(agent.clone());
    let service = Arc::new(service);

    let first = service.start_session("u1", None, &courses()).await.unwrap();
    let second = service.start_session("u2", None, &courses()).await.unwrap();

    let (a, b) = tokio::join!(
        service.send_message(&first, "Plan my week"),
        service.send_message(&second, "Plan my week"),
    );
    assert_eq!(a.unwrap().reply(), SCHEDULE_REPLY);
    assert_eq!(b.unwrap().reply(), SCHEDULE_REPLY);
    assert_eq!(agent.dispatch_count(), 1);
}

#[tokio::test]
async fn test_foreign_session_is_refused() {
    let (service, _repo) = service_with(Arc::new(ScriptedAgent::new(["hi"])));
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let err = service.resume_session("u2", ctx.session_id).await.unwrap_err();
    assert!(matches!(err, ChatError::NotOwner { .. }));

    let forged = SessionContext {
        user_id: "u2".to_string(),
        ..ctx.clone()
    };
    let err = service.send_message(&forged, "hello").await.unwrap_err();
    assert!(matches!(err, ChatError::NotOwner { .. }));

    let err = service.timetable("u2", ctx.student_courses_id).await.unwrap_err();
    assert!(matches!(err, ChatError::NotOwner { .. }));
}

#[tokio::test]
async fn test_resume_and_list_sessions() {
    let (service, _repo) = service_with(Arc::new(ScriptedAgent::new(["Tell me more"])));
    let older = service.start_session("u1", Some("First".to_string()), &courses()).await.unwrap();
    service.send_message(&older, "Plan my week").await.unwrap();
    let newer = service.start_session("u1", Some("Second".to_string()), &courses()).await.unwrap();

    let resumed = service.resume_session("u1", older.session_id).await.unwrap();
    assert_eq!(resumed.context, older);
    assert_eq!(resumed.title, "First");
    assert_eq!(resumed.messages.len(), 2);

    let sessions = service.list_sessions("u1").await.unwrap();
    let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![newer.session_id, older.session_id]);
    assert!(service.list_sessions("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resume_missing_session_is_repository_error() {
    let (service, _repo) = service_with(Arc::new(ScriptedAgent::new(Vec::<String>::new())));
    let err = service.resume_session("u1", SessionId::new(404)).await.unwrap_err();
    assert!(matches!(err, ChatError::Repository(RepositoryError::NotFound { .. })));
}

#[tokio::test]
async fn test_extract_latest_only_reads_assistant_messages() {
    let (service, repo) = service_with(Arc::new(ScriptedAgent::new([SCHEDULE_REPLY])));
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let nothing = service.extract_latest(&ctx).await.unwrap();
    assert_eq!(nothing.outcome, ExtractionOutcome::NotFound);
    assert!(!nothing.schedule_saved);

    service.send_message(&ctx, "Plan my week").await.unwrap();
    let latest = service.extract_latest(&ctx).await.unwrap();
    assert!(latest.outcome.is_found());
    assert!(latest.schedule_saved);

    repo.append_message(ctx.session_id, ChatRole::User, SCHEDULE_REPLY)
        .await
        .unwrap();
    let user_last = service.extract_latest(&ctx).await.unwrap();
    assert_eq!(user_last.outcome, ExtractionOutcome::NotFound);
}

#[tokio::test]
async fn test_timetable_and_catalog() {
    let (service, _repo) = service_with(Arc::new(ScriptedAgent::new([SCHEDULE_REPLY])));
    let ctx = service.start_session("u1", None, &courses()).await.unwrap();

    let before = service.timetable("u1", ctx.student_courses_id).await.unwrap();
    assert!(!before.has_schedule);

    service.send_message(&ctx, "Plan my week").await.unwrap();
    let after = service.timetable("u1", ctx.student_courses_id).await.unwrap();
    assert!(after.has_schedule);
    let monday = &after.schedule.get(Weekday::Monday)[0];
    assert_eq!(monday.intensity, Some(Intensity::Hard));
    assert_eq!(monday.category, Some(Category::Calculation));

    let filter = CourseFilter {
        owner: Some("u1".to_string()),
        search: Some("mth".to_string()),
        ..Default::default()
    };
    let found = service.course_catalog(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "MTH101");

    let someone_else = CourseFilter {
        owner: Some("u2".to_string()),
        ..Default::default()
    };
    assert!(service.course_catalog(&someone_else).await.unwrap().is_empty());
}
