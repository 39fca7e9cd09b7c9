//! End-to-end lifecycle scenarios over an in-memory store.

use std::sync::{Arc, Mutex};

use aptly_core::analysis::analyze;
use aptly_core::countdown::{Countdown, CountdownEnd};
use aptly_core::engine::AssessmentEngine;
use aptly_core::error::{AssessError, EligibilityError};
use aptly_core::identity::UserContext;
use aptly_core::model::{ExamType, ScheduleStatus};
use aptly_core::question_bank::{OptionDraft, QuestionDraft};
use aptly_core::recommend::recommend;
use aptly_core::schedule::ScheduleInput;
use aptly_core::session::SessionState;
use aptly_core::store::MemoryStore;
use aptly_core::traits::{Clock, IdentityDirectory, KeyValueStore, ManualClock};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

fn noon() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-10-06T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn engine() -> (AssessmentEngine, Arc<ManualClock>) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(noon()));
    let engine = AssessmentEngine::open(store, clock.clone(), &IdentityDirectory).unwrap();
    (engine, clock)
}

fn publish(engine: &AssessmentEngine, exam_type: ExamType, count: usize) {
    for i in 0..count {
        let draft = QuestionDraft {
            text: format!("{exam_type} question {}", i + 1),
            options: vec![
                OptionDraft::new("Strongly agree", "a:2"),
                OptionDraft::new("Agree", "a:1"),
                OptionDraft::new("Disagree", ""),
            ],
        };
        engine.questions().upsert_question(exam_type, None, draft).unwrap();
    }
}

fn window(exam_type: ExamType) -> ScheduleInput {
    ScheduleInput {
        exam_type: Some(exam_type),
        start_date: NaiveDate::from_ymd_opt(2025, 10, 6),
        start_time: NaiveTime::from_hms_opt(8, 0, 0),
        end_date: NaiveDate::from_ymd_opt(2025, 10, 6),
        end_time: NaiveTime::from_hms_opt(20, 0, 0),
        duration_minutes: 15,
        instructions: Some("Answer honestly.".into()),
    }
}

fn student() -> UserContext {
    UserContext::resolve(&IdentityDirectory, "ana")
}

#[test]
fn personality_all_fives_scores_one_hundred() {
    let (engine, _) = engine();
    publish(&engine, ExamType::Personality, 10);
    let schedule = engine
        .schedules()
        .create_schedule(&window(ExamType::Personality), "admin")
        .unwrap();
    engine.select_schedule(&student(), schedule.id).unwrap();

    let mut session = engine.session(student(), ExamType::Personality);
    session.begin().unwrap();
    for i in 0..10 {
        session.answer(i, 5).unwrap();
    }
    let attempt = session.submit().unwrap();
    assert_eq!(attempt.score, 100.0);

    let analysis = analyze(&attempt);
    assert_eq!(analysis.categories.len(), 10);
    assert!(analysis
        .categories
        .iter()
        .all(|c| c.avg_score == 5.0 && c.percentage == 100.0));
    assert_eq!(analyze(&attempt), analysis);
}

#[test]
fn active_skills_schedule_without_questions_aborts() {
    let (engine, _) = engine();
    let schedule = engine
        .schedules()
        .create_schedule(&window(ExamType::Skills), "admin")
        .unwrap();
    // Questions were published at launch time and removed afterwards.
    publish(&engine, ExamType::Skills, 1);
    engine.select_schedule(&student(), schedule.id).unwrap();
    engine.questions().delete_question(ExamType::Skills, 0).unwrap();

    let mut session = engine.session(student(), ExamType::Skills);
    let err = session.begin().unwrap_err();
    assert!(matches!(
        err,
        AssessError::Eligibility(EligibilityError::NoPublishedQuestions(ExamType::Skills))
    ));
    assert_eq!(session.state(), SessionState::Aborted);
    assert!(engine.ledger().list_all_attempts().unwrap().is_empty());
    assert!(engine.active_schedule().unwrap().is_none());
}

#[test]
fn career_technology_average() {
    let (engine, _) = engine();
    publish(&engine, ExamType::Career, 10);
    let schedule = engine
        .schedules()
        .create_schedule(&window(ExamType::Career), "admin")
        .unwrap();
    engine.select_schedule(&student(), schedule.id).unwrap();

    let mut session = engine.session(student(), ExamType::Career);
    session.begin().unwrap();
    for (i, value) in [5, 5, 5, 5, 3, 5, 5, 5, 5, 5].into_iter().enumerate() {
        session.answer(i, value).unwrap();
    }
    let attempt = session.submit().unwrap();
    assert_eq!(attempt.score, 48.0);
    assert_eq!(analyze(&attempt).average("technology"), Some(5.0));
}

#[test]
fn schedule_status_follows_the_clock() {
    let (engine, clock) = engine();
    let schedule = engine
        .schedules()
        .create_schedule(&window(ExamType::Career), "admin")
        .unwrap();
    assert_eq!(schedule.status(clock.now()), ScheduleStatus::Active);
    assert_eq!(engine.schedules().active_schedules(clock.now()).unwrap().len(), 1);

    clock.advance(chrono::Duration::hours(9));
    assert_eq!(schedule.status(clock.now()), ScheduleStatus::Expired);
    assert!(engine.schedules().active_schedules(clock.now()).unwrap().is_empty());
    let err = engine.select_schedule(&student(), schedule.id).unwrap_err();
    assert!(matches!(
        err,
        AssessError::Eligibility(EligibilityError::ScheduleNotActive {
            status: ScheduleStatus::Expired,
            ..
        })
    ));
}

#[test]
fn recommendations_across_three_tests() {
    let (engine, _) = engine();
    let user = student();
    for exam_type in ExamType::ALL {
        publish(&engine, exam_type, 15);
        let schedule = engine
            .schedules()
            .create_schedule(&window(exam_type), "admin")
            .unwrap();
        engine.select_schedule(&user, schedule.id).unwrap();
        let mut session = engine.session(user.clone(), exam_type);
        session.begin().unwrap();
        for i in 0..15 {
            session.answer(i, 5).unwrap();
        }
        session.submit().unwrap();
    }

    let attempts = engine.ledger().list_attempts_for_user(&user.user_key).unwrap();
    assert_eq!(attempts.len(), 3);
    let titles: Vec<String> = recommend(&attempts).into_iter().map(|r| r.title).collect();
    assert_eq!(
        titles,
        [
            "Software Engineer",
            "Data Scientist",
            "UX/UI Designer",
            "Project Manager",
            "DevOps Engineer"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn countdown_auto_submits_partial_answers() {
    let (engine, _) = engine();
    publish(&engine, ExamType::Skills, 4);
    let schedule = engine
        .schedules()
        .create_schedule(&window(ExamType::Skills), "admin")
        .unwrap();
    engine.select_schedule(&student(), schedule.id).unwrap();

    let mut session = engine
        .session(student(), ExamType::Skills)
        .with_countdown_secs(5);
    session.begin().unwrap();
    session.answer(2, 3).unwrap();
    let session = Arc::new(Mutex::new(session));

    let mut countdown = Countdown::start(&session);
    let attempt = match countdown.finished().await {
        CountdownEnd::AutoSubmitted(attempt) => attempt,
        other => panic!("expected auto-submit, got {other:?}"),
    };

    let session = session.lock().unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert!(session.is_auto_submitted());
    assert_eq!(attempt.answers, vec![0, 0, 3, 0]);
    assert_eq!(attempt.score, 3.0);
    assert!(engine
        .ledger()
        .has_attempted(&student().user_key, schedule.id)
        .unwrap());
}
