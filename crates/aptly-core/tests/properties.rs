//! Property-based tests for schedule windows, the ledger and analysis.

use std::sync::Arc;

use aptly_core::analysis::analyze_answers;
use aptly_core::error::AssessError;
use aptly_core::ledger::AttemptLedger;
use aptly_core::model::{Attempt, ExamSchedule, ExamType, ScheduleStatus};
use aptly_core::schedule::{status_of, ScheduleInput, ScheduleRegistry};
use aptly_core::store::MemoryStore;
use aptly_core::traits::{IdentityDirectory, KeyValueStore, SystemClock};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use proptest::prelude::*;
use uuid::Uuid;

fn base() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn schedule(start_offset: i64, length: i64) -> ExamSchedule {
    let start_at = base() + Duration::minutes(start_offset);
    ExamSchedule {
        id: Uuid::new_v4(),
        exam_type: ExamType::Career,
        start_at,
        end_at: start_at + Duration::minutes(length),
        duration_minutes: 30,
        instructions: None,
        created_by: "admin".into(),
        created_at: base(),
    }
}

fn exam_type() -> impl Strategy<Value = ExamType> {
    prop_oneof![
        Just(ExamType::Career),
        Just(ExamType::Personality),
        Just(ExamType::Skills),
    ]
}

fn rank(status: ScheduleStatus) -> u8 {
    match status {
        ScheduleStatus::Upcoming => 0,
        ScheduleStatus::Active => 1,
        ScheduleStatus::Expired => 2,
    }
}

proptest! {
    #[test]
    fn status_partitions_time(start in -10_000i64..10_000, length in 1i64..5_000, probe in -20_000i64..20_000) {
        let s = schedule(start, length);
        let now = base() + Duration::minutes(probe);
        let expected = if probe < start {
            ScheduleStatus::Upcoming
        } else if probe <= start + length {
            ScheduleStatus::Active
        } else {
            ScheduleStatus::Expired
        };
        prop_assert_eq!(status_of(&s, now), expected);
        // Pure in its inputs.
        prop_assert_eq!(status_of(&s, now), s.status(now));
    }

    #[test]
    fn status_never_moves_backwards(start in -1_000i64..1_000, length in 1i64..500, a in -3_000i64..3_000, step in 0i64..3_000) {
        let s = schedule(start, length);
        let earlier = status_of(&s, base() + Duration::minutes(a));
        let later = status_of(&s, base() + Duration::minutes(a + step));
        prop_assert!(rank(earlier) <= rank(later));
    }

    #[test]
    fn create_rejects_end_not_after_start(start_min in 0i64..100_000, back in 0i64..100_000, kind in exam_type()) {
        let registry = ScheduleRegistry::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        let start: NaiveDateTime = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(start_min);
        let end = start - Duration::minutes(back);
        let input = ScheduleInput {
            exam_type: Some(kind),
            start_date: Some(start.date()),
            start_time: Some(start.time()),
            end_date: Some(end.date()),
            end_time: Some(end.time()),
            duration_minutes: 30,
            instructions: None,
        };
        let result = registry.create_schedule(&input, "admin");
        prop_assert!(matches!(result, Err(AssessError::Validation(_))));
        prop_assert!(registry.list_schedules().unwrap().is_empty());
    }

    #[test]
    fn second_attempt_is_always_rejected(user in "[a-z]{1,8}", answers in prop::collection::vec(1u32..=5, 1..20), kind in exam_type()) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let ledger = AttemptLedger::open(store, &IdentityDirectory).unwrap();
        let schedule_id = Uuid::new_v4();
        let attempt = Attempt {
            id: Uuid::new_v4(),
            user_key: user.clone(),
            user_id: None,
            user_email: None,
            test_type: kind,
            score: aptly_core::model::weighted_score(kind, &answers),
            answers,
            schedule_id,
            completed_at: base(),
        };
        ledger.record_attempt(attempt.clone()).unwrap();
        prop_assert!(ledger.has_attempted(&user, schedule_id).unwrap());

        let again = Attempt { id: Uuid::new_v4(), ..attempt };
        let is_duplicate = matches!(
            ledger.record_attempt(again),
            Err(AssessError::DuplicateAttempt { .. })
        );
        prop_assert!(is_duplicate);
        prop_assert_eq!(ledger.list_all_attempts().unwrap().len(), 1);
    }

    #[test]
    fn analysis_is_idempotent_and_bounded(answers in prop::collection::vec(0u32..=5, 0..40), kind in exam_type()) {
        let first = analyze_answers(kind, &answers);
        let second = analyze_answers(kind, &answers);
        prop_assert_eq!(&first, &second);
        for c in &first.categories {
            prop_assert!(c.samples > 0);
            prop_assert!((0.0..=5.0).contains(&c.avg_score));
            prop_assert!((0.0..=100.0).contains(&c.percentage));
        }
    }
}
