//! The timed exam session state machine.
//!
//! A session moves `Locked → Loading → InProgress → Submitting → Completed`.
//! Eligibility failures while loading and cancellation end in `Aborted`.
//! The only autonomous transition is the countdown reaching zero, which
//! forces a submission regardless of how many answers are set.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::analysis::MAX_ANSWER;
use crate::error::{AssessError, EligibilityError, Result};
use crate::identity::UserContext;
use crate::ledger::AttemptLedger;
use crate::model::{weighted_score, Attempt, ExamSchedule, ExamType, Question, ScheduleStatus};
use crate::question_bank::QuestionBank;
use crate::store::{load_document, ACTIVE_SCHEDULE_KEY};
use crate::traits::{Clock, KeyValueStore};

/// The schedule a student launched, if any.
pub fn load_active_schedule(store: &dyn KeyValueStore) -> Result<Option<ExamSchedule>> {
    load_document(store, ACTIVE_SCHEDULE_KEY)
}

/// Forget the launched schedule.
pub fn clear_active_schedule(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(ACTIVE_SCHEDULE_KEY)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Locked,
    Loading,
    InProgress,
    Submitting,
    Completed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Locked => "locked",
            SessionState::Loading => "loading",
            SessionState::InProgress => "in progress",
            SessionState::Submitting => "submitting",
            SessionState::Completed => "completed",
            SessionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// One student's run through one exam.
pub struct TimedSession {
    exam_type: ExamType,
    user: UserContext,
    store: Arc<dyn KeyValueStore>,
    bank: QuestionBank,
    ledger: AttemptLedger,
    clock: Arc<dyn Clock>,
    countdown_secs: Option<u64>,

    state: SessionState,
    schedule: Option<ExamSchedule>,
    questions: Vec<Question>,
    answers: Vec<Option<u32>>,
    remaining_secs: u64,
    auto_submitted: bool,
    attempt: Option<Attempt>,
    abort_reason: Option<String>,
}

impl TimedSession {
    pub fn new(
        exam_type: ExamType,
        user: UserContext,
        store: Arc<dyn KeyValueStore>,
        bank: QuestionBank,
        ledger: AttemptLedger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            exam_type,
            user,
            store,
            bank,
            ledger,
            clock,
            countdown_secs: None,
            state: SessionState::Locked,
            schedule: None,
            questions: Vec::new(),
            answers: Vec::new(),
            remaining_secs: 0,
            auto_submitted: false,
            attempt: None,
            abort_reason: None,
        }
    }

    /// Seed the countdown with `secs` instead of the schedule's duration.
    pub fn with_countdown_secs(mut self, secs: u64) -> Self {
        self.countdown_secs = Some(secs);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn exam_type(&self) -> ExamType {
        self.exam_type
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    pub fn schedule(&self) -> Option<&ExamSchedule> {
        self.schedule.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<u32>] {
        &self.answers
    }

    pub fn unanswered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_none()).count()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_auto_submitted(&self) -> bool {
        self.auto_submitted
    }

    /// The recorded attempt once the session is `Completed`.
    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Run the entry guard and load the questions.
    ///
    /// On success the session is `InProgress` with every answer unset. Any
    /// eligibility failure leaves it `Aborted` and is returned.
    pub fn begin(&mut self) -> Result<()> {
        if self.state != SessionState::Locked {
            return Err(AssessError::validation(format!(
                "session is already {}",
                self.state
            )));
        }

        let Some(schedule) = load_active_schedule(self.store.as_ref())? else {
            return self.abort(EligibilityError::NoActiveSchedule, false);
        };
        if schedule.exam_type != self.exam_type {
            return self.abort(
                EligibilityError::WrongExamType {
                    expected: self.exam_type,
                    found: schedule.exam_type,
                },
                false,
            );
        }
        let status = schedule.status(self.clock.now());
        if status != ScheduleStatus::Active {
            return self.abort(
                EligibilityError::ScheduleNotActive {
                    id: schedule.id,
                    status,
                },
                false,
            );
        }
        if self.ledger.has_attempted(&self.user.user_key, schedule.id)? {
            return self.abort(
                EligibilityError::AlreadyAttempted {
                    user_key: self.user.user_key.clone(),
                    schedule_id: schedule.id,
                },
                true,
            );
        }

        self.state = SessionState::Loading;
        let questions = self.bank.list_questions(self.exam_type)?;
        if questions.is_empty() {
            return self.abort(EligibilityError::NoPublishedQuestions(self.exam_type), true);
        }

        self.answers = vec![None; questions.len()];
        self.questions = questions;
        self.remaining_secs = self.countdown_secs.unwrap_or_else(|| schedule.duration_secs());
        tracing::info!(
            user = %self.user.user_key,
            schedule = %schedule.id,
            questions = self.questions.len(),
            secs = self.remaining_secs,
            "session started"
        );
        self.schedule = Some(schedule);
        self.state = SessionState::InProgress;
        Ok(())
    }

    /// Set the answer of question `index` to `value` (1..=5).
    pub fn answer(&mut self, index: usize, value: u32) -> Result<()> {
        self.require_in_progress()?;
        if !(1..=MAX_ANSWER).contains(&value) {
            return Err(AssessError::validation(format!(
                "answer must be between 1 and {MAX_ANSWER}, got {value}"
            )));
        }
        let total = self.answers.len();
        let slot = self.answers.get_mut(index).ok_or_else(|| {
            AssessError::validation(format!("no question {index} ({total} in this exam)"))
        })?;
        *slot = Some(value);
        Ok(())
    }

    /// Advance the countdown by one second. Returns the attempt when this
    /// tick forced the submission. Ignored unless `InProgress`.
    pub fn tick(&mut self) -> Result<Option<Attempt>> {
        if self.state != SessionState::InProgress {
            return Ok(None);
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        tracing::debug!(remaining = self.remaining_secs, "tick");
        if self.remaining_secs > 0 {
            return Ok(None);
        }
        self.auto_submitted = true;
        tracing::info!(user = %self.user.user_key, "time is up, submitting");
        self.finish().map(Some)
    }

    /// Submit by hand. Every question must be answered.
    pub fn submit(&mut self) -> Result<Attempt> {
        self.require_in_progress()?;
        let unanswered = self.unanswered();
        if unanswered > 0 && !self.auto_submitted {
            return Err(AssessError::validation(format!(
                "{unanswered} of {} questions are unanswered",
                self.answers.len()
            )));
        }
        self.finish()
    }

    /// Discard all progress. Terminal sessions are left as they are.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.answers.clear();
        self.questions.clear();
        self.remaining_secs = 0;
        self.abort_reason = Some("cancelled".to_string());
        self.state = SessionState::Aborted;
        tracing::info!(user = %self.user.user_key, "session cancelled");
    }

    fn require_in_progress(&self) -> Result<()> {
        if self.state == SessionState::InProgress {
            Ok(())
        } else {
            Err(AssessError::validation(format!(
                "session is {}, not in progress",
                self.state
            )))
        }
    }

    fn abort(&mut self, reason: EligibilityError, clear_reference: bool) -> Result<()> {
        tracing::warn!(user = %self.user.user_key, %reason, "session aborted");
        self.abort_reason = Some(reason.to_string());
        self.state = SessionState::Aborted;
        if clear_reference {
            clear_active_schedule(self.store.as_ref())?;
        }
        Err(reason.into())
    }

    fn finish(&mut self) -> Result<Attempt> {
        self.state = SessionState::Submitting;
        let Some(schedule_id) = self.schedule.as_ref().map(|s| s.id) else {
            self.state = SessionState::Aborted;
            return Err(EligibilityError::NoActiveSchedule.into());
        };

        let answers: Vec<u32> = self.answers.iter().map(|a| a.unwrap_or(0)).collect();
        let attempt = Attempt {
            id: Uuid::new_v4(),
            user_key: self.user.user_key.clone(),
            user_id: None,
            user_email: self.user.email.clone(),
            test_type: self.exam_type,
            score: weighted_score(self.exam_type, &answers),
            answers,
            schedule_id,
            completed_at: self.clock.now(),
        };

        match self.ledger.record_attempt(attempt) {
            Ok(recorded) => {
                self.state = SessionState::Completed;
                self.attempt = Some(recorded.clone());
                if let Err(err) = clear_active_schedule(self.store.as_ref()) {
                    tracing::warn!(
                        id = %recorded.id,
                        %err,
                        "attempt recorded but schedule reference kept"
                    );
                }
                Ok(recorded)
            }
            Err(err) => {
                self.abort_reason = Some(err.to_string());
                self.state = SessionState::Aborted;
                if matches!(err, AssessError::DuplicateAttempt { .. }) {
                    clear_active_schedule(self.store.as_ref())?;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::question_bank::{OptionDraft, QuestionDraft};
    use crate::store::{save_document, MemoryStore};
    use crate::traits::{IdentityDirectory, ManualClock};
    use chrono::{DateTime, Duration, Utc};

    struct Fixture {
        store: Arc<dyn KeyValueStore>,
        bank: QuestionBank,
        ledger: AttemptLedger,
        clock: Arc<ManualClock>,
        schedule: ExamSchedule,
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn fixture(exam_type: ExamType, questions: usize) -> Fixture {
        fixture_in(Arc::new(MemoryStore::new()), exam_type, questions)
    }

    fn fixture_in(store: Arc<dyn KeyValueStore>, exam_type: ExamType, questions: usize) -> Fixture {
        let bank = QuestionBank::new(Arc::clone(&store));
        for i in 0..questions {
            let draft = QuestionDraft {
                text: format!("Question {i}"),
                options: vec![OptionDraft::new("Agree", "a:1"), OptionDraft::new("Disagree", "")],
            };
            bank.upsert_question(exam_type, None, draft).unwrap();
        }
        let schedule = ExamSchedule {
            id: Uuid::new_v4(),
            exam_type,
            start_at: now() - Duration::hours(1),
            end_at: now() + Duration::hours(1),
            duration_minutes: 10,
            instructions: None,
            created_by: "admin".into(),
            created_at: now() - Duration::days(1),
        };
        save_document(store.as_ref(), ACTIVE_SCHEDULE_KEY, &schedule).unwrap();
        Fixture {
            ledger: AttemptLedger::open(Arc::clone(&store), &IdentityDirectory).unwrap(),
            bank,
            clock: Arc::new(ManualClock::new(now())),
            store,
            schedule,
        }
    }

    fn user() -> UserContext {
        UserContext {
            user_key: "ana01".into(),
            email: Some("ana@example.com".into()),
        }
    }

    fn session(f: &Fixture, exam_type: ExamType) -> TimedSession {
        TimedSession::new(
            exam_type,
            user(),
            Arc::clone(&f.store),
            f.bank.clone(),
            f.ledger.clone(),
            f.clock.clone(),
        )
    }

    #[test]
    fn begin_seeds_answers_and_countdown() {
        let f = fixture(ExamType::Career, 3);
        let mut s = session(&f, ExamType::Career);
        assert_eq!(s.state(), SessionState::Locked);
        s.begin().unwrap();
        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.answers(), &[None, None, None]);
        assert_eq!(s.remaining_secs(), 600);
        assert_eq!(s.schedule().map(|x| x.id), Some(f.schedule.id));
    }

    #[test]
    fn manual_submit_requires_every_answer() {
        let f = fixture(ExamType::Personality, 2);
        let mut s = session(&f, ExamType::Personality);
        s.begin().unwrap();
        s.answer(0, 5).unwrap();
        let err = s.submit().unwrap_err();
        assert!(matches!(err, AssessError::Validation(_)));
        assert_eq!(s.state(), SessionState::InProgress);

        s.answer(1, 3).unwrap();
        let attempt = s.submit().unwrap();
        assert_eq!(s.state(), SessionState::Completed);
        assert_eq!(attempt.answers, vec![5, 3]);
        assert_eq!(attempt.score, 16.0);
        assert_eq!(attempt.user_email.as_deref(), Some("ana@example.com"));
        assert_eq!(attempt.completed_at, now());
        assert!(load_active_schedule(f.store.as_ref()).unwrap().is_none());
        assert!(f.ledger.has_attempted("ana01", f.schedule.id).unwrap());
    }

    #[test]
    fn invalid_answers_change_nothing() {
        let f = fixture(ExamType::Skills, 2);
        let mut s = session(&f, ExamType::Skills);
        s.begin().unwrap();
        assert!(s.answer(0, 0).is_err());
        assert!(s.answer(0, 6).is_err());
        assert!(s.answer(2, 3).is_err());
        assert_eq!(s.answers(), &[None, None]);
    }

    #[test]
    fn missing_reference_aborts() {
        let f = fixture(ExamType::Career, 1);
        clear_active_schedule(f.store.as_ref()).unwrap();
        let mut s = session(&f, ExamType::Career);
        let err = s.begin().unwrap_err();
        assert!(matches!(
            err,
            AssessError::Eligibility(EligibilityError::NoActiveSchedule)
        ));
        assert_eq!(s.state(), SessionState::Aborted);
    }

    #[test]
    fn wrong_exam_type_aborts_and_keeps_reference() {
        let f = fixture(ExamType::Career, 1);
        let mut s = session(&f, ExamType::Skills);
        let err = s.begin().unwrap_err();
        assert!(matches!(
            err,
            AssessError::Eligibility(EligibilityError::WrongExamType { .. })
        ));
        assert!(load_active_schedule(f.store.as_ref()).unwrap().is_some());
    }

    #[test]
    fn expired_schedule_aborts() {
        let f = fixture(ExamType::Career, 1);
        f.clock.advance(Duration::hours(2));
        let mut s = session(&f, ExamType::Career);
        let err = s.begin().unwrap_err();
        assert!(matches!(
            err,
            AssessError::Eligibility(EligibilityError::ScheduleNotActive {
                status: ScheduleStatus::Expired,
                ..
            })
        ));
    }

    #[test]
    fn previous_attempt_aborts_and_clears_reference() {
        let f = fixture(ExamType::Career, 1);
        let mut first = session(&f, ExamType::Career);
        first.begin().unwrap();
        first.answer(0, 4).unwrap();
        first.submit().unwrap();

        save_document(f.store.as_ref(), ACTIVE_SCHEDULE_KEY, &f.schedule).unwrap();
        let mut second = session(&f, ExamType::Career);
        let err = second.begin().unwrap_err();
        assert!(matches!(
            err,
            AssessError::Eligibility(EligibilityError::AlreadyAttempted { .. })
        ));
        assert!(load_active_schedule(f.store.as_ref()).unwrap().is_none());
    }

    #[test]
    fn empty_bank_aborts_without_attempt() {
        let f = fixture(ExamType::Skills, 0);
        let mut s = session(&f, ExamType::Skills);
        let err = s.begin().unwrap_err();
        assert!(matches!(
            err,
            AssessError::Eligibility(EligibilityError::NoPublishedQuestions(ExamType::Skills))
        ));
        assert_eq!(s.state(), SessionState::Aborted);
        assert!(f.ledger.list_all_attempts().unwrap().is_empty());
        assert!(load_active_schedule(f.store.as_ref()).unwrap().is_none());
    }

    #[test]
    fn countdown_zero_auto_submits_partial_answers() {
        let f = fixture(ExamType::Career, 3);
        let mut s = session(&f, ExamType::Career).with_countdown_secs(5);
        s.begin().unwrap();
        s.answer(1, 4).unwrap();
        for _ in 0..4 {
            assert!(s.tick().unwrap().is_none());
        }
        let attempt = s.tick().unwrap().expect("fifth tick submits");
        assert!(s.is_auto_submitted());
        assert_eq!(s.state(), SessionState::Completed);
        assert_eq!(attempt.answers, vec![0, 4, 0]);
        assert_eq!(attempt.score, 4.0);
        assert!(s.tick().unwrap().is_none());
    }

    #[test]
    fn duplicate_at_write_time_aborts() {
        let f = fixture(ExamType::Career, 1);
        let mut a = session(&f, ExamType::Career);
        let mut b = session(&f, ExamType::Career);
        a.begin().unwrap();
        b.begin().unwrap();
        a.answer(0, 2).unwrap();
        b.answer(0, 3).unwrap();
        a.submit().unwrap();

        let err = b.submit().unwrap_err();
        assert!(matches!(err, AssessError::DuplicateAttempt { .. }));
        assert_eq!(b.state(), SessionState::Aborted);
        assert_eq!(f.ledger.list_all_attempts().unwrap().len(), 1);
    }

    #[test]
    fn cancel_discards_progress_and_ignores_ticks() {
        let f = fixture(ExamType::Career, 2);
        let mut s = session(&f, ExamType::Career).with_countdown_secs(1);
        s.begin().unwrap();
        s.answer(0, 5).unwrap();
        s.cancel();
        assert_eq!(s.state(), SessionState::Aborted);
        assert!(s.answers().is_empty());
        assert!(s.tick().unwrap().is_none());
        assert!(f.ledger.list_all_attempts().unwrap().is_empty());
        assert!(s.begin().is_err());
    }

    #[test]
    fn exhausted_store_aborts_without_recording() {
        let sizing = Arc::new(MemoryStore::new());
        fixture_in(sizing.clone(), ExamType::Career, 2);

        // Room for the exam setup but not for the attempt document.
        let store = Arc::new(MemoryStore::with_quota(sizing.used_bytes() + 32));
        let f = fixture_in(store, ExamType::Career, 2);
        let mut s = session(&f, ExamType::Career);
        s.begin().unwrap();
        s.answer(0, 1).unwrap();
        s.answer(1, 2).unwrap();

        let err = s.submit().unwrap_err();
        assert!(matches!(err, AssessError::Store(StoreError::Exhausted { .. })));
        assert!(err.is_fatal());
        assert_eq!(s.state(), SessionState::Aborted);
        assert!(s.attempt().is_none());
        assert!(!f.ledger.has_attempted("ana01", f.schedule.id).unwrap());
    }

    /// Accepts writes but cannot delete keys.
    struct NoRemove(MemoryStore);

    impl KeyValueStore for NoRemove {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
            self.0.set(key, value)
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("read-only volume".into()))
        }
    }

    #[test]
    fn recorded_attempt_survives_failed_reference_clear() {
        let f = fixture_in(Arc::new(NoRemove(MemoryStore::new())), ExamType::Career, 1);
        let mut s = session(&f, ExamType::Career);
        s.begin().unwrap();
        s.answer(0, 4).unwrap();

        let attempt = s.submit().unwrap();
        assert_eq!(s.state(), SessionState::Completed);
        assert_eq!(attempt.answers, vec![4]);
        assert!(f.ledger.has_attempted("ana01", f.schedule.id).unwrap());
        assert!(load_active_schedule(f.store.as_ref()).unwrap().is_some());
    }
}
