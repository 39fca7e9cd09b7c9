//! Central assessment engine.
//!
//! Wires the lifecycle components over one shared store and clock, and owns
//! the exam launch step that hands a schedule to a [`TimedSession`].

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AssessError, EligibilityError, Result};
use crate::feedback::FeedbackBook;
use crate::identity::{StoreDirectory, UserContext};
use crate::ledger::AttemptLedger;
use crate::model::{ExamSchedule, ExamType, ScheduleStatus};
use crate::question_bank::QuestionBank;
use crate::report::ResultsReport;
use crate::schedule::ScheduleRegistry;
use crate::session::{clear_active_schedule, load_active_schedule, TimedSession};
use crate::store::{save_document, ACTIVE_SCHEDULE_KEY};
use crate::traits::{Clock, KeyValueStore, UserDirectory};

/// The assessment engine.
#[derive(Clone)]
pub struct AssessmentEngine {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    questions: QuestionBank,
    schedules: ScheduleRegistry,
    ledger: AttemptLedger,
    feedback: FeedbackBook,
}

impl AssessmentEngine {
    /// Open the engine. The ledger migration runs against `directory`.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        directory: &dyn UserDirectory,
    ) -> Result<Self> {
        let ledger = AttemptLedger::open(Arc::clone(&store), directory)?;
        Ok(Self {
            questions: QuestionBank::new(Arc::clone(&store)),
            schedules: ScheduleRegistry::new(Arc::clone(&store), Arc::clone(&clock)),
            feedback: FeedbackBook::new(Arc::clone(&store), ledger.clone(), Arc::clone(&clock)),
            ledger,
            store,
            clock,
        })
    }

    /// Open the engine with the users registered in the store itself.
    pub fn open_with_store_users(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let directory = StoreDirectory::load(store.as_ref())?;
        Self::open(store, clock, &directory)
    }

    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    pub fn schedules(&self) -> &ScheduleRegistry {
        &self.schedules
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    pub fn feedback(&self) -> &FeedbackBook {
        &self.feedback
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Launch `schedule_id` for `user`.
    ///
    /// The schedule must be active, not yet taken by the user, and have
    /// questions published. On success it becomes the active-schedule
    /// reference that the next session for its exam type picks up.
    pub fn select_schedule(&self, user: &UserContext, schedule_id: Uuid) -> Result<ExamSchedule> {
        let schedule = self
            .schedules
            .get_schedule(schedule_id)?
            .ok_or(AssessError::UnknownSchedule(schedule_id))?;

        let status = schedule.status(self.clock.now());
        if status != ScheduleStatus::Active {
            return Err(EligibilityError::ScheduleNotActive {
                id: schedule.id,
                status,
            }
            .into());
        }
        if self.ledger.has_attempted(&user.user_key, schedule.id)? {
            return Err(EligibilityError::AlreadyAttempted {
                user_key: user.user_key.clone(),
                schedule_id: schedule.id,
            }
            .into());
        }
        if self.questions.question_count(schedule.exam_type)? == 0 {
            return Err(EligibilityError::NoPublishedQuestions(schedule.exam_type).into());
        }

        save_document(self.store.as_ref(), ACTIVE_SCHEDULE_KEY, &schedule)?;
        tracing::info!(user = %user.user_key, schedule = %schedule.id, "schedule launched");
        Ok(schedule)
    }

    pub fn active_schedule(&self) -> Result<Option<ExamSchedule>> {
        load_active_schedule(self.store.as_ref())
    }

    pub fn clear_active_schedule(&self) -> Result<()> {
        clear_active_schedule(self.store.as_ref())
    }

    /// A locked session for `user` on `exam_type`. Call
    /// [`TimedSession::begin`] to run the entry guard.
    pub fn session(&self, user: UserContext, exam_type: ExamType) -> TimedSession {
        TimedSession::new(
            exam_type,
            user,
            Arc::clone(&self.store),
            self.questions.clone(),
            self.ledger.clone(),
            Arc::clone(&self.clock),
        )
    }

    /// Results of one student, or of everyone when `user_key` is `None`.
    pub fn results(&self, user_key: Option<&str>) -> Result<ResultsReport> {
        ResultsReport::build(&self.ledger, &self.feedback, user_key, self.clock.now())
    }
}
