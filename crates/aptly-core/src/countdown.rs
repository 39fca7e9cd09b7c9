//! Background countdown driving a [`TimedSession`].
//!
//! The countdown task holds only a weak reference to the session. Once the
//! session is dropped, or leaves `InProgress`, the task ends without touching
//! it. Dropping the [`Countdown`] handle aborts the task.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::AssessError;
use crate::model::Attempt;
use crate::session::{SessionState, TimedSession};

/// A session shared between its owner and the countdown task.
pub type SharedSession = Arc<Mutex<TimedSession>>;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Why the countdown task ended.
#[derive(Debug)]
pub enum CountdownEnd {
    /// Time ran out and the session was submitted.
    AutoSubmitted(Attempt),
    /// The session finished, was cancelled or dropped, or the countdown was
    /// stopped.
    Stopped,
    /// The forced submission failed.
    Failed(AssessError),
}

pub struct Countdown {
    handle: Option<JoinHandle<CountdownEnd>>,
}

impl Countdown {
    /// Tick `session` once per second. Must be called inside a tokio runtime.
    pub fn start(session: &SharedSession) -> Self {
        Self::with_period(session, DEFAULT_TICK)
    }

    pub fn with_period(session: &SharedSession, period: Duration) -> Self {
        let weak = Arc::downgrade(session);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Some(end) = tick_once(&weak) {
                    return end;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Stop ticking. The session is left as it is.
    pub fn stop(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    /// Wait for the task to end.
    pub async fn finished(&mut self) -> CountdownEnd {
        let Some(handle) = self.handle.as_mut() else {
            return CountdownEnd::Stopped;
        };
        let end = handle.await.unwrap_or(CountdownEnd::Stopped);
        self.handle = None;
        end
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn tick_once(weak: &Weak<Mutex<TimedSession>>) -> Option<CountdownEnd> {
    let Some(session) = weak.upgrade() else {
        return Some(CountdownEnd::Stopped);
    };
    let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
    if session.state() != SessionState::InProgress {
        return Some(CountdownEnd::Stopped);
    }
    match session.tick() {
        Ok(Some(attempt)) => Some(CountdownEnd::AutoSubmitted(attempt)),
        Ok(None) => None,
        Err(err) => Some(CountdownEnd::Failed(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserContext;
    use crate::ledger::AttemptLedger;
    use crate::model::{ExamSchedule, ExamType};
    use crate::question_bank::{OptionDraft, QuestionBank, QuestionDraft};
    use crate::store::{save_document, MemoryStore, ACTIVE_SCHEDULE_KEY};
    use crate::traits::{IdentityDirectory, KeyValueStore, SystemClock};
    use chrono::Utc;
    use uuid::Uuid;

    fn running_session(secs: u64) -> (SharedSession, AttemptLedger) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let bank = QuestionBank::new(Arc::clone(&store));
        for text in ["One", "Two"] {
            let draft = QuestionDraft {
                text: text.into(),
                options: vec![OptionDraft::new("Yes", ""), OptionDraft::new("No", "")],
            };
            bank.upsert_question(ExamType::Skills, None, draft).unwrap();
        }
        let now = Utc::now();
        let schedule = ExamSchedule {
            id: Uuid::new_v4(),
            exam_type: ExamType::Skills,
            start_at: now - chrono::Duration::hours(1),
            end_at: now + chrono::Duration::hours(1),
            duration_minutes: 5,
            instructions: None,
            created_by: "admin".into(),
            created_at: now,
        };
        save_document(store.as_ref(), ACTIVE_SCHEDULE_KEY, &schedule).unwrap();
        let ledger = AttemptLedger::open(Arc::clone(&store), &IdentityDirectory).unwrap();
        let user = UserContext {
            user_key: "ana".into(),
            email: None,
        };
        let mut session = TimedSession::new(
            ExamType::Skills,
            user,
            store,
            bank,
            ledger.clone(),
            Arc::new(SystemClock),
        )
        .with_countdown_secs(secs);
        session.begin().unwrap();
        (Arc::new(Mutex::new(session)), ledger)
    }

    #[tokio::test(start_paused = true)]
    async fn auto_submits_when_time_runs_out() {
        let (session, ledger) = running_session(5);
        session.lock().unwrap().answer(0, 4).unwrap();

        let mut countdown = Countdown::start(&session);
        let started = tokio::time::Instant::now();
        let end = countdown.finished().await;

        let CountdownEnd::AutoSubmitted(attempt) = end else {
            panic!("expected auto-submit, got {end:?}");
        };
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(attempt.answers, vec![4, 0]);
        assert!(session.lock().unwrap().is_auto_submitted());
        assert_eq!(ledger.list_all_attempts().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_the_countdown() {
        let (session, ledger) = running_session(60);
        let mut countdown = Countdown::start(&session);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        {
            let mut s = session.lock().unwrap();
            assert_eq!(s.remaining_secs(), 58);
            s.answer(0, 1).unwrap();
            s.answer(1, 2).unwrap();
            s.submit().unwrap();
        }
        assert!(matches!(countdown.finished().await, CountdownEnd::Stopped));
        assert_eq!(ledger.list_all_attempts().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_session_is_never_submitted() {
        let (session, ledger) = running_session(3);
        let mut countdown = Countdown::start(&session);
        drop(session);

        assert!(matches!(countdown.finished().await, CountdownEnd::Stopped));
        assert!(ledger.list_all_attempts().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_leaves_session_in_progress() {
        let (session, ledger) = running_session(3);
        let mut countdown = Countdown::start(&session);
        countdown.stop();
        assert!(matches!(countdown.finished().await, CountdownEnd::Stopped));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(session.lock().unwrap().state(), SessionState::InProgress);
        assert!(ledger.list_all_attempts().unwrap().is_empty());
    }
}
