//! Exam schedule windows and their derived status.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::error::{AssessError, Result};
use crate::model::{ExamSchedule, ExamType, ScheduleStatus};
use crate::store::{load_collection, save_collection, SCHEDULES_KEY};
use crate::traits::{Clock, KeyValueStore};

/// Shortest and longest allowed session length.
pub const MIN_DURATION_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 180;

/// Status of `schedule` at `now`.
///
/// The window is closed on both ends: a schedule is `Active` at exactly
/// `start_at` and at exactly `end_at`.
pub fn status_of(schedule: &ExamSchedule, now: DateTime<Utc>) -> ScheduleStatus {
    if now < schedule.start_at {
        ScheduleStatus::Upcoming
    } else if now <= schedule.end_at {
        ScheduleStatus::Active
    } else {
        ScheduleStatus::Expired
    }
}

/// Human-readable distance to the relevant window edge, e.g.
/// `"Starts in 2h 5m"` or `"3 days remaining"`. A window with no time left
/// reads `"Expired"` even at its inclusive end.
pub fn describe_window(schedule: &ExamSchedule, now: DateTime<Utc>) -> String {
    match status_of(schedule, now) {
        ScheduleStatus::Upcoming => {
            format!("Starts in {}", format_span(schedule.start_at - now))
        }
        ScheduleStatus::Active if now < schedule.end_at => {
            format!("{} remaining", format_span(schedule.end_at - now))
        }
        ScheduleStatus::Active | ScheduleStatus::Expired => "Expired".to_string(),
    }
}

fn format_span(span: chrono::Duration) -> String {
    let hours = span.num_hours();
    let minutes = span.num_minutes() % 60;
    if hours > 24 {
        let days = hours / 24;
        format!("{days} day{}", if days > 1 { "s" } else { "" })
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Schedule form fields. Every field except instructions is required.
#[derive(Debug, Clone, Default)]
pub struct ScheduleInput {
    pub exam_type: Option<ExamType>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub duration_minutes: u32,
    pub instructions: Option<String>,
}

/// A validated schedule window.
struct Window {
    exam_type: ExamType,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

impl ScheduleInput {
    fn validate(&self) -> Result<Window> {
        let (Some(exam_type), Some(start_date), Some(start_time), Some(end_date), Some(end_time)) = (
            self.exam_type,
            self.start_date,
            self.start_time,
            self.end_date,
            self.end_time,
        ) else {
            return Err(AssessError::validation(
                "exam type, start date/time and end date/time are required",
            ));
        };

        let start_at = NaiveDateTime::new(start_date, start_time).and_utc();
        let end_at = NaiveDateTime::new(end_date, end_time).and_utc();
        if end_at <= start_at {
            return Err(AssessError::validation(
                "end date/time must be after start date/time",
            ));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(AssessError::validation(format!(
                "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            )));
        }
        Ok(Window {
            exam_type,
            start_at,
            end_at,
        })
    }

    fn instructions(&self) -> Option<String> {
        self.instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// CRUD over the `examSchedules` document.
#[derive(Clone)]
pub struct ScheduleRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ScheduleRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn list_schedules(&self) -> Result<Vec<ExamSchedule>> {
        load_collection(self.store.as_ref(), SCHEDULES_KEY)
    }

    pub fn get_schedule(&self, id: Uuid) -> Result<Option<ExamSchedule>> {
        Ok(self.list_schedules()?.into_iter().find(|s| s.id == id))
    }

    /// Schedules whose window contains `now`.
    pub fn active_schedules(&self, now: DateTime<Utc>) -> Result<Vec<ExamSchedule>> {
        Ok(self
            .list_schedules()?
            .into_iter()
            .filter(|s| status_of(s, now) == ScheduleStatus::Active)
            .collect())
    }

    pub fn status_of(&self, schedule: &ExamSchedule, now: DateTime<Utc>) -> ScheduleStatus {
        status_of(schedule, now)
    }

    pub fn create_schedule(&self, input: &ScheduleInput, created_by: &str) -> Result<ExamSchedule> {
        let window = input.validate()?;
        let schedule = ExamSchedule {
            id: Uuid::new_v4(),
            exam_type: window.exam_type,
            start_at: window.start_at,
            end_at: window.end_at,
            duration_minutes: input.duration_minutes,
            instructions: input.instructions(),
            created_by: created_by.to_string(),
            created_at: self.clock.now(),
        };

        let mut schedules = self.list_schedules()?;
        schedules.push(schedule.clone());
        save_collection(self.store.as_ref(), SCHEDULES_KEY, &schedules)?;
        tracing::info!(id = %schedule.id, exam_type = %schedule.exam_type, "schedule created");
        Ok(schedule)
    }

    /// Rewrite the window of an existing schedule. Its id, creator and
    /// creation time are kept.
    ///
    /// Callers must refuse to edit schedules that are already `Expired`.
    pub fn update_schedule(&self, id: Uuid, input: &ScheduleInput) -> Result<ExamSchedule> {
        let window = input.validate()?;
        let mut schedules = self.list_schedules()?;
        let existing = schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AssessError::UnknownSchedule(id))?;

        existing.exam_type = window.exam_type;
        existing.start_at = window.start_at;
        existing.end_at = window.end_at;
        existing.duration_minutes = input.duration_minutes;
        existing.instructions = input.instructions();
        let updated = existing.clone();

        save_collection(self.store.as_ref(), SCHEDULES_KEY, &schedules)?;
        tracing::info!(%id, "schedule updated");
        Ok(updated)
    }

    /// Remove a schedule. Unknown ids succeed without changes.
    pub fn delete_schedule(&self, id: Uuid) -> Result<()> {
        let mut schedules = self.list_schedules()?;
        let before = schedules.len();
        schedules.retain(|s| s.id != id);
        if schedules.len() != before {
            save_collection(self.store.as_ref(), SCHEDULES_KEY, &schedules)?;
            tracing::info!(%id, "schedule deleted");
        }
        Ok(())
    }
}
