//! Error taxonomy for the assessment lifecycle.
//!
//! Every fallible core operation returns [`AssessError`]. Callers use
//! [`AssessError::is_fatal`] to tell user-correctable failures apart from the
//! ones that must be propagated to the top level.

use thiserror::Error;
use uuid::Uuid;

use crate::model::{ExamType, ScheduleStatus};

/// Errors raised by a key-value store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend ran out of space while writing `key`.
    #[error("store exhausted while writing '{key}': {reason}")]
    Exhausted { key: String, reason: String },

    /// The backend could not be read or written at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why a timed session could not be started or continued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EligibilityError {
    /// No schedule was selected before opening the exam.
    #[error("this exam can only be opened through an active schedule")]
    NoActiveSchedule,

    /// The selected schedule is outside its window.
    #[error("schedule {id} is {status}, not active")]
    ScheduleNotActive { id: Uuid, status: ScheduleStatus },

    /// The selected schedule is for a different assessment.
    #[error("schedule is for {found}, not {expected}")]
    WrongExamType { expected: ExamType, found: ExamType },

    /// The user already has an attempt for this schedule.
    #[error("{user_key} has already completed schedule {schedule_id}")]
    AlreadyAttempted { user_key: String, schedule_id: Uuid },

    /// The administrator has not published any questions for this exam type.
    #[error("no questions have been published for {0}")]
    NoPublishedQuestions(ExamType),
}

/// Errors that can occur anywhere in the assessment lifecycle.
#[derive(Debug, Error)]
pub enum AssessError {
    /// Malformed input. Nothing was changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The session may not start or continue.
    #[error("not eligible: {0}")]
    Eligibility(#[from] EligibilityError),

    /// A second attempt was written for the same user and schedule.
    #[error("duplicate attempt for {user_key} on schedule {schedule_id}")]
    DuplicateAttempt { user_key: String, schedule_id: Uuid },

    /// No schedule with this id exists.
    #[error("unknown schedule: {0}")]
    UnknownSchedule(Uuid),

    /// No attempt with this id exists.
    #[error("unknown attempt: {0}")]
    UnknownAttempt(Uuid),

    /// A stored document could not be decoded.
    #[error("stored document '{key}' is corrupt: {source}")]
    CorruptDocument {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key-value store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AssessError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        AssessError::Validation(message.into())
    }

    /// Returns `true` if this error cannot be fixed by the user and must be
    /// propagated to the top level.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AssessError::Store(_) | AssessError::CorruptDocument { .. }
        )
    }
}

pub type Result<T, E = AssessError> = std::result::Result<T, E>;
