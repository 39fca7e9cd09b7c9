//! Core data model types for aptly.
//!
//! These are the persisted records (questions, schedules, attempts, feedback)
//! and the small value types the lifecycle components pass around. Field
//! names serialize in camelCase, one document per collection.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three assessments an institution can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "Career Assessment")]
    Career,
    #[serde(rename = "Personality Test")]
    Personality,
    #[serde(rename = "Skills Evaluation")]
    Skills,
}

impl ExamType {
    pub const ALL: [ExamType; 3] = [ExamType::Career, ExamType::Personality, ExamType::Skills];

    /// Store key of the question document for this exam type.
    pub fn questions_key(self) -> &'static str {
        match self {
            ExamType::Career => "careerQuestions",
            ExamType::Personality => "personalityQuestions",
            ExamType::Skills => "skillQuestions",
        }
    }

    /// Multiplier applied to every answer when computing the attempt score.
    pub fn answer_weight(self) -> f64 {
        match self {
            ExamType::Personality => 2.0,
            ExamType::Career | ExamType::Skills => 1.0,
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamType::Career => write!(f, "Career Assessment"),
            ExamType::Personality => write!(f, "Personality Test"),
            ExamType::Skills => write!(f, "Skills Evaluation"),
        }
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "career" | "career assessment" => Ok(ExamType::Career),
            "personality" | "personality test" => Ok(ExamType::Personality),
            "skill" | "skills" | "skills evaluation" => Ok(ExamType::Skills),
            other => Err(format!("unknown exam type: {other}")),
        }
    }
}

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    /// Text shown to the student.
    pub text: String,
    /// Category contributions of this option, e.g. `{"tech": 2}`.
    #[serde(default)]
    pub score_map: BTreeMap<String, f64>,
}

/// A published question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<AnswerOption>,
}

/// Derived availability of a schedule at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Upcoming,
    Active,
    Expired,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::Upcoming => write!(f, "Upcoming"),
            ScheduleStatus::Active => write!(f, "Active"),
            ScheduleStatus::Expired => write!(f, "Expired"),
        }
    }
}

/// A time window during which one exam type may be attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSchedule {
    pub id: Uuid,
    pub exam_type: ExamType,
    pub start_at: DateTime<Utc>,
    /// Always strictly after `start_at`.
    pub end_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub instructions: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ExamSchedule {
    /// Status of this schedule at `now`. See [`crate::schedule::status_of`].
    pub fn status(&self, now: DateTime<Utc>) -> ScheduleStatus {
        crate::schedule::status_of(self, now)
    }

    /// Countdown length of a session opened against this schedule.
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }
}

/// An immutable record of one completed exam session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Canonical user identifier. Older records stored it as `user`.
    #[serde(default, alias = "user")]
    pub user_key: String,
    /// Pre-migration account identifier, kept only for reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Email the attempt was taken under, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub test_type: ExamType,
    pub score: f64,
    /// Raw answer values (1..=5), 0 where a slot was left unset. Older
    /// records stored them as strings, with `""` for an unset slot.
    #[serde(deserialize_with = "legacy::answers")]
    pub answers: Vec<u32>,
    /// Nil for older records taken without a schedule.
    #[serde(default, deserialize_with = "legacy::schedule_id")]
    pub schedule_id: Uuid,
    #[serde(alias = "date")]
    pub completed_at: DateTime<Utc>,
}

/// Shapes written by earlier releases of the attempt log.
mod legacy {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use uuid::Uuid;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAnswer {
        Number(u32),
        Text(String),
    }

    pub fn answers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u32>, D::Error> {
        let raw: Vec<Option<RawAnswer>> = Vec::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|answer| match answer {
                Some(RawAnswer::Number(n)) => n,
                Some(RawAnswer::Text(text)) => text.trim().parse().unwrap_or(0),
                None => 0,
            })
            .collect())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Uuid(Uuid),
        Millis(u64),
        Text(String),
    }

    /// Schedule ids were once creation timestamps in milliseconds. Each one
    /// maps to a fixed UUID so attempts of the same schedule stay together.
    pub fn schedule_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        match Option::<RawId>::deserialize(deserializer)? {
            None => Ok(Uuid::nil()),
            Some(RawId::Uuid(id)) => Ok(id),
            Some(RawId::Millis(ms)) => Ok(Uuid::from_u128(u128::from(ms))),
            Some(RawId::Text(text)) => text
                .trim()
                .parse::<u64>()
                .map(|ms| Uuid::from_u128(u128::from(ms)))
                .map_err(|_| D::Error::custom(format!("invalid schedule id '{text}'"))),
        }
    }
}

/// Weighted attempt score: `Σ answers[i] * weight`.
pub fn weighted_score(exam_type: ExamType, answers: &[u32]) -> f64 {
    let weight = exam_type.answer_weight();
    answers.iter().map(|&a| f64::from(a) * weight).sum()
}

/// Administrator guidance attached to one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub attempt_ref: Uuid,
    pub feedback_text: String,
    pub suggestions_text: String,
    pub submitted_at: DateTime<Utc>,
}
