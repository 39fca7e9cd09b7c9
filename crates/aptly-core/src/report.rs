//! Results reports with JSON persistence.
//!
//! Analyses are computed when a report is built and never stored in the
//! attempt ledger.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{analyze, TraitAnalysis};
use crate::feedback::FeedbackBook;
use crate::ledger::AttemptLedger;
use crate::model::{Attempt, Feedback};
use crate::recommend::{recommend, Recommendation};

/// One attempt joined with its analysis and feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    pub attempt: Attempt,
    pub analysis: TraitAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

/// Dashboard figures for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub user_key: String,
    pub completed_tests: usize,
    /// Mean attempt score, rounded to a whole number.
    pub avg_score: f64,
    /// Most recently completed attempt.
    pub latest: Option<Uuid>,
}

impl StudentSummary {
    pub fn from_attempts(user_key: &str, attempts: &[Attempt]) -> Self {
        let avg_score = if attempts.is_empty() {
            0.0
        } else {
            (attempts.iter().map(|a| a.score).sum::<f64>() / attempts.len() as f64).round()
        };
        Self {
            user_key: user_key.to_string(),
            completed_tests: attempts.len(),
            avg_score,
            latest: attempts.iter().max_by_key(|a| a.completed_at).map(|a| a.id),
        }
    }
}

/// A complete results report, for one student or for every student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// The student the report is about; `None` for an all-students report.
    pub user_key: Option<String>,
    pub summaries: Vec<StudentSummary>,
    pub attempts: Vec<AttemptReport>,
    /// Present on single-student reports only.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl ResultsReport {
    /// Build a report over the ledger's attempts, optionally restricted to
    /// one student. Attempts are listed newest first.
    pub fn build(
        ledger: &AttemptLedger,
        feedback: &FeedbackBook,
        user_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> crate::error::Result<Self> {
        let mut attempts = match user_key {
            Some(key) => ledger.list_attempts_for_user(key)?,
            None => ledger.list_all_attempts()?,
        };

        let mut users: Vec<&str> = attempts.iter().map(|a| a.user_key.as_str()).collect();
        users.sort_unstable();
        users.dedup();
        let summaries = users
            .iter()
            .map(|key| {
                let theirs: Vec<Attempt> = attempts
                    .iter()
                    .filter(|a| a.user_key == *key)
                    .cloned()
                    .collect();
                StudentSummary::from_attempts(key, &theirs)
            })
            .collect();

        let recommendations = match user_key {
            Some(_) => recommend(&attempts),
            None => Vec::new(),
        };

        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        let all_feedback = feedback.list_feedback()?;
        let attempts = attempts
            .into_iter()
            .map(|attempt| AttemptReport {
                analysis: analyze(&attempt),
                feedback: all_feedback
                    .iter()
                    .find(|f| f.attempt_ref == attempt.id)
                    .cloned(),
                attempt,
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: now,
            user_key: user_key.map(str::to_string),
            summaries,
            attempts,
            recommendations,
        })
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ResultsReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}
