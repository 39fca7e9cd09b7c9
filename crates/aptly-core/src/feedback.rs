//! Administrator feedback attached to attempts.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AssessError, Result};
use crate::ledger::AttemptLedger;
use crate::model::Feedback;
use crate::store::{load_collection, save_collection, FEEDBACK_KEY};
use crate::traits::{Clock, KeyValueStore};

/// At most one [`Feedback`] per attempt, kept in the `adminFeedback` document.
#[derive(Clone)]
pub struct FeedbackBook {
    store: Arc<dyn KeyValueStore>,
    ledger: AttemptLedger,
    clock: Arc<dyn Clock>,
}

impl FeedbackBook {
    pub fn new(store: Arc<dyn KeyValueStore>, ledger: AttemptLedger, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ledger,
            clock,
        }
    }

    /// Write or replace the feedback of `attempt_ref`.
    pub fn submit_feedback(
        &self,
        attempt_ref: Uuid,
        feedback_text: &str,
        suggestions_text: &str,
    ) -> Result<Feedback> {
        let feedback_text = feedback_text.trim();
        let suggestions_text = suggestions_text.trim();
        if feedback_text.is_empty() || suggestions_text.is_empty() {
            return Err(AssessError::validation(
                "both feedback and suggestions are required",
            ));
        }
        if self.ledger.get_attempt(attempt_ref)?.is_none() {
            return Err(AssessError::UnknownAttempt(attempt_ref));
        }

        let feedback = Feedback {
            attempt_ref,
            feedback_text: feedback_text.to_string(),
            suggestions_text: suggestions_text.to_string(),
            submitted_at: self.clock.now(),
        };
        let mut all = self.list_feedback()?;
        match all.iter_mut().find(|f| f.attempt_ref == attempt_ref) {
            Some(existing) => *existing = feedback.clone(),
            None => all.push(feedback.clone()),
        }
        save_collection(self.store.as_ref(), FEEDBACK_KEY, &all)?;
        tracing::info!(attempt = %attempt_ref, "feedback saved");
        Ok(feedback)
    }

    pub fn feedback_for(&self, attempt_ref: Uuid) -> Result<Option<Feedback>> {
        Ok(self
            .list_feedback()?
            .into_iter()
            .find(|f| f.attempt_ref == attempt_ref))
    }

    pub fn list_feedback(&self) -> Result<Vec<Feedback>> {
        load_collection(self.store.as_ref(), FEEDBACK_KEY)
    }
}
