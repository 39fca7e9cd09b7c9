//! Append-only record of completed attempts.
//!
//! The ledger enforces at most one attempt per `(user_key, schedule_id)` at
//! write time. Opening a ledger runs the legacy identifier migration once per
//! store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AssessError, Result};
use crate::model::Attempt;
use crate::store::{
    load_collection, load_document, save_collection, save_document, ATTEMPTS_KEY,
    ATTEMPTS_SCHEMA_KEY,
};
use crate::traits::{KeyValueStore, UserDirectory};

/// Attempt documents at this version carry canonical user keys.
pub const ATTEMPTS_SCHEMA_VERSION: u32 = 2;

#[derive(Clone)]
pub struct AttemptLedger {
    store: Arc<dyn KeyValueStore>,
}

impl AttemptLedger {
    /// Open the ledger, reconciling legacy records through `directory` if
    /// that has not happened yet for this store.
    pub fn open(store: Arc<dyn KeyValueStore>, directory: &dyn UserDirectory) -> Result<Self> {
        let migrated = migrate_legacy_keys(store.as_ref(), directory)?;
        if migrated > 0 {
            tracing::warn!(migrated, "reconciled legacy attempt identifiers");
        }
        Ok(Self { store })
    }

    /// Append `attempt`. Fails if the user already has an attempt for the
    /// same schedule.
    pub fn record_attempt(&self, attempt: Attempt) -> Result<Attempt> {
        let mut attempts = self.list_all_attempts()?;
        if attempts
            .iter()
            .any(|a| a.user_key == attempt.user_key && a.schedule_id == attempt.schedule_id)
        {
            return Err(AssessError::DuplicateAttempt {
                user_key: attempt.user_key,
                schedule_id: attempt.schedule_id,
            });
        }
        attempts.push(attempt.clone());
        save_collection(self.store.as_ref(), ATTEMPTS_KEY, &attempts)?;
        tracing::info!(
            id = %attempt.id,
            user = %attempt.user_key,
            schedule = %attempt.schedule_id,
            score = attempt.score,
            "attempt recorded"
        );
        Ok(attempt)
    }

    pub fn has_attempted(&self, user_key: &str, schedule_id: Uuid) -> Result<bool> {
        Ok(self
            .list_all_attempts()?
            .iter()
            .any(|a| a.user_key == user_key && a.schedule_id == schedule_id))
    }

    /// Attempts of one user in the order they were recorded.
    pub fn list_attempts_for_user(&self, user_key: &str) -> Result<Vec<Attempt>> {
        Ok(self
            .list_all_attempts()?
            .into_iter()
            .filter(|a| a.user_key == user_key)
            .collect())
    }

    pub fn list_all_attempts(&self) -> Result<Vec<Attempt>> {
        load_collection(self.store.as_ref(), ATTEMPTS_KEY)
    }

    pub fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>> {
        Ok(self.list_all_attempts()?.into_iter().find(|a| a.id == id))
    }

    /// How many students have taken `schedule_id`.
    pub fn participant_count(&self, schedule_id: Uuid) -> Result<usize> {
        Ok(self
            .list_all_attempts()?
            .iter()
            .filter(|a| a.schedule_id == schedule_id)
            .count())
    }
}

/// Rewrite pre-migration attempts to canonical user keys.
///
/// Each record's best-known key (`user_key`, then legacy `user_id`, then
/// `user_email`) is resolved through the directory. Records with no key at
/// all go to the directory's sole user when there is exactly one. When two
/// records end up under the same `(user_key, schedule_id)` only the earliest
/// is kept. Returns the number of records whose key changed; 0 once the
/// store is at [`ATTEMPTS_SCHEMA_VERSION`].
pub fn migrate_legacy_keys(store: &dyn KeyValueStore, directory: &dyn UserDirectory) -> Result<usize> {
    let version: Option<u32> = load_document(store, ATTEMPTS_SCHEMA_KEY)?;
    if version.is_some_and(|v| v >= ATTEMPTS_SCHEMA_VERSION) {
        return Ok(0);
    }

    let mut attempts: Vec<Attempt> = load_collection(store, ATTEMPTS_KEY)?;
    let mut changed = 0;
    for attempt in &mut attempts {
        let existing = [
            Some(attempt.user_key.as_str()),
            attempt.user_id.as_deref(),
            attempt.user_email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string);

        let resolved = match &existing {
            Some(key) => Some(directory.resolve_identifier(key)),
            None => directory.sole_user(),
        };
        let Some(resolved) = resolved else {
            continue;
        };

        if attempt.user_email.is_none() {
            attempt.user_email = existing.filter(|k| k.contains('@'));
        }
        attempt.user_id = None;
        if resolved != attempt.user_key {
            attempt.user_key = resolved;
            changed += 1;
        }
    }

    let before = attempts.len();
    let attempts = keep_earliest(attempts);
    if attempts.len() < before {
        tracing::warn!(
            dropped = before - attempts.len(),
            "dropped later attempts that merged into an existing user and schedule"
        );
    }

    if !attempts.is_empty() {
        save_collection(store, ATTEMPTS_KEY, &attempts)?;
    }
    save_document(store, ATTEMPTS_SCHEMA_KEY, &ATTEMPTS_SCHEMA_VERSION)?;
    Ok(changed)
}

/// One attempt per `(user_key, schedule_id)`, the earliest completed, in
/// recorded order. Records without a schedule are all kept.
fn keep_earliest(attempts: Vec<Attempt>) -> Vec<Attempt> {
    let mut earliest: HashMap<(&str, Uuid), usize> = HashMap::new();
    let mut keep: HashSet<usize> = HashSet::new();
    for (i, attempt) in attempts.iter().enumerate() {
        if attempt.schedule_id.is_nil() {
            keep.insert(i);
            continue;
        }
        earliest
            .entry((attempt.user_key.as_str(), attempt.schedule_id))
            .and_modify(|kept| {
                if attempt.completed_at < attempts[*kept].completed_at {
                    *kept = i;
                }
            })
            .or_insert(i);
    }
    keep.extend(earliest.into_values());
    attempts
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, attempt)| attempt)
        .collect()
}
