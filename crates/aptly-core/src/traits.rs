//! Collaborator traits the lifecycle engine consumes.
//!
//! The engine never owns persistence, identity or time. A key-value store, a
//! user directory and a clock are handed in, and the `aptly-store` crate
//! provides the durable implementations.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Key-value store
// ---------------------------------------------------------------------------

/// Synchronous string key-value storage.
///
/// Implementations use interior mutability so one store can be shared by all
/// components through an `Arc`. Writes replace the whole value.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// User directory
// ---------------------------------------------------------------------------

/// Maps emails and legacy identifiers to canonical user keys.
pub trait UserDirectory: Send + Sync {
    /// Resolve an email or account id to its canonical key. Unknown inputs
    /// resolve to themselves.
    fn resolve_identifier(&self, email_or_id: &str) -> String;

    /// The only registered user, if exactly one exists.
    fn sole_user(&self) -> Option<String> {
        None
    }
}

/// Directory that knows no users; every identifier is already canonical.
pub struct IdentityDirectory;

impl UserDirectory for IdentityDirectory {
    fn resolve_identifier(&self, email_or_id: &str) -> String {
        email_or_id.to_string()
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let start = DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = ManualClock::new(start);
        clock.advance(chrono::Duration::minutes(90));
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T10:30:00+00:00");
    }

    #[test]
    fn identity_directory_returns_input() {
        assert_eq!(IdentityDirectory.resolve_identifier("ana"), "ana");
        assert!(IdentityDirectory.sole_user().is_none());
    }
}
