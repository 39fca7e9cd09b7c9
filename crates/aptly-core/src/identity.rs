//! Explicit user identity threaded through sessions and ledger queries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{load_collection, USERS_KEY};
use crate::traits::{KeyValueStore, UserDirectory};

/// The signed-in student a session runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    /// Canonical key attempts are recorded against.
    pub user_key: String,
    /// Email used to sign in, if any.
    pub email: Option<String>,
}

impl UserContext {
    /// Resolve a sign-in identifier through the directory. The result is
    /// frozen for the lifetime of the context.
    pub fn resolve(directory: &dyn UserDirectory, email_or_id: &str) -> Self {
        let input = email_or_id.trim();
        let email = input.contains('@').then(|| input.to_lowercase());
        Self {
            user_key: directory.resolve_identifier(input),
            email,
        }
    }
}

/// A registered account as the sign-up flow stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub user_id: Option<String>,
    pub email: String,
}

impl UserRecord {
    /// Account id, or email for accounts created before ids existed.
    pub fn canonical_key(&self) -> &str {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Directory built from the `users` document of a key-value store.
pub struct StoreDirectory {
    keys: HashMap<String, String>,
    sole: Option<String>,
}

impl StoreDirectory {
    /// Snapshot the users currently in `store`.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let users: Vec<UserRecord> = load_collection(store, USERS_KEY)?;
        Ok(Self::from_users(&users))
    }

    pub fn from_users(users: &[UserRecord]) -> Self {
        let mut keys = HashMap::new();
        for user in users {
            let canonical = user.canonical_key().to_string();
            keys.insert(user.email.to_lowercase(), canonical.clone());
            keys.insert(canonical.clone(), canonical);
        }
        let sole = match users {
            [only] => Some(only.canonical_key().to_string()),
            _ => None,
        };
        Self { keys, sole }
    }
}

impl UserDirectory for StoreDirectory {
    fn resolve_identifier(&self, email_or_id: &str) -> String {
        let trimmed = email_or_id.trim();
        self.keys
            .get(trimmed)
            .or_else(|| self.keys.get(&trimmed.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    fn sole_user(&self) -> Option<String> {
        self.sole.clone()
    }
}
