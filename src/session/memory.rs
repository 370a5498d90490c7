// In-memory session store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use super::{CookieOptions, SessionStore};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if now >= exp)
    }
}

/// Thread-safe store for a single request or process context
///
/// Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with non-expiring entries, e.g. cookies forwarded with an incoming request
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (name, value) in entries {
            store.entries.insert(
                name.into(),
                Entry {
                    value: value.into(),
                    expires_at: None,
                },
            );
        }
        store
    }

    /// Remaining lifetime of an entry, if it has one
    pub fn expires_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.entries.get(name).and_then(|entry| entry.expires_at)
    }

    fn live_value(&self, name: &str) -> Option<String> {
        let now = Utc::now();
        match self.entries.get(name) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        // Read guard is released above; removing while holding it would deadlock the shard
        self.purge_expired(name, now);
        None
    }

    /// Remove an entry only if it is still expired at `now`
    ///
    /// A concurrent `set` may land between the expiry check and the removal; the
    /// fresh entry it wrote is kept.
    fn purge_expired(&self, name: &str, now: DateTime<Utc>) -> bool {
        let removed = self
            .entries
            .remove_if(name, |_, entry| entry.is_expired(now))
            .is_some();
        if removed {
            tracing::debug!(name = name, "Dropped expired session entry");
        }
        removed
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.live_value(name))
    }

    async fn set(&self, name: &str, value: &str, options: CookieOptions) -> Result<(), StoreError> {
        let expires_at = match options.max_age {
            Some(max_age) => {
                let max_age = Duration::from_std(max_age)
                    .map_err(|e| StoreError::Backend(format!("Invalid max age: {}", e)))?;
                Some(Utc::now() + max_age)
            }
            None => None,
        };

        self.entries.insert(
            name.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.entries.remove(name);
        Ok(())
    }
}
