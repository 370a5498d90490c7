// Session store module
// Capability interface over the credential key-value store plus its backends

mod lifecycle;
mod memory;
mod sqlite;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

pub use lifecycle::Session;
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Store key holding the short-lived bearer credential
pub const ACCESS_TOKEN: &str = "accessToken";
/// Store key holding the long-lived refresh credential
pub const REFRESH_TOKEN: &str = "refreshToken";

/// Attributes applied when writing an entry
///
/// Every entry is http-only: nothing written through a `SessionStore` is exposed to page
/// scripts, so there is no flag to turn that off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookieOptions {
    /// Entry lifetime; `None` keeps it until deleted
    pub max_age: Option<Duration>,
}

impl CookieOptions {
    pub fn max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
        }
    }
}

/// Persisted key-value store holding the credential pair
///
/// Implementations decide where entries live (request-scoped memory, an on-disk jar).
/// Expired entries must behave as absent for `get` and `has`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, name: &str, value: &str, options: CookieOptions) -> Result<(), StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    async fn has(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.get(name).await?.is_some())
    }
}
