// Persisted session store backed by SQLite

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{CookieOptions, SessionStore};
use crate::error::StoreError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS session_kv (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER
)";

/// Session jar that survives process restarts
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open (or create) the jar at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!(
                        "Failed to create session directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        tracing::debug!("Opening session store: {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Store that lives only as long as the process
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking statement off the async executor
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Session store task failed: {}", e)))?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let row: Option<(String, Option<i64>)> = conn
                .query_row(
                    "SELECT value, expires_at FROM session_kv WHERE name = ?1",
                    [&name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((_, Some(expires_at))) if Utc::now().timestamp() >= expires_at => {
                    conn.execute("DELETE FROM session_kv WHERE name = ?1", [&name])?;
                    Ok(None)
                }
                Some((value, _)) => Ok(Some(value)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn set(&self, name: &str, value: &str, options: CookieOptions) -> Result<(), StoreError> {
        let expires_at = match options.max_age {
            Some(max_age) => {
                let secs = i64::try_from(max_age.as_secs())
                    .map_err(|_| StoreError::Backend("Max age out of range".to_string()))?;
                Some(Utc::now().timestamp().saturating_add(secs))
            }
            None => None,
        };

        let name = name.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_kv (name, value, expires_at) VALUES (?1, ?2, ?3)",
                params![name, value, expires_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM session_kv WHERE name = ?1", [&name])?;
            Ok(())
        })
        .await
    }
}
