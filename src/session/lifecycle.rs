// Sign-in / sign-out bookkeeping over a session store

use std::sync::Arc;
use std::time::Duration;

use super::{CookieOptions, SessionStore, ACCESS_TOKEN, REFRESH_TOKEN};
use crate::error::StoreError;

/// Writes and clears the credential pair
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
    access_token_max_age: Duration,
    refresh_token_max_age: Duration,
}

impl Session {
    pub fn new(
        store: Arc<dyn SessionStore>,
        access_token_max_age: Duration,
        refresh_token_max_age: Duration,
    ) -> Self {
        Self {
            store,
            access_token_max_age,
            refresh_token_max_age,
        }
    }

    /// Persist a freshly issued credential pair
    pub async fn establish(&self, access_token: &str, refresh_token: &str) -> Result<(), StoreError> {
        self.store
            .set(
                ACCESS_TOKEN,
                access_token,
                CookieOptions::max_age(self.access_token_max_age),
            )
            .await?;
        self.store
            .set(
                REFRESH_TOKEN,
                refresh_token,
                CookieOptions::max_age(self.refresh_token_max_age),
            )
            .await?;

        tracing::info!("Session established");
        Ok(())
    }

    /// Forget both tokens
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(ACCESS_TOKEN).await?;
        self.store.delete(REFRESH_TOKEN).await?;
        tracing::info!("Session cleared");
        Ok(())
    }

    /// A refresh token is all that is needed to obtain a new access token
    pub async fn is_authenticated(&self) -> Result<bool, StoreError> {
        self.store.has(REFRESH_TOKEN).await
    }

    pub async fn has_access_token(&self) -> Result<bool, StoreError> {
        self.store.has(ACCESS_TOKEN).await
    }
}
