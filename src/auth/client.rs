use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::refresh;
use super::types::RefreshPolicy;
use crate::error::ClientError;
use crate::session::{CookieOptions, SessionStore, ACCESS_TOKEN, REFRESH_TOKEN};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Lifetime given to an access token obtained through refresh
pub const DEFAULT_ACCESS_TOKEN_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Authenticated request client
///
/// Attaches the stored access token to requests that ask for it, and answers a 401 with
/// exactly one refresh followed by exactly one replay of the original request. The same
/// code path serves every execution context; only the injected `SessionStore` differs.
pub struct AuthClient {
    base_url: Url,
    refresh_url: Url,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn SessionStore>,
    refresh_policy: RefreshPolicy,
    access_token_max_age: Duration,
    /// Serializes refreshes under `RefreshPolicy::SingleFlight`
    refresh_lock: Mutex<()>,
}

impl AuthClient {
    pub fn new(
        base_url: Url,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        let refresh_url = refresh::refresh_url(&base_url)?;

        Ok(Self {
            base_url,
            refresh_url,
            transport,
            store,
            refresh_policy: RefreshPolicy::default(),
            access_token_max_age: DEFAULT_ACCESS_TOKEN_MAX_AGE,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn with_access_token_max_age(mut self, max_age: Duration) -> Self {
        self.access_token_max_age = max_age;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh_policy
    }

    /// Session store this client reads credentials from
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// Resolve an API path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        refresh::join_base(&self.base_url, path)
    }

    /// Send a request, refreshing the access token once on 401
    ///
    /// The body of a successful response is passed through unparsed. A failure before any
    /// refresh comes back typed: `SessionExpired` when no refresh token is stored,
    /// `RefreshFailed` when the refresh call does not succeed, `RequestFailed` for any other
    /// terminal status. The replay that follows a refresh is returned as received.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let sent_token = if request.requires_credential() {
            self.store.get(ACCESS_TOKEN).await?
        } else {
            None
        };

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            with_token = sent_token.is_some(),
            "Dispatching request"
        );

        let response = match sent_token.as_deref() {
            Some(token) => self.transport.send(&request.with_bearer(token)?).await?,
            None => self.transport.send(request).await?,
        };

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response, request);
        }

        tracing::warn!(url = %request.url(), "Received 401, refreshing access token");

        let token = self.renew_access_token(sent_token.as_deref()).await?;
        let retry = request.with_bearer(&token)?;

        // The replay is final and comes back as received, even a second 401
        let response = self.transport.send(&retry).await?;
        tracing::debug!(
            url = %request.url(),
            status = response.status().as_u16(),
            "Replayed request after refresh"
        );
        Ok(response)
    }

    /// Obtain a new access token according to the refresh policy
    async fn renew_access_token(&self, stale: Option<&str>) -> Result<String, ClientError> {
        match self.refresh_policy {
            RefreshPolicy::Independent => self.refresh_access_token().await,
            RefreshPolicy::SingleFlight => {
                let _guard = self.refresh_lock.lock().await;

                // Only a token that differs from the one the server rejected counts as renewed
                if let Some(sent) = stale {
                    if let Some(current) = self.store.get(ACCESS_TOKEN).await? {
                        if current != sent {
                            tracing::debug!("Access token was renewed while waiting, reusing it");
                            return Ok(current);
                        }
                    }
                }

                self.refresh_access_token().await
            }
        }
    }

    /// Refresh once and persist the new access token before returning it
    async fn refresh_access_token(&self) -> Result<String, ClientError> {
        let Some(refresh_token) = self.store.get(REFRESH_TOKEN).await? else {
            tracing::warn!("No refresh token stored, session expired");
            return Err(ClientError::SessionExpired);
        };

        let access_token =
            refresh::request_access_token(self.transport.as_ref(), &self.refresh_url, &refresh_token)
                .await?;

        self.store
            .set(
                ACCESS_TOKEN,
                &access_token,
                CookieOptions::max_age(self.access_token_max_age),
            )
            .await?;

        Ok(access_token)
    }
}

fn check_status(response: ApiResponse, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
    if !response.is_ok() {
        tracing::error!(
            status = response.status().as_u16(),
            method = %request.method(),
            url = %request.url(),
            "HTTP request failed with error response"
        );
    }
    response.error_for_status()
}
