// Account endpoints: sign-in, sign-up, provider sign-in

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::auth::AuthClient;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::ApiRequest;

/// Sign-in request body
#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Sign-up request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub nickname: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Token pair handed out by the sign-in endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderSignInRequest<'a> {
    state: &'a str,
    redirect_uri: &'a str,
    token: &'a str,
}

/// Supported OAuth providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Kakao,
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Kakao => "KAKAO",
            OAuthProvider::Google => "GOOGLE",
        }
    }

    /// Parse provider name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "KAKAO" => Some(OAuthProvider::Kakao),
            "GOOGLE" => Some(OAuthProvider::Google),
            _ => None,
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redirect URIs registered with each provider
#[derive(Debug, Clone, Default)]
pub struct ProviderRedirects {
    pub kakao: Option<String>,
    pub google: Option<String>,
}

impl ProviderRedirects {
    fn for_provider(&self, provider: OAuthProvider) -> Option<&str> {
        match provider {
            OAuthProvider::Kakao => self.kakao.as_deref(),
            OAuthProvider::Google => self.google.as_deref(),
        }
    }
}

/// Account operations
pub struct AccountApi {
    client: Arc<AuthClient>,
    session: Session,
    redirects: ProviderRedirects,
}

impl AccountApi {
    pub fn new(client: Arc<AuthClient>, session: Session, redirects: ProviderRedirects) -> Self {
        Self {
            client,
            session,
            redirects,
        }
    }

    /// Sign in with email and password, persisting the returned tokens
    pub async fn sign_in(&self, data: &SignInRequest) -> Result<AuthPayload, ClientError> {
        let request = ApiRequest::post(self.client.endpoint("auth/signIn")?).json(data)?;
        self.sign_in_with(&request).await
    }

    /// Register a new account; returns the created user document
    pub async fn sign_up(&self, data: &SignUpRequest) -> Result<Value, ClientError> {
        let request = ApiRequest::post(self.client.endpoint("auth/signUp")?).json(data)?;
        let response = self.client.send(&request).await?.error_for_status()?;
        response.json()
    }

    /// Complete an OAuth sign-in with the authorization code the provider redirected with
    pub async fn sign_in_with_provider(
        &self,
        provider: OAuthProvider,
        state: &str,
        code: &str,
    ) -> Result<AuthPayload, ClientError> {
        let redirect_uri = self.redirects.for_provider(provider).ok_or_else(|| {
            ClientError::InvalidRequest(format!("No redirect URI configured for {}", provider))
        })?;

        let path = format!("auth/signIn/{}", provider.as_str());
        let request = ApiRequest::post(self.client.endpoint(&path)?).json(&ProviderSignInRequest {
            state,
            redirect_uri,
            token: code,
        })?;
        self.sign_in_with(&request).await
    }

    /// Drop the stored credential pair
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        self.session.clear().await?;
        Ok(())
    }

    async fn sign_in_with(&self, request: &ApiRequest) -> Result<AuthPayload, ClientError> {
        // A replay after refresh is returned unmapped
        let response = self.client.send(request).await?.error_for_status()?;
        let payload: AuthPayload = response.json()?;

        self.session
            .establish(&payload.access_token, &payload.refresh_token)
            .await?;
        Ok(payload)
    }
}
