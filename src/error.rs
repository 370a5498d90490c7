// Error handling module
// Defines the client error taxonomy and the status-to-message table

use bytes::Bytes;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Message shown when the caller has to sign in again
pub const MSG_LOGIN_AGAIN: &str = "Please log in again.";
/// Message shown when the refresh call itself did not succeed
pub const MSG_REFRESH_FAILED: &str = "Access token refresh failed.";

/// Errors surfaced by the authenticated request client
#[derive(Error, Debug)]
pub enum ClientError {
    /// A 401 was received and no refresh token is stored
    #[error("Session expired: no refresh token available")]
    SessionExpired,

    /// The refresh endpoint did not hand out a new access token
    #[error("Access token refresh failed: {status} - {reason}")]
    RefreshFailed { status: u16, reason: String },

    /// Terminal non-success status after any applicable retry
    #[error("Request failed: {status} - {message}")]
    RequestFailed {
        status: u16,
        message: String,
        body: Bytes,
    },

    /// The underlying transport could not complete the exchange
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session store could not be read or written
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    /// A successful response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, header or body)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Transport-level failures, categorized the way reqwest reports them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request error: {0}")]
    Request(String),
}

/// Session store failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Map a failed HTTP status to the message shown to the user
pub fn status_message(status: u16) -> &'static str {
    match status {
        401 => MSG_LOGIN_AGAIN,
        403 => "You do not have permission.",
        404 => "Invalid request.",
        500 => "Server error.",
        _ => "An error occurred.",
    }
}

#[derive(Deserialize)]
struct ValidationBody {
    details: BTreeMap<String, ValidationDetail>,
}

#[derive(Deserialize)]
struct ValidationDetail {
    message: String,
}

impl ClientError {
    /// Build a `RequestFailed` from a terminal status and its raw body
    pub fn request_failed(status: u16, body: Bytes) -> Self {
        ClientError::RequestFailed {
            status,
            message: status_message(status).to_string(),
            body,
        }
    }

    /// Human-readable message for presentation by the caller
    pub fn user_message(&self) -> String {
        match self {
            ClientError::SessionExpired => MSG_LOGIN_AGAIN.to_string(),
            ClientError::RefreshFailed { .. } => MSG_REFRESH_FAILED.to_string(),
            ClientError::RequestFailed { message, .. } => message.clone(),
            ClientError::Transport(_) | ClientError::Store(_) | ClientError::Decode(_) => {
                status_message(0).to_string()
            }
            ClientError::InvalidRequest(_) => status_message(404).to_string(),
        }
    }

    /// HTTP status attached to the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RefreshFailed { status, .. } | ClientError::RequestFailed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Field-level validation messages from a `{ "details": { field: { "message" } } }` body
    pub fn validation_details(&self) -> Option<BTreeMap<String, String>> {
        let ClientError::RequestFailed { body, .. } = self else {
            return None;
        };

        let parsed: ValidationBody = serde_json::from_slice(body).ok()?;
        Some(
            parsed
                .details
                .into_iter()
                .map(|(field, detail)| (field, detail.message))
                .collect(),
        )
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
