// Authentication types

use serde::{Deserialize, Serialize};

/// Refresh request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Refresh response body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub access_token: String,
}

/// How concurrent 401s share (or don't share) a refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Every 401 performs its own refresh call
    #[default]
    Independent,

    /// Refreshes are serialized; a caller that waited behind another refresh
    /// reuses the token it stored instead of refreshing again
    SingleFlight,
}

impl RefreshPolicy {
    /// Parse refresh policy from string
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().replace('_', "-").as_str() {
            "single-flight" | "singleflight" => RefreshPolicy::SingleFlight,
            _ => RefreshPolicy::Independent,
        }
    }
}
