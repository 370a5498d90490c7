// Token refresh call

use reqwest::Url;

use super::types::{RefreshTokenRequest, RefreshTokenResponse};
use crate::error::ClientError;
use crate::transport::{ApiRequest, HttpTransport};

/// Path of the refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "auth/refresh-token";

/// Build the refresh endpoint URL for a base URL
pub fn refresh_url(base_url: &Url) -> Result<Url, ClientError> {
    join_base(base_url, REFRESH_PATH)
}

/// Join `path` onto `base_url`, keeping any path prefix the base already has
pub(crate) fn join_base(base_url: &Url, path: &str) -> Result<Url, ClientError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    base.join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::InvalidRequest(format!("Invalid endpoint {}: {}", path, e)))
}

/// Exchange a refresh token for a new access token
///
/// Any non-2xx answer, an undecodable body or an empty token is a `RefreshFailed`.
pub async fn request_access_token(
    transport: &dyn HttpTransport,
    url: &Url,
    refresh_token: &str,
) -> Result<String, ClientError> {
    tracing::info!("Refreshing access token...");

    let request = ApiRequest::post(url.clone()).json(&RefreshTokenRequest { refresh_token })?;
    let response = transport.send(&request).await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text();
        tracing::error!(
            status = status.as_u16(),
            response_body = %error_text,
            "Access token refresh failed"
        );
        return Err(ClientError::RefreshFailed {
            status: status.as_u16(),
            reason: error_text,
        });
    }

    let data: RefreshTokenResponse =
        serde_json::from_slice(response.body()).map_err(|e| ClientError::RefreshFailed {
            status: status.as_u16(),
            reason: format!("Failed to parse refresh response: {}", e),
        })?;

    if data.access_token.is_empty() {
        return Err(ClientError::RefreshFailed {
            status: status.as_u16(),
            reason: "Refresh response does not contain accessToken".to_string(),
        });
    }

    tracing::info!("Access token refreshed");
    Ok(data.access_token)
}
