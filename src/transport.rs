// Transport abstraction
// Request descriptor, buffered response and the capability the client dispatches through

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, TransportError};

/// Anything that can carry an `ApiRequest` to the server and buffer the answer
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Request descriptor
///
/// Immutable once built: the builder methods consume `self`, and the client only ever
/// derives copies carrying an extra `Authorization` header.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Bytes>,
    requires_credential: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            body: None,
            requires_credential: false,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing any previous value under the same name
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the JSON body and set `Content-Type: application/json`
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self, ClientError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| ClientError::InvalidRequest(format!("Failed to encode JSON body: {}", e)))?;
        Ok(self
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body))
    }

    /// Ask the client to attach the stored access token
    pub fn with_credentials(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn requires_credential(&self) -> bool {
        self.requires_credential
    }

    /// Derived copy carrying `Authorization: Bearer <token>`
    pub(crate) fn with_bearer(&self, token: &str) -> Result<Self, ClientError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            ClientError::InvalidRequest("Access token is not a valid header value".to_string())
        })?;

        let mut derived = self.clone();
        derived.headers.insert(AUTHORIZATION, value);
        Ok(derived)
    }
}

/// Fully buffered response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// 2xx and 3xx count as success
    pub fn is_ok(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }

    /// Turn a non-2xx/3xx response into `RequestFailed`, keeping its body
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_ok() {
            return Ok(self);
        }
        Err(ClientError::request_failed(self.status.as_u16(), self.body))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url() -> Url {
        Url::parse("https://api.example.com/groups").unwrap()
    }

    #[test]
    fn test_request_defaults() {
        let req = ApiRequest::get(url());
        assert_eq!(*req.method(), Method::GET);
        assert!(req.headers().is_empty());
        assert!(req.body_bytes().is_none());
        assert!(!req.requires_credential());
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let req = ApiRequest::post(url())
            .json(&json!({"name": "team"}))
            .unwrap()
            .with_credentials();

        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(req.body_bytes().unwrap().as_ref(), br#"{"name":"team"}"#);
        assert!(req.requires_credential());
    }

    #[test]
    fn test_with_bearer_leaves_original_untouched() {
        let req = ApiRequest::get(url());
        let derived = req.with_bearer("abc").unwrap();

        assert!(req.headers().get(AUTHORIZATION).is_none());
        assert_eq!(derived.headers()[AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn test_with_bearer_replaces_existing_authorization() {
        let req = ApiRequest::get(url())
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        let derived = req.with_bearer("fresh").unwrap();

        let values: Vec<_> = derived.headers().get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].to_str().unwrap(), "Bearer fresh");
    }

    #[test]
    fn test_with_bearer_rejects_control_characters() {
        let req = ApiRequest::get(url());
        let err = req.with_bearer("bad\ntoken").unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[test]
    fn test_response_success_range() {
        let ok = ApiResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new());
        let moved = ApiResponse::new(StatusCode::FOUND, HeaderMap::new(), Bytes::new());
        let missing = ApiResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new());

        assert!(ok.is_ok());
        assert!(moved.is_ok());
        assert!(!missing.is_ok());
    }

    #[test]
    fn test_error_for_status_keeps_body() {
        let ok = ApiResponse::new(StatusCode::NOT_MODIFIED, HeaderMap::new(), Bytes::new());
        assert!(ok.error_for_status().is_ok());

        let denied = ApiResponse::new(
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Bytes::from_static(b"still"),
        );
        match denied.error_for_status().unwrap_err() {
            ClientError::RequestFailed {
                status,
                message,
                body,
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Please log in again.");
                assert_eq!(body.as_ref(), b"still");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_response_json_decode() {
        let resp = ApiResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(br#"{"id": 7}"#),
        );
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["id"], 7);

        let bad = ApiResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"<html>"));
        let err = bad.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
