//! Errors describing failed calls to upstream APIs.
//!
//! Repositories raise [`UpstreamResponseError`] when an upstream answers with an
//! unexpected status. Handlers convert it into [`UpstreamApiError`], which
//! picks the status to return to their own caller.

use http::HeaderMap;

/// Request ID used when the upstream response carries none.
pub const UNKNOWN_REQUEST_ID: &str = "UNKNOWN";

/// Header carrying the upstream request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// An upstream API answered with an unexpected status.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Upstream API response {status_code}; Request ID: {req_id}; Message: {message}")]
pub struct UpstreamResponseError {
    /// Status the upstream returned.
    pub status_code: u16,
    /// Response body (or a description of it).
    pub message: String,
    /// Upstream request ID, `UNKNOWN` if absent.
    pub req_id: String,
}

impl UpstreamResponseError {
    /// Build from a response's status, headers and body.
    pub fn new<S: Into<String>>(status_code: u16, headers: &HeaderMap, message: S) -> Self {
        let req_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_REQUEST_ID)
            .to_string();
        Self {
            status_code,
            message: message.into(),
            req_id,
        }
    }

    /// Whether the upstream rejected the request itself (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }
}

/// Upstream failure as reported to this service's own caller.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Upstream API failure! HTTP code: {status_code}; Request ID: {req_id}; Message: {message}")]
pub struct UpstreamApiError {
    /// Status the upstream returned.
    pub status_code: u16,
    /// Upstream message.
    pub message: String,
    /// Upstream request ID.
    pub req_id: String,
    /// Status to return to our caller: 400 for upstream 4xx, 502 otherwise.
    pub caller_status_code: u16,
}

impl From<UpstreamResponseError> for UpstreamApiError {
    fn from(err: UpstreamResponseError) -> Self {
        let caller_status_code = if err.is_client_error() { 400 } else { 502 };
        Self {
            status_code: err.status_code,
            message: err.message,
            req_id: err.req_id,
            caller_status_code,
        }
    }
}
