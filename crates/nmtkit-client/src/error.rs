//! Error types for nmtkit-client.

use nmtkit_cache::CacheError;
use nmtkit_core::UpstreamResponseError;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors building clients for discovered services and calling them.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No service with this name in the discovery settings.
    #[error("Service '{0}' not found in discovery settings.")]
    ServiceNotFound(String),

    /// The service names an outgoing OAuth2 client that is not configured.
    #[error("Outgoing client '{0}' not found in auth settings.")]
    OutgoingClientNotFound(String),

    /// The outgoing client names an identity provider that is not configured.
    #[error("ID Provider '{0}' not found in auth settings.")]
    IdProviderNotFound(String),

    /// The service names a static header set that is not configured.
    #[error("Outgoing headers '{0}' not found in auth settings.")]
    HeadersNotFound(String),

    /// The outgoing client uses a token endpoint auth method we cannot speak.
    #[error("Unsupported token endpoint auth method: {0}")]
    UnsupportedAuthMethod(String),

    /// The token endpoint answered without a usable access token.
    #[error("Failed to retrieve token for service '{service}': {message}")]
    TokenAcquisition {
        /// Service the token was for.
        service: String,
        /// What went wrong.
        message: String,
    },

    /// The token endpoint answered with an OAuth2 error response.
    #[error("OAuth error '{error}': {description}")]
    OAuth {
        /// OAuth2 error code, e.g. `invalid_client`.
        error: String,
        /// The `error_description`, empty if absent.
        description: String,
    },

    /// The token endpoint failed without an OAuth2 error body.
    #[error("Token endpoint returned HTTP {status}: {body}")]
    TokenEndpoint {
        /// HTTP status.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The token endpoint returned a token response we cannot use.
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// A request with a streaming body cannot be retried.
    #[error("Request cannot be retried: {0}")]
    UnclonableRequest(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token cache failure.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The upstream answered with an unexpected status.
    #[error(transparent)]
    Upstream(#[from] UpstreamResponseError),

    /// A response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a connection could not be established at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_connect())
    }

    /// Whether retrying the operation may succeed.
    ///
    /// Configuration lookups, OAuth2 rejections and upstream 4xx responses are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Error::Cache(e) => e.is_retryable(),
            Error::Upstream(e) => !e.is_client_error(),
            Error::TokenEndpoint { status, .. } => *status >= 500,
            Error::TokenAcquisition { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use http::HeaderMap;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::ServiceNotFound("widgets".into()).to_string(),
            "Service 'widgets' not found in discovery settings."
        );
        assert_eq!(
            Error::IdProviderNotFound("keycloak".into()).to_string(),
            "ID Provider 'keycloak' not found in auth settings."
        );
    }

    #[test]
    fn test_retryable() {
        let not_found = UpstreamResponseError::new(404, &HeaderMap::new(), "no widget");
        let unavailable = UpstreamResponseError::new(503, &HeaderMap::new(), "try later");
        assert!(!Error::from(not_found).is_retryable());
        assert!(Error::from(unavailable).is_retryable());
        assert!(!Error::ServiceNotFound("widgets".into()).is_retryable());
        assert!(
            Error::TokenEndpoint {
                status: 502,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !Error::OAuth {
                error: "invalid_client".into(),
                description: String::new()
            }
            .is_retryable()
        );
    }
}
