//! Auth-specific error types.

use http::StatusCode;

/// Result type alias for authentication and authorization.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication or authorization.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Neither a bearer token nor an API key was presented.
    #[error("missing credentials")]
    MissingCredentials,

    /// Token is not a three-part JWT.
    #[error("Invalid token")]
    MalformedToken,

    /// Token or one of its parts could not be decoded.
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// JWT signature or claims verification failed.
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// No identity provider matches the token issuer.
    #[error("unknown provider")]
    UnknownProvider,

    /// The matching identity provider has a type with no verifier.
    #[error("unsupported identity provider type '{0}'")]
    UnsupportedProviderType(String),

    /// Verification produced no claims.
    #[error("no claims found")]
    NoClaims,

    /// No key in the JWKS matches the token's kid.
    #[error("no matching key for kid '{0}'")]
    NoMatchingKey(String),

    /// Failed to fetch JWKS from the identity provider.
    #[error("failed to fetch JWKS: {0}")]
    JwksFetchError(String),

    /// The API key matches no configured key.
    #[error("Unknown API key")]
    UnknownApiKey,

    /// A configured API key uses an unknown hash algorithm.
    #[error("Unknown password algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The principal authenticated but has no permissions.
    #[error("{0}")]
    NotPermitted(String),

    /// The principal's ACLs do not allow this operation.
    #[error("'{method}' on '{section}' is not permitted")]
    Forbidden {
        /// Section that was accessed.
        section: String,
        /// Method or operation attempted.
        method: String,
    },
}

impl AuthError {
    /// Whether the caller failed to prove who they are (401).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredentials
                | AuthError::InvalidFormat(_)
                | AuthError::InvalidSignature(_)
                | AuthError::Expired
                | AuthError::UnknownProvider
                | AuthError::NoClaims
                | AuthError::NoMatchingKey(_)
                | AuthError::UnknownApiKey
        )
    }

    /// Whether the request is refused outright (403).
    ///
    /// Covers principals without the needed permissions, and bearer tokens
    /// that are not JWTs at all.
    pub fn is_authorization_error(&self) -> bool {
        matches!(
            self,
            AuthError::NotPermitted(_) | AuthError::Forbidden { .. } | AuthError::MalformedToken
        )
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        if self.is_authorization_error() {
            StatusCode::FORBIDDEN
        } else if self.is_client_error() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Category reported in JSON error bodies.
    pub fn category(&self) -> &'static str {
        if self.is_authorization_error() {
            "authorization"
        } else if self.is_client_error() {
            "authentication"
        } else {
            "internal"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::UnknownApiKey.to_string(), "Unknown API key");
        assert_eq!(AuthError::MalformedToken.to_string(), "Invalid token");
        assert_eq!(
            AuthError::UnsupportedAlgorithm("md5".into()).to_string(),
            "Unknown password algorithm: md5"
        );
        assert_eq!(
            AuthError::NotPermitted("Invalid client (no permissions)".into()).to_string(),
            "Invalid client (no permissions)"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Expired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Forbidden {
                section: "widgets".into(),
                method: "DELETE".into()
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AuthError::MalformedToken.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::MalformedToken.category(), "authorization");
        // JwksFetchError is a server-side issue, not a client error
        assert_eq!(
            AuthError::JwksFetchError("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::UnsupportedAlgorithm("md5".into()).category(),
            "internal"
        );
    }
}
