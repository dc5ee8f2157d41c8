//! OAuth2 client-credentials security scheme.

use std::fmt;

use http::HeaderMap;
use serde_json::{Value, json};

use crate::error::{AuthError, Result};
use crate::jwt::bearer_token;

/// Scheme name used when none is given.
pub const DEFAULT_SCHEME_NAME: &str = "OAuth2ClientCredentials";

/// An OAuth2 security scheme restricted to the client-credentials flow.
///
/// Describes the scheme for OpenAPI documents and extracts bearer tokens
/// from request headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuth2ClientCredentials {
    /// URL clients obtain tokens from.
    pub token_url: String,
    /// Name of the scheme in OpenAPI documents.
    pub scheme_name: String,
    /// Whether a missing token is an error or just `None`.
    pub auto_error: bool,
}

impl OAuth2ClientCredentials {
    /// Create a scheme with the default name that errors on missing tokens.
    pub fn new<S: Into<String>>(token_url: S) -> Self {
        Self {
            token_url: token_url.into(),
            scheme_name: DEFAULT_SCHEME_NAME.to_string(),
            auto_error: true,
        }
    }

    /// Set the scheme name; an empty name keeps the default.
    pub fn with_scheme_name<S: Into<String>>(mut self, scheme_name: S) -> Self {
        let scheme_name = scheme_name.into();
        if !scheme_name.is_empty() {
            self.scheme_name = scheme_name;
        }
        self
    }

    /// Set whether a missing token is an error.
    pub fn with_auto_error(mut self, auto_error: bool) -> Self {
        self.auto_error = auto_error;
        self
    }

    /// The OpenAPI security scheme object.
    pub fn security_scheme(&self) -> Value {
        json!({
            "type": "oauth2",
            "flows": {
                "clientCredentials": {
                    "tokenUrl": self.token_url,
                    "scopes": {},
                }
            }
        })
    }

    /// Extract the bearer token from `headers`.
    ///
    /// Without a token this fails when `auto_error` is set and returns
    /// `Ok(None)` otherwise.
    pub fn extract(&self, headers: &HeaderMap) -> Result<Option<String>> {
        let token = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token);

        match token {
            Some(token) => Ok(Some(token.to_string())),
            None if self.auto_error => Err(AuthError::MissingCredentials),
            None => Ok(None),
        }
    }
}

impl fmt::Display for OAuth2ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OAuth2ClientCredentials(tokenUrl='{}', scheme_name='{}', auto_error={})",
            self.token_url, self.scheme_name, self.auto_error
        )
    }
}
