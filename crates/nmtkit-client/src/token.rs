//! OAuth2 client credentials tokens.

use nmtkit_core::settings::OutgoingAuthClient;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Send the client ID and secret as HTTP basic auth.
pub const CLIENT_SECRET_BASIC: &str = "client_secret_basic";

/// Send the client ID and secret as form fields.
pub const CLIENT_SECRET_POST: &str = "client_secret_post";

/// Seconds before `expires_at` at which a token already counts as expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 60;

/// An access token from a token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    /// The bearer token.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds, as issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Expiry as a Unix timestamp, derived from `expires_in` on receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    /// Whether the token expires within [`EXPIRY_LEEWAY_SECS`] from now.
    ///
    /// A token without a known expiry never expires.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Whether the token counts as expired at Unix time `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at < now.saturating_add(EXPIRY_LEEWAY_SECS))
    }

    /// `Authorization` header value for this token.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Derive `expires_at` from `expires_in` received at Unix time `now`.
    ///
    /// Lifetimes past the end of `i64` time saturate. A negative lifetime is
    /// rejected.
    fn stamp_expiry(&mut self, now: i64) -> Result<()> {
        if self.expires_at.is_some() {
            return Ok(());
        }
        match self.expires_in {
            Some(secs) if secs < 0 => Err(Error::InvalidTokenResponse(format!(
                "negative expires_in: {secs}"
            ))),
            Some(secs) => {
                self.expires_at = Some(now.saturating_add(secs));
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Request a token from `endpoint` with the client credentials grant.
///
/// Authenticates as `client` using its `token_endpoint_auth_method`. OAuth2 error
/// responses become [`Error::OAuth`].
pub async fn fetch_client_credentials_token(
    http: &reqwest::Client,
    endpoint: &str,
    client: &OutgoingAuthClient,
    scope: Option<&str>,
) -> Result<OAuthToken> {
    let mut form = vec![("grant_type", "client_credentials")];
    if let Some(scope) = scope {
        form.push(("scope", scope));
    }

    let request = match client.token_endpoint_auth_method.as_str() {
        CLIENT_SECRET_BASIC => http
            .post(endpoint)
            .basic_auth(&client.client_id, Some(&client.client_secret)),
        CLIENT_SECRET_POST => {
            form.push(("client_id", client.client_id.as_str()));
            form.push(("client_secret", client.client_secret.as_str()));
            http.post(endpoint)
        }
        other => return Err(Error::UnsupportedAuthMethod(other.to_string())),
    };

    log::debug!(
        "Requesting client credentials token for '{}' from {endpoint}",
        client.client_id
    );
    let response = request
        .header(ACCEPT, "application/json")
        .form(&form)
        .send()
        .await?;
    let status = response.status();
    let body = response.bytes().await?;

    let parsed = serde_json::from_slice::<Value>(&body).ok();
    if let Some(oauth_error) = parsed
        .as_ref()
        .filter(|v| v.get("error").is_some())
        .and_then(|v| OAuthErrorBody::deserialize(v).ok())
    {
        return Err(Error::OAuth {
            error: oauth_error.error,
            description: oauth_error.error_description.unwrap_or_default(),
        });
    }

    if !status.is_success() {
        return Err(Error::TokenEndpoint {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    let mut token: OAuthToken = serde_json::from_slice(&body)?;
    token.stamp_expiry(chrono::Utc::now().timestamp())?;
    Ok(token)
}
