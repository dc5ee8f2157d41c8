//! Resolves presented credentials to a configured principal.

use std::sync::Arc;

use nmtkit_core::settings::{AuthSettings, IncomingAuthClient};
use serde_json::Value;

use crate::api_keys;
use crate::error::{AuthError, Result};
use crate::jwks::{Claims, ClaimsFetcher, JwksClaimsFetcher};
use crate::jwt::{find_id_provider, strip_bearer};
use crate::principal::AuthSuccess;

/// Identity provider type verified with a JWKS endpoint.
pub const PROVIDER_TYPE_JWKS: &str = "jwks";

/// Credentials presented with a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// A bearer JWT.
    Bearer(String),
    /// An API key.
    ApiKey(String),
}

/// Authenticates JWTs and API keys against [`AuthSettings`].
pub struct Authenticator<F: ClaimsFetcher = JwksClaimsFetcher> {
    settings: Arc<AuthSettings>,
    fetcher: F,
}

impl Authenticator<JwksClaimsFetcher> {
    /// Create an authenticator that verifies JWTs with provider JWKS endpoints.
    pub fn jwks(settings: Arc<AuthSettings>) -> Self {
        Self::new(settings, JwksClaimsFetcher::new())
    }
}

impl<F: ClaimsFetcher> Authenticator<F> {
    /// Create an authenticator with the given claims fetcher.
    pub fn new(settings: Arc<AuthSettings>, fetcher: F) -> Self {
        Self { settings, fetcher }
    }

    /// The settings principals are resolved against.
    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Authenticate a JWT, with or without a `Bearer ` prefix.
    ///
    /// The first incoming client of the token's provider whose configured claims
    /// all equal the token's claims is the principal.
    pub async fn authenticate_token(&self, token: &str) -> Result<AuthSuccess> {
        let token = strip_bearer(token);
        let provider_name = find_id_provider(token, &self.settings)?;
        let provider = self
            .settings
            .id_providers
            .get(&provider_name)
            .ok_or(AuthError::UnknownProvider)?;

        let claims = match provider.kind.as_str() {
            PROVIDER_TYPE_JWKS => self.fetcher.fetch_claims(token, provider).await?,
            other => return Err(AuthError::UnsupportedProviderType(other.to_string())),
        };
        if claims.is_empty() {
            return Err(AuthError::NoClaims);
        }

        let matched = self
            .settings
            .incoming
            .clients
            .iter()
            .filter(|(_, client)| client.provider == provider_name)
            .find(|(_, client)| client_matches(client, &claims));

        match matched {
            Some((name, client)) => {
                log::debug!("Authenticated client '{name}' via provider '{provider_name}'");
                Ok(AuthSuccess::new(name.clone(), client.acls.clone()))
            }
            None => Err(AuthError::NotPermitted(
                "Invalid client (no permissions)".to_string(),
            )),
        }
    }

    /// Authenticate an API key.
    pub fn authenticate_api_key(&self, api_key: &str) -> Result<AuthSuccess> {
        api_keys::authenticate_api_key(api_key, &self.settings)
    }

    /// Authenticate either kind of credentials.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSuccess> {
        match credentials {
            Credentials::Bearer(token) => self.authenticate_token(token).await,
            Credentials::ApiKey(key) => self.authenticate_api_key(key),
        }
    }
}

/// Every configured claim must be a string claim with exactly that value.
fn client_matches(client: &IncomingAuthClient, claims: &Claims) -> bool {
    client.claims.iter().all(|(name, expected)| {
        claims.get(name).and_then(Value::as_str) == Some(expected.as_str())
    })
}
