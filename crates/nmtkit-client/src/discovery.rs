//! Authenticated clients for services listed in the discovery settings.
//!
//! A service authenticates one of three ways, chosen by its `auth_method`:
//!
//! - `none`: only the service's own headers are sent
//! - `client_credentials`: an OAuth2 token from the outgoing client's identity
//!   provider, shared across instances through the app cache
//! - `headers`: a static header set from `auth.outgoing.headers`

use std::time::Duration;

use backon::Retryable;
use http::header::{AUTHORIZATION, HeaderValue};
use nmtkit_cache::{AppCache, AppCacheExt, CacheError};
use nmtkit_core::retry::{RetryPolicy, retry_logger};
use nmtkit_core::settings::{
    AuthMethod, AuthSettings, DiscoveredService, ServiceDiscoverySettings,
};

use crate::api_client::{ApiClient, header_map, http_client};
use crate::error::{Error, Result};
use crate::token::{OAuthToken, fetch_client_credentials_token};

/// Prefix of the app cache key holding a service's access token.
pub const CACHE_KEY_PREFIX: &str = ":api_client_token";

/// App cache key for `service_name`'s access token.
pub fn token_cache_key(service_name: &str) -> String {
    format!("{CACHE_KEY_PREFIX}:{service_name}")
}

/// Build an [`ApiClient`] for the discovered service `service_name`.
pub async fn create_api_client(
    auth: &AuthSettings,
    discovery: &ServiceDiscoverySettings,
    service_name: &str,
    cache: &dyn AppCache,
) -> Result<ApiClient> {
    let service = discovery
        .services
        .get(service_name)
        .ok_or_else(|| Error::ServiceNotFound(service_name.to_string()))?;

    let mut headers = header_map(&service.headers)?;

    match service.auth_method {
        AuthMethod::None => {}
        AuthMethod::ClientCredentials => {
            let token = client_credentials_token(auth, service, service_name, cache).await?;
            let value = HeaderValue::from_str(&token.authorization())
                .map_err(|_| Error::InvalidHeader(AUTHORIZATION.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        AuthMethod::Headers => {
            let principal = &service.auth_principal;
            let outgoing = auth
                .outgoing
                .headers
                .get(principal)
                .ok_or_else(|| Error::HeadersNotFound(principal.clone()))?;
            log::debug!("Using static auth headers for '{principal}' client");
            headers.extend(header_map(&outgoing.headers)?);
        }
    }

    ApiClient::for_service(service, headers)
}

/// [`create_api_client`], retrying transient failures with `policy`.
///
/// Services usually start alongside their dependencies, so callers at startup
/// pass [`RetryPolicy::DISCOVERY`].
pub async fn create_api_client_with_retry(
    policy: &RetryPolicy,
    auth: &AuthSettings,
    discovery: &ServiceDiscoverySettings,
    service_name: &str,
    cache: &dyn AppCache,
) -> Result<ApiClient> {
    (|| create_api_client(auth, discovery, service_name, cache))
        .retry(policy.backoff())
        .when(Error::is_retryable)
        .notify(retry_logger("create_api_client", policy))
        .await
}

async fn client_credentials_token(
    auth: &AuthSettings,
    service: &DiscoveredService,
    service_name: &str,
    cache: &dyn AppCache,
) -> Result<OAuthToken> {
    let client_name = &service.auth_principal;
    let client = auth
        .outgoing
        .clients
        .get(client_name)
        .ok_or_else(|| Error::OutgoingClientNotFound(client_name.clone()))?;
    let provider = auth
        .id_providers
        .get(&client.provider)
        .ok_or_else(|| Error::IdProviderNotFound(client.provider.clone()))?;

    let token_key = token_cache_key(service_name);
    if let Some(cached) = cached_token(cache, &token_key).await? {
        log::debug!("Found cached API client token for {service_name}");
        if !cached.is_expired() {
            log::debug!("Returning cached API client for {service_name}");
            return Ok(cached);
        }
    }

    let http = http_client(service, header_map(&service.headers)?)?;
    let token = fetch_client_credentials_token(
        &http,
        &provider.token_endpoint,
        client,
        service.scope.as_deref(),
    )
    .await
    .inspect_err(|e| {
        log::warn!("OAuth error while getting token for service '{service_name}': {e}");
    })?;

    if token.access_token.is_empty() {
        return Err(Error::TokenAcquisition {
            service: service_name.to_string(),
            message: "no access token in response".to_string(),
        });
    }

    cache
        .store_json(&token_key, &token, Some(Duration::from_secs(client.cache_ttl)))
        .await?;
    log::debug!(
        "Cached {service_name} access token for {} seconds",
        client.cache_ttl
    );
    Ok(token)
}

async fn cached_token(cache: &dyn AppCache, key: &str) -> Result<Option<OAuthToken>> {
    match cache.fetch_json::<OAuthToken>(key).await {
        Ok(token) => Ok(token),
        Err(CacheError::Serialization(e)) => {
            log::warn!("Ignoring undecodable cached token at '{key}': {e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
