//! Tower authentication middleware.
//!
//! `AuthLayer` and `AuthService` wrap any inner service with credential checks.
//! Generic over `ClaimsFetcher` so tests can verify tokens with static keys.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{HeaderMap, Request, StatusCode};
use tower::{Layer, Service};

use crate::authenticator::{Authenticator, Credentials};
use crate::error::AuthError;
use crate::jwks::ClaimsFetcher;
use crate::jwt::bearer_token;

/// Default header carrying API keys.
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// Configuration for the auth middleware.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Whether authentication is enabled. When false, all requests pass through.
    pub enabled: bool,
    /// Header read for API keys when no bearer token is present.
    pub api_key_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }
}

/// Tower `Layer` that wraps services with authentication.
pub struct AuthLayer<F: ClaimsFetcher> {
    authenticator: Arc<Authenticator<F>>,
    config: AuthConfig,
}

impl<F: ClaimsFetcher> Clone for AuthLayer<F> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<F: ClaimsFetcher> AuthLayer<F> {
    /// Create a new auth layer with the given authenticator and config.
    pub fn new(authenticator: Arc<Authenticator<F>>, config: AuthConfig) -> Self {
        Self {
            authenticator,
            config,
        }
    }
}

impl<F: ClaimsFetcher, S> Layer<S> for AuthLayer<F> {
    type Service = AuthService<F, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            authenticator: self.authenticator.clone(),
            config: self.config.clone(),
        }
    }
}

/// Tower `Service` that authenticates requests before forwarding them.
///
/// On success, inserts [`AuthSuccess`](crate::AuthSuccess) into request
/// extensions where it's available to downstream handlers.
pub struct AuthService<F: ClaimsFetcher, S> {
    inner: S,
    authenticator: Arc<Authenticator<F>>,
    config: AuthConfig,
}

impl<F: ClaimsFetcher, S: Clone> Clone for AuthService<F, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            authenticator: self.authenticator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<F, S> Service<Request<Body>> for AuthService<F, S>
where
    F: ClaimsFetcher,
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let authenticator = self.authenticator.clone();
        let config = self.config.clone();

        Box::pin(async move {
            if !config.enabled {
                let resp = inner
                    .call(req)
                    .await
                    .unwrap_or_else(|infallible| match infallible {});
                return Ok(resp.into_response());
            }

            let Some(credentials) = extract_credentials(req.headers(), &config.api_key_header)
            else {
                return Ok(error_response(&AuthError::MissingCredentials));
            };

            match authenticator.authenticate(&credentials).await {
                Ok(principal) => {
                    log::debug!("Request authenticated as '{}'", principal.name);
                    req.extensions_mut().insert(principal);
                    let resp = inner
                        .call(req)
                        .await
                        .unwrap_or_else(|infallible| match infallible {});
                    Ok(resp.into_response())
                }
                Err(auth_err) => {
                    log::warn!("Authentication failed: {auth_err}");
                    Ok(error_response(&auth_err))
                }
            }
        })
    }
}

/// Read credentials: `Authorization: Bearer` first, then the API key header.
pub fn extract_credentials(headers: &HeaderMap, api_key_header: &str) -> Option<Credentials> {
    let bearer = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);
    if let Some(token) = bearer {
        return Some(Credentials::Bearer(token.to_string()));
    }

    headers
        .get(api_key_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| Credentials::ApiKey(k.to_string()))
}

/// Build the JSON error response for an auth failure.
///
/// 401 responses carry `WWW-Authenticate: Bearer`.
pub fn error_response(err: &AuthError) -> axum::response::Response {
    let status = err.status_code();
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "authentication is unavailable".to_string()
    } else {
        err.to_string()
    };
    let body = serde_json::json!({
        "error": {
            "category": err.category(),
            "message": message,
        }
    });

    let mut response = (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&body).unwrap_or_default(),
    )
        .into_response();

    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            http::header::WWW_AUTHENTICATE,
            http::HeaderValue::from_static("Bearer"),
        );
    }

    response
}
