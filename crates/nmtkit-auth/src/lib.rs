//! Authentication and authorization for nmtkit services.
//!
//! Provides:
//! - [`check_acl`]: section ACL evaluation
//! - [`AuthSuccess`]: the principal resolved from a request's credentials
//! - [`Authenticator`]: resolves bearer JWTs and API keys against [`AuthSettings`]
//! - [`ClaimsFetcher`] / [`JwksClaimsFetcher`]: JWT verification per identity provider
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware parameterised over `ClaimsFetcher`
//! - [`OAuth2ClientCredentials`]: the client-credentials security scheme
//! - [`AuthError`]: auth-specific error types
//!
//! [`AuthSettings`]: nmtkit_core::settings::AuthSettings

pub mod acl;
pub mod api_keys;
pub mod authenticator;
mod error;
pub mod jwks;
pub mod jwt;
mod middleware;
pub mod oauth;
mod patterns;
mod principal;

pub use acl::check_acl;
pub use api_keys::{authenticate_api_key, hash_api_key, verify_api_key};
pub use authenticator::{Authenticator, Credentials};
pub use error::{AuthError, Result};
pub use jwks::{Claims, ClaimsFetcher, Jwk, JwksClaimsFetcher};
pub use jwt::{JwtPart, bearer_token, decode_jwt_part, find_id_provider, strip_bearer};
pub use middleware::{
    AuthConfig, AuthLayer, AuthService, DEFAULT_API_KEY_HEADER, error_response,
    extract_credentials,
};
pub use oauth::OAuth2ClientCredentials;
pub use principal::{AuthSuccess, principal_from_parts, require_acl};
