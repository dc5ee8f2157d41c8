//! Settings schemas shared by nmtkit-based services.
//!
//! Services embed these sections in their own settings struct and load the
//! whole thing with [`load_settings`](crate::settings::load_settings):
//!
//! ```rust
//! use nmtkit_core::settings::{AuthSettings, LoggingSettings};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct AppSettings {
//!     auth: AuthSettings,
//!     #[serde(default)]
//!     logging: LoggingSettings,
//! }
//!
//! let yaml = r#"
//! auth:
//!   swagger_token_url: https://id.example.com/token
//!   id_providers: {}
//! "#;
//! let settings: AppSettings = serde_yaml::from_str(yaml).unwrap();
//! assert!(settings.auth.incoming.clients.is_empty());
//! assert_eq!(settings.logging.level, "INFO");
//! ```
//!
//! Maps are insertion-ordered: provider, client and API key lookups walk them
//! in the order they appear in the configuration files.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::logging::DEFAULT_FORMAT;

/// Insertion-ordered map used for every named settings collection.
pub type SettingsMap<V> = IndexMap<String, V>;

// ============================================================================
// Identity providers
// ============================================================================

/// An identity provider that issues the tokens presented to (or requested by) a service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdProvider {
    /// Provider type. Only `"jwks"` is understood by the authenticator.
    #[serde(rename = "type")]
    pub kind: String,
    /// Regex searched in a token's `iss` claim to select this provider.
    pub issuer_regex: String,
    /// JWKS endpoint with the provider's signing keys.
    pub jwks_endpoint: String,
    /// OAuth2 token endpoint used for outgoing client credentials.
    pub token_endpoint: String,
    /// Whether token introspection is enabled.
    pub introspection_enabled: bool,
    /// Token introspection endpoint.
    pub introspection_endpoint: String,
    /// Whether key ID verification is enabled.
    pub keyid_enabled: bool,
    /// Key ID verification endpoint.
    pub keyid_endpoint: String,
}

impl Default for IdProvider {
    fn default() -> Self {
        Self {
            kind: "jwks".to_string(),
            issuer_regex: "__REAL_REGEX_GOES_HERE__".to_string(),
            jwks_endpoint: "http://localhost/jwks".to_string(),
            token_endpoint: "http://localhost/token".to_string(),
            introspection_enabled: false,
            introspection_endpoint: "http://localhost/introspection".to_string(),
            keyid_enabled: false,
            keyid_endpoint: "http://localhost/keyid".to_string(),
        }
    }
}

// ============================================================================
// ACLs
// ============================================================================

/// Access to the sections whose names match a regex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionAcl {
    /// Regex matched against the start of a section name. Empty matches every section.
    pub section_regex: String,
    /// Granted permissions, e.g. `["read", "write"]`, or `["*"]` for everything.
    pub permissions: Vec<String>,
}

impl SectionAcl {
    /// Convenience constructor.
    pub fn new<S: Into<String>>(section_regex: S, permissions: &[&str]) -> Self {
        Self {
            section_regex: section_regex.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }
}

// ============================================================================
// Incoming auth
// ============================================================================

/// An OAuth2 client allowed to call this service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomingAuthClient {
    /// Contact for the client's owner.
    #[serde(default)]
    pub contact: String,
    /// Free-form notes.
    #[serde(default)]
    pub memo: String,
    /// Name of the identity provider that issues this client's tokens.
    pub provider: String,
    /// Claims that must all be present with exactly these values.
    #[serde(default)]
    pub claims: SettingsMap<String>,
    /// ACLs granted to the client.
    #[serde(default)]
    pub acls: Vec<SectionAcl>,
}

/// An API key allowed to call this service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncomingAuthApiKey {
    /// Contact for the key's owner.
    #[serde(default)]
    pub contact: String,
    /// Free-form notes.
    #[serde(default)]
    pub memo: String,
    /// Hash algorithm of [`hash`](Self::hash).
    #[serde(default = "default_api_key_algo")]
    pub algo: String,
    /// Stored hash of the key (PHC string for argon2).
    #[serde(default)]
    pub hash: String,
    /// ACLs granted to the key.
    #[serde(default)]
    pub acls: Vec<SectionAcl>,
}

fn default_api_key_algo() -> String {
    "argon2".to_string()
}

impl Default for IncomingAuthApiKey {
    fn default() -> Self {
        Self {
            contact: String::new(),
            memo: String::new(),
            algo: default_api_key_algo(),
            hash: String::new(),
            acls: Vec::new(),
        }
    }
}

/// Principals that may call this service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingAuthSettings {
    /// OAuth2 clients, by name.
    pub clients: SettingsMap<IncomingAuthClient>,
    /// API keys, by name.
    pub api_keys: SettingsMap<IncomingAuthApiKey>,
}

// ============================================================================
// Outgoing auth
// ============================================================================

/// OAuth2 client credentials this service uses to call others.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutgoingAuthClient {
    /// Contact for the client registration.
    #[serde(default)]
    pub contact: String,
    /// Free-form notes.
    #[serde(default)]
    pub memo: String,
    /// Name of the identity provider holding the token endpoint.
    pub provider: String,
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// `client_secret_basic` or `client_secret_post`.
    #[serde(default = "default_token_endpoint_auth_method")]
    pub token_endpoint_auth_method: String,
    /// Seconds an acquired token stays in the app cache.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
}

fn default_token_endpoint_auth_method() -> String {
    "client_secret_basic".to_string()
}

fn default_cache_ttl() -> u64 {
    600
}

impl Default for OutgoingAuthClient {
    fn default() -> Self {
        Self {
            contact: String::new(),
            memo: String::new(),
            provider: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            token_endpoint_auth_method: default_token_endpoint_auth_method(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

/// Static headers this service sends to another service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingAuthHeaders {
    /// Contact for the credential's owner.
    pub contact: String,
    /// Free-form notes.
    pub memo: String,
    /// Headers added to every request. May be empty when no auth is needed.
    pub headers: SettingsMap<String>,
}

/// Credentials used when calling discovered services.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingAuthSettings {
    /// OAuth2 clients, by name.
    pub clients: SettingsMap<OutgoingAuthClient>,
    /// Static header sets, by name.
    pub headers: SettingsMap<OutgoingAuthHeaders>,
}

/// The `auth` section of a service's configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Token URL advertised in the OpenAPI client-credentials security scheme.
    #[serde(default)]
    pub swagger_token_url: String,
    /// Identity providers, by name.
    #[serde(default)]
    pub id_providers: SettingsMap<IdProvider>,
    /// Principals allowed to call this service.
    #[serde(default)]
    pub incoming: IncomingAuthSettings,
    /// Credentials for calling other services.
    #[serde(default)]
    pub outgoing: OutgoingAuthSettings,
}

// ============================================================================
// Service discovery
// ============================================================================

/// How a client authenticates to a discovered service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// No authentication.
    #[default]
    None,
    /// OAuth2 client credentials grant, see [`OutgoingAuthClient`].
    ClientCredentials,
    /// Static headers, see [`OutgoingAuthHeaders`].
    Headers,
}

/// An upstream service this service talks to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredService {
    /// Base URL prefixed to every request path.
    pub base_url: String,
    /// How to authenticate.
    #[serde(default)]
    pub auth_method: AuthMethod,
    /// Name of the outgoing client or header set used for auth.
    #[serde(default)]
    pub auth_principal: String,
    /// OAuth2 scope requested with client credentials.
    #[serde(default)]
    pub scope: Option<String>,
    /// Total request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Connect timeout, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: f64,
    /// Retries on connection failures.
    #[serde(default)]
    pub retries: u32,
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: SettingsMap<String>,
}

fn default_timeout() -> f64 {
    10.0
}

fn default_connect_timeout() -> f64 {
    5.0
}

impl DiscoveredService {
    /// A service reachable at `base_url` with default timeouts and no auth.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            auth_method: AuthMethod::None,
            auth_principal: String::new(),
            scope: None,
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: 0,
            headers: SettingsMap::new(),
        }
    }
}

/// The `discovery` section of a service's configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDiscoverySettings {
    /// Upstream services, by name.
    pub services: SettingsMap<DiscoveredService>,
}

// ============================================================================
// Logging
// ============================================================================

/// Level override for one log target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Target (module path) the level applies to.
    pub name: String,
    /// Level name, e.g. `"DEBUG"`.
    pub level: String,
}

/// The `logging` section of a service's configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Root level name.
    pub level: String,
    /// Line template, see [`crate::logging`].
    pub format: String,
    /// Per-target level overrides.
    pub loggers: Vec<LoggerSettings>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: DEFAULT_FORMAT.to_string(),
            loggers: Vec::new(),
        }
    }
}
