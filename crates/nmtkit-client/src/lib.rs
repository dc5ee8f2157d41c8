//! Clients for the upstream services an nmtkit service depends on.
//!
//! Provides:
//! - [`create_api_client`]: an [`ApiClient`] for a service in the discovery
//!   settings, authenticated with OAuth2 client credentials or static headers
//! - [`fetch_client_credentials_token`] / [`OAuthToken`]: token acquisition
//! - [`widgets`]: an example repository over the widgets API
//! - [`Error`]: client error types

pub mod api_client;
pub mod discovery;
mod error;
pub mod token;
pub mod widgets;

pub use api_client::ApiClient;
pub use discovery::{create_api_client, create_api_client_with_retry};
pub use error::{Error, Result};
pub use token::{OAuthToken, fetch_client_credentials_token};
