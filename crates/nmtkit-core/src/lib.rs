//! Core building blocks shared by the nmtkit crates.
//!
//! - [`settings`]: serde settings schemas and layered YAML configuration loading
//! - [`logging`]: subscriber setup with request-ID aware log lines
//! - [`request_id`]: task-local request correlation IDs
//! - [`retry`]: fixed-delay retry policies for `backon`, with logged attempts
//! - [`hash`]: HMAC and fingerprint hashes
//! - [`upstream`]: errors for failed upstream API calls
//! - [`Error`]: configuration and I/O errors

pub mod error;
pub mod hash;
pub mod logging;
pub mod request_id;
pub mod retry;
pub mod settings;
pub mod upstream;

pub use error::{Error, Result};
pub use request_id::{current_request_id, generate_request_id, scope_request_id};
pub use retry::RetryPolicy;
pub use upstream::{UpstreamApiError, UpstreamResponseError};
