//! nmtkit microservice toolkit, umbrella crate.
//!
//! Re-exports the nmtkit components. Use feature flags to enable them.

#![doc = include_str!("../README.md")]

pub use nmtkit_core as core;

#[cfg(feature = "auth")]
pub use nmtkit_auth as auth;

#[cfg(feature = "middleware")]
pub use nmtkit_middleware as middleware;

#[cfg(feature = "cache")]
pub use nmtkit_cache as cache;

#[cfg(feature = "client")]
pub use nmtkit_client as client;
