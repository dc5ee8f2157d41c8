//! Application cache and async task storage for nmtkit services.
//!
//! Provides:
//! - [`KvBackend`]: key-value storage trait, with [`MemoryBackend`] and
//!   `RedisBackend` (feature `redis`)
//! - [`AppCache`] / [`AppCacheExt`]: the application cache interface
//! - [`KvAppCache`]: app cache with size-triggered zlib compression
//! - [`TaskStore`]: metadata and results of long-running tasks
//! - [`CacheError`]: cache error types

pub mod app_cache;
pub mod backend;
mod error;
#[cfg(feature = "redis")]
pub mod redis_backend;
pub mod tasks;

pub use app_cache::{AppCache, AppCacheExt, KvAppCache};
pub use backend::{KvBackend, MemoryBackend};
pub use error::{CacheError, Result};
#[cfg(feature = "redis")]
pub use redis_backend::RedisBackend;
pub use tasks::{TaskOutcome, TaskStore};
