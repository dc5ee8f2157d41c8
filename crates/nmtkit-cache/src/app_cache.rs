//! Application cache over a key-value backend.
//!
//! Values at or above the compression threshold are stored zlib-compressed
//! behind the `zlib1:` header and decompressed transparently on fetch.
//!
//! ```rust
//! use std::sync::Arc;
//! use nmtkit_cache::{AppCache, AppCacheExt, KvAppCache, MemoryBackend};
//!
//! # async fn run() -> nmtkit_cache::Result<()> {
//! let cache = KvAppCache::new(Arc::new(MemoryBackend::new()), "widgets", 600);
//! cache.store_str("greeting", "hello", None).await?;
//! assert_eq!(cache.fetch("greeting").await?, Some(b"hello".to_vec()));
//! # Ok(()) }
//! ```

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use nmtkit_core::retry::{RetryPolicy, retry_logger};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::KvBackend;
use crate::error::{CacheError, Result};

/// Marker prefixed to compressed values.
pub const COMPRESSION_HEADER: &[u8] = b"zlib1:";

/// Default minimum size, in bytes, for a value to be compressed.
pub const DEFAULT_COMPRESS_THRESHOLD: usize = 4096;

/// Abstract application cache.
#[async_trait]
pub trait AppCache: Send + Sync {
    /// Store or replace `value` under `key`.
    ///
    /// A `ttl` of `None` or zero uses the cache's default TTL.
    async fn store(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Fetch the value under `key`; missing and empty values are `None`.
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove `key`; returns whether anything was removed.
    async fn clear(&self, key: &str) -> Result<bool>;
}

/// String and JSON helpers for every [`AppCache`].
#[async_trait]
pub trait AppCacheExt: AppCache {
    /// Store a UTF-8 string.
    async fn store_str(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.store(key, value.as_bytes(), ttl).await
    }

    /// Store a value as JSON.
    async fn store_json<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let bytes = serde_json::to_vec(value).inspect_err(|e| {
            log::error!("Failed to serialize value for key '{key}': {e}");
        })?;
        self.store(key, &bytes, ttl).await
    }

    /// Fetch and decode a JSON value.
    async fn fetch_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.fetch(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<C: AppCache + ?Sized> AppCacheExt for C {}

/// [`AppCache`] storing entries in a [`KvBackend`] under `app_cache_{name}_{key}`.
///
/// Every backend call is retried with [`RetryPolicy::STORAGE`].
pub struct KvAppCache {
    backend: Arc<dyn KvBackend>,
    name: String,
    default_ttl: Duration,
    compress_threshold: usize,
    retry: RetryPolicy,
}

impl KvAppCache {
    /// Create a cache named `name` whose entries live `default_ttl_secs` by default.
    pub fn new<S: Into<String>>(
        backend: Arc<dyn KvBackend>,
        name: S,
        default_ttl_secs: u64,
    ) -> Self {
        let cache = Self {
            backend,
            name: name.into(),
            default_ttl: Duration::from_secs(default_ttl_secs),
            compress_threshold: DEFAULT_COMPRESS_THRESHOLD,
            retry: RetryPolicy::STORAGE,
        };
        log::debug!(
            "Initialized app cache '{}' on {} backend with compression threshold of {} bytes",
            cache.name,
            cache.backend.name(),
            cache.compress_threshold
        );
        cache
    }

    /// Set the minimum size, in bytes, at which values are compressed.
    pub fn with_compress_threshold(mut self, compress_threshold: usize) -> Self {
        self.compress_threshold = compress_threshold;
        self
    }

    /// Set the retry policy for backend calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Key used in backend storage for `key`.
    pub fn storage_key(&self, key: &str) -> String {
        format!("app_cache_{}_{key}", self.name)
    }

    fn prepare(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < self.compress_threshold {
            log::debug!("Data below compression threshold, storing uncompressed");
            return Ok(data.to_vec());
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).map_err(CacheError::Compression)?;
        let compressed = encoder.finish().map_err(CacheError::Compression)?;
        log::debug!(
            "Compressed {} bytes to {} bytes (ratio: {:.1}x)",
            data.len(),
            compressed.len(),
            data.len() as f64 / compressed.len().max(1) as f64
        );

        let mut prepared = Vec::with_capacity(COMPRESSION_HEADER.len() + compressed.len());
        prepared.extend_from_slice(COMPRESSION_HEADER);
        prepared.extend_from_slice(&compressed);
        Ok(prepared)
    }

    fn restore(data: Vec<u8>) -> Result<Vec<u8>> {
        let Some(compressed) = data.strip_prefix(COMPRESSION_HEADER) else {
            return Ok(data);
        };

        let mut restored = Vec::new();
        ZlibDecoder::new(compressed)
            .read_to_end(&mut restored)
            .map_err(|e| {
                log::warn!("Decompression failed: {e}");
                CacheError::Compression(e)
            })?;
        Ok(restored)
    }
}

#[async_trait]
impl AppCache for KvAppCache {
    async fn store(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let ttl = ttl
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.default_ttl);
        log::debug!("Storing key '{key}' (TTL: {}s)", ttl.as_secs());

        let storage_key = self.storage_key(key);
        let prepared = self.prepare(value)?;

        (|| async {
            self.backend
                .put(&storage_key, prepared.clone(), Some(ttl))
                .await
        })
        .retry(self.retry.backoff())
        .when(CacheError::is_retryable)
        .notify(retry_logger("store_app_cache", &self.retry))
        .await
        .inspect_err(|e| log::error!("Failed to store value for key '{key}': {e}"))
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        log::debug!("Fetching data for key '{key}'");
        let storage_key = self.storage_key(key);

        let value = (|| async { self.backend.get(&storage_key).await })
            .retry(self.retry.backoff())
            .when(CacheError::is_retryable)
            .notify(retry_logger("fetch_app_cache", &self.retry))
            .await?;

        match value {
            Some(data) if !data.is_empty() => Self::restore(data).map(Some),
            _ => {
                log::warn!("No cache entry found for storage key '{storage_key}'");
                Ok(None)
            }
        }
    }

    async fn clear(&self, key: &str) -> Result<bool> {
        log::debug!("Clearing data for key '{key}'");
        let storage_key = self.storage_key(key);

        let removed = (|| async { self.backend.delete(&storage_key).await })
            .retry(self.retry.backoff())
            .when(CacheError::is_retryable)
            .notify(retry_logger("clear_app_cache", &self.retry))
            .await?;

        if !removed {
            log::warn!("Failed to delete storage key '{storage_key}'");
        }
        Ok(removed)
    }
}
