//! Error types for nmtkit-cache.

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors from cache backends and cache encoding.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The storage backend failed.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Redis command or connection failure.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Compressed data could not be encoded or decoded.
    #[error("compression error: {0}")]
    Compression(#[source] std::io::Error),

    /// A value could not be (de)serialized as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Creates a new backend error.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        CacheError::Backend(message.into())
    }

    /// Whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::Backend(_) => true,
            #[cfg(feature = "redis")]
            CacheError::Redis(_) => true,
            CacheError::Compression(_) | CacheError::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(CacheError::backend("connection reset").is_retryable());
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!CacheError::from(json_err).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt deflate stream");
        assert!(!CacheError::Compression(io).is_retryable());
    }
}
