//! Redis key-value backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::backend::KvBackend;
use crate::error::Result;

/// Redis backend using a reconnecting connection manager.
///
/// Every key is stored with `prefix` prepended, so several services can share
/// one database.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisBackend {
    /// Connect to the Redis server at `url`.
    pub async fn connect<S: Into<String>>(url: &str, prefix: S) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let prefix = prefix.into();
        log::info!("Connected Redis cache backend (prefix '{prefix}')");
        Ok(Self::new(conn, prefix))
    }

    /// Wrap an existing connection manager.
    pub fn new<S: Into<String>>(conn: ConnectionManager, prefix: S) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        prefixed_key(&self.prefix, key)
    }
}

fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

/// Whole seconds for `SET ... EX`, which rejects zero.
fn expiry_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, expiry_seconds(ttl)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(self.key(key)).await?;
        Ok(removed > 0)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        assert_eq!(prefixed_key("widgets:", "app_cache_x_y"), "widgets:app_cache_x_y");
        assert_eq!(prefixed_key("", "md_1"), "md_1");
    }

    #[test]
    fn test_expiry_seconds() {
        assert_eq!(expiry_seconds(Duration::from_millis(10)), 1);
        assert_eq!(expiry_seconds(Duration::from_secs(600)), 600);
    }

    // Requires a running Redis server.
    // Run with: cargo test -p nmtkit-cache -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_redis_roundtrip() {
        let backend = RedisBackend::connect("redis://localhost:6379", "nmtkit-test:")
            .await
            .unwrap();
        backend
            .put("k", b"v".to_vec(), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(backend.delete("k").await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), None);
    }
}
