//! Metadata and results of long-running async tasks.
//!
//! A task's progress metadata lives under `md_{uuid}` and its outcome under
//! `result_{uuid}`. Fetching the result of a failed task returns its metadata
//! instead, so callers can still report how far it got.

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use nmtkit_core::retry::{RetryPolicy, retry_logger};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::KvBackend;
use crate::error::{CacheError, Result};

/// Default lifetime of task metadata (4 hours).
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(3600 * 4);

/// Final outcome of a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The task finished with this result.
    Success(Value),
    /// The task failed with this error message.
    Failure(String),
}

/// Task metadata and result storage over a [`KvBackend`].
#[derive(Clone)]
pub struct TaskStore {
    backend: Arc<dyn KvBackend>,
    retry: RetryPolicy,
}

impl TaskStore {
    /// Create a store on `backend`.
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::STORAGE,
        }
    }

    /// Store or replace the metadata for task `uuid`.
    ///
    /// `ttl` defaults to [`DEFAULT_METADATA_TTL`].
    pub async fn store_metadata(
        &self,
        uuid: &str,
        metadata: &Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(DEFAULT_METADATA_TTL);
        log::debug!("Updating metadata for task {uuid} (TTL: {}s) ...", ttl.as_secs());
        self.put(&metadata_key(uuid), serde_json::to_vec(metadata)?, ttl, "store_task_metadata")
            .await
    }

    /// Fetch the metadata for task `uuid`.
    pub async fn fetch_metadata(&self, uuid: &str) -> Result<Option<Value>> {
        log::debug!("Fetching metadata for task {uuid} ...");
        let key = metadata_key(uuid);
        let metadata = self.get_json::<Value>(&key, "fetch_task_metadata").await?;
        if metadata.is_none() {
            log::warn!("No metadata found for key {key}");
        }
        Ok(metadata)
    }

    /// Record the outcome of task `uuid`.
    ///
    /// `ttl` defaults to [`DEFAULT_METADATA_TTL`].
    pub async fn store_result(
        &self,
        uuid: &str,
        outcome: &TaskOutcome,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(DEFAULT_METADATA_TTL);
        self.put(&result_key(uuid), serde_json::to_vec(outcome)?, ttl, "store_task_result")
            .await
    }

    /// Fetch the result of task `uuid`.
    ///
    /// A failed task yields its metadata. `None` means the task has not finished.
    pub async fn fetch_result(&self, uuid: &str) -> Result<Option<Value>> {
        log::debug!("Fetching result for task {uuid} ...");
        let outcome = self
            .get_json::<TaskOutcome>(&result_key(uuid), "fetch_task_result")
            .await?;

        match outcome {
            Some(TaskOutcome::Success(value)) => Ok(Some(value)),
            Some(TaskOutcome::Failure(error)) => {
                let metadata = self.fetch_metadata(uuid).await?;
                log::warn!(
                    "Result for task {uuid} is an exception ({error})! \
                     Returning metadata instead: {metadata:?}"
                );
                Ok(metadata)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration, context: &str) -> Result<()> {
        (|| async { self.backend.put(key, value.clone(), Some(ttl)).await })
            .retry(self.retry.backoff())
            .when(CacheError::is_retryable)
            .notify(retry_logger(context, &self.retry))
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        context: &str,
    ) -> Result<Option<T>> {
        let bytes = (|| async { self.backend.get(key).await })
            .retry(self.retry.backoff())
            .when(CacheError::is_retryable)
            .notify(retry_logger(context, &self.retry))
            .await?;

        match bytes {
            Some(bytes) if !bytes.is_empty() => Ok(Some(serde_json::from_slice(&bytes)?)),
            _ => Ok(None),
        }
    }
}

fn metadata_key(uuid: &str) -> String {
    format!("md_{uuid}")
}

fn result_key(uuid: &str) -> String {
    format!("result_{uuid}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    const UUID: &str = "0f8e4b1c-6d0c-4f59-9d4e-3f1b2f6c7a10";

    fn store() -> (Arc<MemoryBackend>, TaskStore) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), TaskStore::new(backend))
    }

    #[tokio::test]
    async fn test_metadata_roundtrip() {
        let (backend, tasks) = store();
        let metadata = json!({"uuid": UUID, "state": "RUNNING", "id": 3});
        tasks.store_metadata(UUID, &metadata, None).await.unwrap();

        assert!(backend.get(&format!("md_{UUID}")).await.unwrap().is_some());
        assert_eq!(tasks.fetch_metadata(UUID).await.unwrap(), Some(metadata));
    }

    #[tokio::test]
    async fn test_missing_metadata() {
        let (_, tasks) = store();
        assert_eq!(tasks.fetch_metadata(UUID).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_expires_after_default_ttl() {
        let (_, tasks) = store();
        tasks.store_metadata(UUID, &json!({"state": "PENDING"}), None).await.unwrap();
        tokio::time::advance(DEFAULT_METADATA_TTL + Duration::from_secs(1)).await;
        assert_eq!(tasks.fetch_metadata(UUID).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_successful_result() {
        let (_, tasks) = store();
        let outcome = TaskOutcome::Success(json!({"state": "SUCCESS", "runtime": 10}));
        tasks.store_result(UUID, &outcome, None).await.unwrap();
        assert_eq!(
            tasks.fetch_result(UUID).await.unwrap(),
            Some(json!({"state": "SUCCESS", "runtime": 10}))
        );
    }

    #[tokio::test]
    async fn test_failed_result_returns_metadata() {
        let (_, tasks) = store();
        let metadata = json!({"state": "FAILURE", "id": 3});
        tasks.store_metadata(UUID, &metadata, None).await.unwrap();
        tasks
            .store_result(UUID, &TaskOutcome::Failure("zap overheated".into()), None)
            .await
            .unwrap();
        assert_eq!(tasks.fetch_result(UUID).await.unwrap(), Some(metadata));
    }

    #[tokio::test]
    async fn test_unfinished_task() {
        let (_, tasks) = store();
        assert_eq!(tasks.fetch_result(UUID).await.unwrap(), None);
    }

    #[test]
    fn test_outcome_wire_format() {
        let encoded = serde_json::to_value(TaskOutcome::Failure("boom".into())).unwrap();
        assert_eq!(encoded, json!({"status": "failure", "data": "boom"}));
    }
}
