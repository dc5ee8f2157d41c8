//! Retry policies and retry logging for [`backon`].
//!
//! ```rust,no_run
//! use backon::Retryable;
//! use nmtkit_core::retry::{RetryPolicy, retry_logger};
//!
//! # async fn fetch() -> Result<String, std::io::Error> { Ok(String::new()) }
//! # async fn run() -> Result<(), std::io::Error> {
//! let policy = RetryPolicy::REPOSITORY;
//! let body = fetch
//!     .retry(policy.backoff())
//!     .notify(retry_logger("fetch widgets", &policy))
//!     .await?;
//! # Ok(()) }
//! ```

use std::fmt;
use std::time::Duration;

use backon::ConstantBuilder;

/// Fixed-delay retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of calls, including the first one. Never less than 1.
    pub attempts: usize,
    /// Delay between calls.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Cache and key-value storage operations.
    pub const STORAGE: RetryPolicy = RetryPolicy::fixed(5, Duration::from_millis(1));

    /// Repository calls to upstream APIs.
    pub const REPOSITORY: RetryPolicy = RetryPolicy::fixed(5, Duration::from_millis(200));

    /// Building clients for discovered services at startup.
    pub const DISCOVERY: RetryPolicy = RetryPolicy::fixed(20, Duration::from_secs(15));

    /// A single attempt, no retries.
    pub const NONE: RetryPolicy = RetryPolicy::fixed(1, Duration::ZERO);

    /// Create a fixed-delay policy.
    pub const fn fixed(attempts: usize, delay: Duration) -> Self {
        let attempts = if attempts == 0 { 1 } else { attempts };
        Self { attempts, delay }
    }

    /// Number of retries after the first call.
    pub fn retries(&self) -> usize {
        self.attempts.saturating_sub(1)
    }

    /// Backoff builder implementing this policy.
    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.retries())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::STORAGE
    }
}

/// Build a `notify` callback that logs each retry at WARN.
///
/// Logged as `Retry {n} of {max}: while executing {context}, an error occurred: {err}`.
pub fn retry_logger<E: fmt::Display>(
    context: &str,
    policy: &RetryPolicy,
) -> impl FnMut(&E, Duration) + use<E> {
    let context = context.to_string();
    let max = policy.attempts;
    let mut attempt = 0usize;

    move |err: &E, delay: Duration| {
        attempt += 1;
        log::warn!("{}", retry_message(attempt, max, &context, err, delay));
    }
}

fn retry_message(
    attempt: usize,
    max: usize,
    context: &str,
    err: &dyn fmt::Display,
    delay: Duration,
) -> String {
    format!(
        "Retry {attempt} of {max}: while executing {context}, an error occurred: {err} \
         (next attempt in {delay:?})"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use backon::Retryable;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_policy_retries() {
        assert_eq!(RetryPolicy::STORAGE.retries(), 4);
        assert_eq!(RetryPolicy::DISCOVERY.retries(), 19);
        assert_eq!(RetryPolicy::NONE.retries(), 0);
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).attempts, 1);
    }

    #[test]
    fn test_retry_message() {
        let msg = retry_message(2, 5, "store_app_cache", &"connection reset", Duration::ZERO);
        assert!(msg.starts_with("Retry 2 of 5: while executing store_app_cache"));
        assert!(msg.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_backoff_stops_after_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let counter = calls.clone();
        let result: Result<(), String> = (move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            }
        })
        .retry(policy.backoff())
        .notify(retry_logger("always failing", &policy))
        .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_backoff_returns_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));

        let counter = calls.clone();
        let result: Result<usize, String> = (move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 { Err(format!("attempt {n}")) } else { Ok(n) }
            }
        })
        .retry(policy.backoff())
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
