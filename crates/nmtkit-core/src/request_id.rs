//! Per-request correlation IDs.
//!
//! The request-ID middleware runs each request inside [`scope_request_id`];
//! anything executing in that task (handlers, logging) can read the ID back
//! with [`current_request_id`].

use std::future::Future;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Generate a short request ID: `R` followed by five hex characters.
///
/// Short IDs only need to stay unique across the log lines of a burst of requests.
pub fn generate_request_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("R{}", &hex[..5])
}

/// Run `future` with `request_id` as the current request ID.
pub async fn scope_request_id<F>(request_id: String, future: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(request_id, future).await
}

/// The current request ID, if running inside [`scope_request_id`].
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}
