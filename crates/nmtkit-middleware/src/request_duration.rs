//! Request duration logging layer.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::response::IntoResponse;
use http::{HeaderValue, Request};
use tower::{Layer, Service};

/// Response header carrying the processing time in milliseconds.
pub const PROCESS_TIME_HEADER: &str = "x-process-time-milliseconds";

/// Tower `Layer` that measures and logs how long each request takes.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestDurationLayer;

impl RequestDurationLayer {
    /// Create the layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestDurationLayer {
    type Service = RequestDurationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestDurationService { inner }
    }
}

/// Tower `Service` logging `{METHOD} {path} - {ms}ms` at INFO for each request.
#[derive(Clone, Debug)]
pub struct RequestDurationService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestDurationService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        Box::pin(async move {
            let start = Instant::now();
            let resp = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {});
            let mut resp = resp.into_response();

            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            log::info!("{}", duration_message(method.as_str(), &path, elapsed_ms));

            if let Ok(value) = HeaderValue::from_str(&elapsed_ms.to_string()) {
                resp.headers_mut().insert(PROCESS_TIME_HEADER, value);
            }
            Ok(resp)
        })
    }
}

fn duration_message(method: &str, path: &str, elapsed_ms: f64) -> String {
    format!("{method} {path} - {elapsed_ms:.2}ms")
}
