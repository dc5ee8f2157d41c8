//! HTTP client bound to one upstream service.

use std::time::Duration;

use backon::Retryable;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use nmtkit_core::retry::{RetryPolicy, retry_logger};
use nmtkit_core::settings::{DiscoveredService, SettingsMap};
use reqwest::{Method, RequestBuilder, Response};

use crate::error::{Error, Result};

/// A `reqwest` client whose request paths are relative to a service's base URL.
///
/// Requests that fail to connect are retried `retries` times with no delay.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    retries: u32,
}

impl ApiClient {
    /// Wrap an existing client.
    pub fn new<S: Into<String>>(base_url: S, http: reqwest::Client, retries: u32) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            retries,
        }
    }

    /// Build a client for `service` sending `headers` with every request.
    ///
    /// Uses the service's timeouts and keeps at most one idle connection.
    pub fn for_service(service: &DiscoveredService, headers: HeaderMap) -> Result<Self> {
        let http = http_client(service, headers)?;
        Ok(Self::new(&service.base_url, http, service.retries))
    }

    /// The service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Start a request to `path`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Start a GET request.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    /// Start a POST request.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    /// Start a PUT request.
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    /// Start a DELETE request.
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Send a request, retrying connection failures.
    ///
    /// Any HTTP status is a successful send; callers check it.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        let context = format!("{} {}", request.method(), request.url());
        let policy = RetryPolicy::fixed(self.retries as usize + 1, Duration::ZERO);

        (|| async {
            let attempt = request
                .try_clone()
                .ok_or_else(|| Error::UnclonableRequest(context.clone()))?;
            Ok::<_, Error>(self.http.execute(attempt).await?)
        })
        .retry(policy.backoff())
        .when(Error::is_connect)
        .notify(retry_logger(&context, &policy))
        .await
    }
}

/// Convert configured headers into a [`HeaderMap`].
pub fn header_map(headers: &SettingsMap<String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidHeader(name.clone()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidHeader(name.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// A `reqwest` client configured from `service` with default `headers`.
pub(crate) fn http_client(
    service: &DiscoveredService,
    headers: HeaderMap,
) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(seconds(service.timeout))
        .connect_timeout(seconds(service.connect_timeout))
        .pool_max_idle_per_host(1)
        .default_headers(headers)
        .build()?)
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://widgets:8000/", reqwest::Client::new(), 0);
        assert_eq!(client.url("/v1/widgets"), "http://widgets:8000/v1/widgets");
        assert_eq!(client.url("v1/widgets/3"), "http://widgets:8000/v1/widgets/3");
        assert_eq!(client.url(""), "http://widgets:8000/");
    }

    #[test]
    fn test_header_map_rejects_invalid_names() {
        let mut headers = SettingsMap::new();
        headers.insert("x-api-key".to_string(), "k".to_string());
        assert_eq!(header_map(&headers).unwrap().len(), 1);

        headers.insert("bad header".to_string(), "v".to_string());
        assert!(matches!(header_map(&headers), Err(Error::InvalidHeader(h)) if h == "bad header"));
    }

    #[tokio::test]
    async fn test_service_headers_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("x-tenant", "acme"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut service = DiscoveredService::new(server.uri());
        service.headers.insert("x-tenant".into(), "acme".into());
        let client = ApiClient::for_service(&service, header_map(&service.headers).unwrap())
            .unwrap();

        let response = client.send(client.get("/health")).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_error_statuses_are_returned() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), reqwest::Client::new(), 3);
        let response = client.send(client.delete("/v1/widgets/1")).await.unwrap();
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        // Nothing listens on the discard port.
        let client = ApiClient::new("http://127.0.0.1:9", reqwest::Client::new(), 1);
        let err = client.send(client.get("/")).await.unwrap_err();
        assert!(err.is_connect());
    }
}
