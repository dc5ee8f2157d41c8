use backon::Retryable;
use nmtkit_core::UpstreamResponseError;
use nmtkit_core::retry::{RetryPolicy, retry_logger};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::schemas::{WidgetCreate, WidgetRead, WidgetZap, WidgetZapTask};
use crate::api_client::ApiClient;
use crate::error::{Error, Result};

/// Widget operations against the widgets API.
///
/// Each call is retried with [`RetryPolicy::REPOSITORY`] on transport errors
/// and upstream 5xx responses.
#[derive(Clone, Debug)]
pub struct WidgetApiRepository {
    client: ApiClient,
    retry: RetryPolicy,
}

impl WidgetApiRepository {
    /// Create a repository on a client for the widgets service.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            retry: RetryPolicy::REPOSITORY,
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a widget.
    pub async fn widget_create(&self, widget: &WidgetCreate) -> Result<WidgetRead> {
        log::debug!("Adding widget: {widget:?}");
        let created: WidgetRead = self
            .call("widget_create", StatusCode::CREATED, || {
                self.client.post("/v1/widgets").json(widget)
            })
            .await?;
        log::info!("Successfully created widget: {created:?}");
        Ok(created)
    }

    /// Fetch a widget by ID.
    pub async fn get_by_id(&self, widget_id: i64) -> Result<WidgetRead> {
        log::debug!("Fetching widget by ID: {widget_id}");
        let widget: WidgetRead = self
            .call("get_by_id", StatusCode::OK, || {
                self.client.get(&format!("/v1/widgets/{widget_id}"))
            })
            .await?;
        log::debug!("Retrieved widget: {widget:?}");
        Ok(widget)
    }

    /// Start a zap task on a widget.
    pub async fn widget_zap(&self, widget_id: i64, payload: &WidgetZap) -> Result<WidgetZapTask> {
        log::debug!("Zapping widget by ID: {widget_id}");
        let task: WidgetZapTask = self
            .call("widget_zap", StatusCode::ACCEPTED, || {
                self.client
                    .post(&format!("/v1/widgets/{widget_id}/zap"))
                    .json(payload)
            })
            .await?;
        log::debug!("Zapped widget: {task:?}");
        Ok(task)
    }

    /// Fetch the status of a zap task.
    pub async fn widget_zap_by_uuid(
        &self,
        widget_id: i64,
        task_uuid: &str,
    ) -> Result<WidgetZapTask> {
        log::debug!("Fetching zap task by UUID: {task_uuid}");
        let task: WidgetZapTask = self
            .call("widget_zap_by_uuid", StatusCode::OK, || {
                self.client
                    .get(&format!("/v1/widgets/{widget_id}/zap/{task_uuid}/status"))
            })
            .await?;
        log::debug!("Zap task status: {task:?}");
        Ok(task)
    }

    async fn call<T, F>(&self, context: &str, expected: StatusCode, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        (|| async {
            let response = self.client.send(build()).await?;
            let status = response.status();
            if status != expected {
                let headers = response.headers().clone();
                let body = response.text().await.unwrap_or_default();
                log::info!("{context} failed: {}: {body}", status.as_u16());
                return Err(Error::from(UpstreamResponseError::new(
                    status.as_u16(),
                    &headers,
                    body,
                )));
            }
            Ok::<T, Error>(response.json::<T>().await?)
        })
        .retry(self.retry.backoff())
        .when(Error::is_retryable)
        .notify(retry_logger(context, &self.retry))
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repository(server: &MockServer) -> WidgetApiRepository {
        let client = ApiClient::new(server.uri(), reqwest::Client::new(), 0);
        WidgetApiRepository::new(client).with_retry(RetryPolicy::fixed(3, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_widget_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/widgets"))
            .and(body_json(json!({
                "name": "sprocket", "height": "2cm", "mass": null, "force": null
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 7, "name": "sprocket", "height": "2cm"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let widget = WidgetCreate {
            height: Some("2cm".into()),
            ..WidgetCreate::named("sprocket")
        };
        let created = repository(&server).widget_create(&widget).await.unwrap();
        assert_eq!(created.id, 7);
        assert_eq!(created.height.as_deref(), Some("2cm"));
        assert_eq!(created.mass, None);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/widgets/404"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("x-request-id", "Rab12c")
                    .set_body_string("Widget not found"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = repository(&server).get_by_id(404).await.unwrap_err();
        let Error::Upstream(upstream) = err else {
            unreachable!("expected an upstream error");
        };
        assert_eq!(upstream.status_code, 404);
        assert_eq!(upstream.req_id, "Rab12c");
        assert_eq!(upstream.message, "Widget not found");
    }

    #[tokio::test]
    async fn test_widget_zap_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/widgets/3/zap"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/widgets/3/zap"))
            .and(body_json(json!({"duration": 10})))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "uuid": "5d3c", "state": "PENDING", "id": 3, "duration": 10, "runtime": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let task = repository(&server)
            .widget_zap(3, &WidgetZap::default())
            .await
            .unwrap();
        assert_eq!(task.state, "PENDING");
        assert_eq!(task.uuid, "5d3c");
    }

    #[tokio::test]
    async fn test_widget_zap_by_uuid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/widgets/3/zap/5d3c/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uuid": "5d3c", "id": 3, "duration": 10, "runtime": 4
            })))
            .expect(1)
            .mount(&server)
            .await;

        let task = repository(&server).widget_zap_by_uuid(3, "5d3c").await.unwrap();
        assert_eq!(task.state, "UNKNOWN");
        assert_eq!(task.runtime, 4);
    }

    #[tokio::test]
    async fn test_unexpected_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "x"})))
            .mount(&server)
            .await;

        let err = repository(&server)
            .widget_create(&WidgetCreate::named("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(ref e) if e.status_code == 200));
    }
}
