//! HTTP client for the deployment service API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::{DeployError, DeployResult};
use crate::translate::DeployPayload;
use crate::types::ExternalJob;

use super::{parse_job, DeployService};

/// HTTP client for the deployment service.
#[derive(Debug, Clone)]
pub struct HttpDeployClient {
    client: Client,
    endpoint: String,
}

impl HttpDeployClient {
    /// Create a new client from configuration.
    pub fn new(config: &ServiceConfig) -> DeployResult<Self> {
        Self::build(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    /// Create a new client for a custom endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> DeployResult<Self> {
        Self::build(&endpoint.into(), Duration::from_secs(30))
    }

    fn build(endpoint: &str, timeout: Duration) -> DeployResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(DeployError::Transport)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }

    /// The resource endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeployService for HttpDeployClient {
    async fn submit(&self, payload: &DeployPayload) -> DeployResult<ExternalJob> {
        debug!(
            workflow = %payload.workflow_name,
            deploy_id = ?payload.deploy_id,
            "submitting deployment"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(DeployError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(DeployError::Transport)?;

        if !status.is_success() {
            return Err(DeployError::protocol(format!(
                "deployment service returned {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        parse_job(&body)
    }

    async fn delete(&self, payload: &DeployPayload) -> DeployResult<()> {
        debug!(workflow = %payload.workflow_name, "deleting deployment");

        let response = self
            .client
            .delete(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(DeployError::Transport)?;

        if !response.status().is_success() {
            warn!(
                workflow = %payload.workflow_name,
                status = %response.status(),
                "deployment service rejected delete"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{header, HeaderMap, Method, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::types::DeployId;

    /// A request seen by the stub service.
    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        accept: Option<String>,
        body: Value,
    }

    #[derive(Clone)]
    struct Stub {
        reply: (StatusCode, &'static str),
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    async fn record(
        State(stub): State<Stub>,
        method: Method,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, &'static str) {
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        stub.seen.lock().unwrap().push(Seen {
            method,
            accept,
            body,
        });
        stub.reply
    }

    /// Serve a canned reply on a local port; returns the endpoint and the
    /// requests received.
    async fn serve_stub(status: StatusCode, body: &'static str) -> (String, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/resource", post(record).delete(record))
            .with_state(Stub {
                reply: (status, body),
                seen: Arc::clone(&seen),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/v1/resource"), seen)
    }

    fn payload(deploy_id: Option<&str>) -> DeployPayload {
        DeployPayload {
            s3_training_data_path: "s3://b/k".to_owned(),
            target_column_name: "y".to_owned(),
            notification_email: "a@b.com".to_owned(),
            workflow_name: "wf1".to_owned(),
            deploy_id: deploy_id.map(DeployId::new),
        }
    }

    fn keys(body: &Value) -> Vec<&str> {
        let mut keys: Vec<_> = body
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn client_creation() {
        let config = ServiceConfig::default();
        let client = HttpDeployClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "https://cd4automl.vtion.ai/v1/resource");
    }

    #[test]
    fn client_with_endpoint_trims_slash() {
        let client = HttpDeployClient::with_endpoint("http://localhost:4000/v1/resource/").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:4000/v1/resource");
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let client = HttpDeployClient::with_endpoint("http://127.0.0.1:1/v1/resource").unwrap();

        let err = client.submit(&payload(None)).await.unwrap_err();
        assert!(matches!(err, DeployError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn submit_posts_payload_accepting_json() {
        let (endpoint, seen) =
            serve_stub(StatusCode::OK, r#"{"DeployStatus": "IN_PROGRESS", "DeployId": "d-1"}"#).await;
        let client = HttpDeployClient::with_endpoint(endpoint).unwrap();

        let job = client.submit(&payload(None)).await.unwrap();
        assert!(job.status.is_in_progress());
        assert_eq!(job.deploy_id, Some(DeployId::new("d-1")));

        client.submit(&payload(Some("d-1"))).await.unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].accept.as_deref(), Some("application/json"));
        assert_eq!(
            keys(&seen[0].body),
            [
                "NotificationEmail",
                "S3TrainingDataPath",
                "TargetColumnName",
                "WorkflowName"
            ]
        );
        assert_eq!(seen[0].body["S3TrainingDataPath"], "s3://b/k");
        assert_eq!(seen[1].body["DeployId"], "d-1");
        assert_eq!(keys(&seen[1].body).len(), 5);
    }

    #[tokio::test]
    async fn submit_reads_api_uri() {
        let (endpoint, _) = serve_stub(
            StatusCode::OK,
            r#"{"DeployStatus": "SUCCESS", "DeployId": "d-1", "ApiUri": "https://api/wf1"}"#,
        )
        .await;
        let client = HttpDeployClient::with_endpoint(endpoint).unwrap();

        let job = client.submit(&payload(Some("d-1"))).await.unwrap();
        assert_eq!(job.status.as_str(), "SUCCESS");
        assert_eq!(job.api_uri.as_deref(), Some("https://api/wf1"));
    }

    #[rstest]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, r#"{"DeployStatus": "SUCCESS"}"#)]
    #[case(StatusCode::BAD_REQUEST, "bad request")]
    #[case(StatusCode::OK, "not json")]
    #[case(StatusCode::OK, r#"{"DeployId": "d-1"}"#)]
    #[tokio::test]
    async fn submit_rejects_unusable_reply(#[case] status: StatusCode, #[case] body: &'static str) {
        let (endpoint, _) = serve_stub(status, body).await;
        let client = HttpDeployClient::with_endpoint(endpoint).unwrap();

        let err = client.submit(&payload(None)).await.unwrap_err();
        assert!(matches!(err, DeployError::Protocol(_)), "{err}");
        assert!(!err.is_retryable());
    }

    #[rstest]
    #[case(StatusCode::OK, "not json")]
    #[case(StatusCode::NO_CONTENT, "")]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, "boom")]
    #[case(StatusCode::NOT_FOUND, r#"{"DeployStatus": "FAILED"}"#)]
    #[tokio::test]
    async fn delete_ignores_reply(#[case] status: StatusCode, #[case] body: &'static str) {
        let (endpoint, seen) = serve_stub(status, body).await;
        let client = HttpDeployClient::with_endpoint(endpoint).unwrap();

        client.delete(&payload(None)).await.unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::DELETE);
        assert_eq!(seen[0].accept.as_deref(), Some("application/json"));
        assert_eq!(seen[0].body["WorkflowName"], "wf1");
        assert!(seen[0].body.get("DeployId").is_none());
    }
}
