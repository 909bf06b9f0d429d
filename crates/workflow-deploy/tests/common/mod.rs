//! Common test utilities for controller integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use workflow_deploy::api::{router, AppState};
use workflow_deploy::stabilize::{BlockingStabilizer, ResumableStabilizer, StatusPolicy};
use workflow_deploy::{DeployService, LifecycleController, MockDeployService, Stabilizer};

/// Controller wired to a scripted deployment service.
pub struct TestController {
    pub service: Arc<MockDeployService>,
    pub app_state: AppState,
}

impl TestController {
    /// Resumable controller with a 20 second re-invocation delay.
    pub fn resumable(service: MockDeployService) -> Self {
        Self::with_stabilizer(
            service,
            Arc::new(ResumableStabilizer::new(StatusPolicy::default(), 20)),
        )
    }

    /// Blocking controller polling every 30 seconds.
    pub fn blocking(service: MockDeployService) -> Self {
        Self::with_stabilizer(
            service,
            Arc::new(BlockingStabilizer::new(
                StatusPolicy::default(),
                Duration::from_secs(30),
            )),
        )
    }

    fn with_stabilizer(service: MockDeployService, stabilizer: Arc<dyn Stabilizer>) -> Self {
        let service = Arc::new(service);
        let controller = LifecycleController::new(
            Arc::clone(&service) as Arc<dyn DeployService>,
            stabilizer,
        );

        Self {
            service,
            app_state: AppState {
                controller: Arc::new(controller),
                invocation_budget: Duration::from_secs(900),
            },
        }
    }

    /// POST an invocation and return the progress event.
    pub async fn invoke(&self, body: Value) -> Value {
        let response = router(self.app_state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/invoke")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}

/// Desired state used throughout the tests.
pub fn desired_state() -> Value {
    json!({
        "WorkflowName": "wf1",
        "S3TrainingDataPath": "s3://b/k",
        "TargetColumnName": "y",
        "NotificationEmail": "a@b.com"
    })
}
