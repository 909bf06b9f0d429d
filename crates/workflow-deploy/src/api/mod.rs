//! HTTP API for the controller service.
//!
//! Provides endpoints for:
//! - Handler invocations from the orchestration platform
//! - Health checks

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use crate::controller::LifecycleController;
use crate::types::{HandlerErrorCode, HandlerRequest, ProgressEvent, TYPE_NAME};

/// Shared application state for the controller service.
#[derive(Clone)]
pub struct AppState {
    /// Controller handling invocations.
    pub controller: Arc<LifecycleController>,
    /// Wall-clock budget for one invocation.
    pub invocation_budget: Duration,
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/invoke", post(invoke))
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    resource_type: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        resource_type: TYPE_NAME,
    })
}

/// Run one handler invocation.
///
/// Always answers 200: failures are reported inside the progress event. An
/// invocation that outlives the budget is abandoned and reported as failed.
async fn invoke(
    State(state): State<AppState>,
    Json(request): Json<HandlerRequest>,
) -> Json<ProgressEvent> {
    let action = request.action;
    let budget = state.invocation_budget;

    match tokio::time::timeout(budget, state.controller.invoke(request)).await {
        Ok(event) => Json(event),
        Err(_) => {
            warn!(action = %action, budget = ?budget, "invocation exceeded its budget");
            Json(ProgressEvent::failed(
                None,
                HandlerErrorCode::NotStabilized,
                format!("{action} did not finish within {}s", budget.as_secs()),
            ))
        }
    }
}
