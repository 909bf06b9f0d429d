//! Core types for workflow-deploy.
//!
//! Field names follow the two wire contracts this crate sits between: the
//! deployment service (`PascalCase` payload keys) and the orchestration
//! platform (`camelCase` progress events).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};

/// Resource type handled by this controller.
pub const TYPE_NAME: &str = "CD4AutoML::Workflow::Deploy";

/// Identifier of an external deployment job, issued by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployId(String);

impl DeployId {
    /// Create a deploy ID from a service-issued value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeployId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status as reported by the deployment service.
///
/// Kept as an open string: the service may report values this crate does not
/// know about, and classification happens in the stabilization engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployStatus(String);

impl DeployStatus {
    /// The job is still running.
    pub const IN_PROGRESS: &'static str = "IN_PROGRESS";

    /// Statuses from which the job never recovers.
    pub const TERMINAL_FAILURES: [&'static str; 4] = ["FAILED", "FAULT", "STOPPED", "TIMED_OUT"];

    /// Create a status from a raw service value.
    #[must_use]
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Get the status as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the job is still running.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.0 == Self::IN_PROGRESS
    }

    /// Returns true if the status is one of the terminal failures.
    #[must_use]
    pub fn is_terminal_failure(&self) -> bool {
        Self::TERMINAL_FAILURES.iter().any(|s| *s == self.0)
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Desired state of a workflow deployment resource.
///
/// Every field is optional on the wire; required inputs are checked when the
/// service payload is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceModel {
    /// Location of the training data.
    #[serde(rename = "S3TrainingDataPath", default, skip_serializing_if = "Option::is_none")]
    pub s3_training_data_path: Option<String>,
    /// Column the model predicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_column_name: Option<String>,
    /// Address notified by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
    /// Workflow name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    /// Output: inference endpoint, set once the deployment succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_api: Option<String>,
}

impl ResourceModel {
    /// Convert a raw desired-state document into a model.
    ///
    /// A missing document is a validation error. A document whose fields
    /// have the wrong JSON type is an internal failure: the platform
    /// guarantees the schema.
    pub fn from_value(value: serde_json::Value) -> DeployResult<Self> {
        if value.is_null() {
            return Err(DeployError::validation("missing desiredResourceState"));
        }
        serde_json::from_value(value)
            .map_err(|e| DeployError::internal(format!("was not expecting type: {e}")))
    }

    /// Workflow name for log and error messages.
    #[must_use]
    pub fn workflow_label(&self) -> &str {
        self.workflow_name.as_deref().unwrap_or("<unnamed>")
    }
}

/// External-service view of a deployment job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalJob {
    /// Service-issued job identifier.
    #[serde(rename = "DeployId", default)]
    pub deploy_id: Option<DeployId>,
    /// Current job status.
    #[serde(rename = "DeployStatus")]
    pub status: DeployStatus,
    /// Inference endpoint, present once the job is usable.
    #[serde(rename = "ApiUri", default)]
    pub api_uri: Option<String>,
}

/// State carried between invocations of the same logical operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackContext {
    /// Job to resume, once the service has issued one.
    #[serde(rename = "DEPLOY_ID", default, skip_serializing_if = "Option::is_none")]
    pub deploy_id: Option<DeployId>,
}

impl CallbackContext {
    /// Context for resuming the given job.
    #[must_use]
    pub const fn resuming(deploy_id: DeployId) -> Self {
        Self {
            deploy_id: Some(deploy_id),
        }
    }
}

/// Lifecycle action requested by the orchestration platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Create the deployment.
    Create,
    /// Update the deployment.
    Update,
    /// Delete the deployment.
    Delete,
    /// Read the current state.
    Read,
    /// List known deployments.
    List,
}

impl Action {
    /// Get the action name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Read => "READ",
            Self::List => "LIST",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outward lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    /// Re-invoke later with the returned context.
    InProgress,
    /// The operation finished.
    Success,
    /// The operation failed.
    Failed,
}

/// Failure category reported to the orchestration platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerErrorCode {
    /// Input fields were missing or malformed.
    InvalidRequest,
    /// Unexpected failure inside the controller.
    InternalFailure,
    /// The deployment service could not be reached.
    NetworkFailure,
    /// The external job ended in a failure status.
    NotStabilized,
    /// The deployment service reported something the controller cannot classify.
    GeneralServiceException,
}

/// Progress report returned for every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Lifecycle status.
    pub status: OperationStatus,
    /// Current resource model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_model: Option<ResourceModel>,
    /// Models returned by LIST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_models: Option<Vec<ResourceModel>>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<HandlerErrorCode>,
    /// Suggested delay before re-invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_delay_seconds: Option<u64>,
    /// Context to echo back on re-invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_context: Option<CallbackContext>,
}

impl ProgressEvent {
    /// The operation is still running.
    #[must_use]
    pub const fn in_progress(
        model: ResourceModel,
        context: CallbackContext,
        delay_secs: u64,
    ) -> Self {
        Self {
            status: OperationStatus::InProgress,
            resource_model: Some(model),
            resource_models: None,
            message: None,
            error_code: None,
            callback_delay_seconds: Some(delay_secs),
            callback_context: Some(context),
        }
    }

    /// The operation finished.
    #[must_use]
    pub const fn success(model: ResourceModel) -> Self {
        Self {
            status: OperationStatus::Success,
            resource_model: Some(model),
            resource_models: None,
            message: None,
            error_code: None,
            callback_delay_seconds: None,
            callback_context: None,
        }
    }

    /// LIST result.
    #[must_use]
    pub const fn listed(models: Vec<ResourceModel>) -> Self {
        Self {
            status: OperationStatus::Success,
            resource_model: None,
            resource_models: Some(models),
            message: None,
            error_code: None,
            callback_delay_seconds: None,
            callback_context: None,
        }
    }

    /// The operation failed.
    #[must_use]
    pub fn failed(
        model: Option<ResourceModel>,
        code: HandlerErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: OperationStatus::Failed,
            resource_model: model,
            resource_models: None,
            message: Some(message.into()),
            error_code: Some(code),
            callback_delay_seconds: None,
            callback_context: None,
        }
    }

    /// Attach a context the caller can retry with.
    #[must_use]
    pub fn with_context(mut self, context: CallbackContext) -> Self {
        self.callback_context = Some(context);
        self
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns true if the platform should stop re-invoking.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self.status, OperationStatus::InProgress)
    }
}

/// Invocation from the orchestration platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRequest {
    /// Requested lifecycle action.
    pub action: Action,
    /// Desired resource state, converted by the controller.
    #[serde(default)]
    pub desired_resource_state: serde_json::Value,
    /// Context returned by the previous invocation, if any.
    #[serde(default)]
    pub callback_context: Option<CallbackContext>,
    /// Platform token for correlating retries of one request.
    #[serde(default)]
    pub client_request_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_model_uses_service_field_names() {
        let model: ResourceModel = serde_json::from_str(
            r#"{
                "S3TrainingDataPath": "s3://b/k",
                "TargetColumnName": "y",
                "NotificationEmail": "a@b.com",
                "WorkflowName": "wf1"
            }"#,
        )
        .unwrap();

        assert_eq!(model.s3_training_data_path.as_deref(), Some("s3://b/k"));
        assert_eq!(model.workflow_label(), "wf1");
        assert!(model.inference_api.is_none());

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["TargetColumnName"], "y");
        assert!(json.get("InferenceApi").is_none());
    }

    #[test]
    fn type_mismatch_is_internal_failure() {
        let err = ResourceModel::from_value(serde_json::json!({ "WorkflowName": 42 })).unwrap_err();
        assert!(matches!(err, DeployError::Internal(_)));
        assert!(err.to_string().contains("was not expecting type"));
    }

    #[test]
    fn missing_state_is_validation_error() {
        let err = ResourceModel::from_value(serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
    }

    #[test]
    fn status_classification() {
        assert!(DeployStatus::new("IN_PROGRESS").is_in_progress());
        for status in DeployStatus::TERMINAL_FAILURES {
            assert!(DeployStatus::new(status).is_terminal_failure());
        }
        assert!(!DeployStatus::new("SUCCESS").is_terminal_failure());
        assert!(!DeployStatus::new("failed").is_terminal_failure());
    }

    #[test]
    fn callback_context_uses_platform_key() {
        let context = CallbackContext::resuming(DeployId::new("d-1"));
        let json = serde_json::to_string(&context).unwrap();
        assert_eq!(json, r#"{"DEPLOY_ID":"d-1"}"#);

        let empty: CallbackContext = serde_json::from_str("{}").unwrap();
        assert!(empty.deploy_id.is_none());
    }

    #[test]
    fn progress_event_wire_shape() {
        let event = ProgressEvent::in_progress(
            ResourceModel::default(),
            CallbackContext::resuming(DeployId::new("d-1")),
            20,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["callbackDelaySeconds"], 20);
        assert_eq!(json["callbackContext"]["DEPLOY_ID"], "d-1");
        assert!(json.get("errorCode").is_none());
        assert!(!event.is_terminal());

        let failed = ProgressEvent::failed(None, HandlerErrorCode::NotStabilized, "boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["errorCode"], "NotStabilized");
        assert!(failed.is_terminal());

        let retryable = failed.with_context(CallbackContext::resuming(DeployId::new("d-1")));
        let json = serde_json::to_value(&retryable).unwrap();
        assert_eq!(json["callbackContext"]["DEPLOY_ID"], "d-1");
    }

    #[test]
    fn handler_request_defaults() {
        let request: HandlerRequest =
            serde_json::from_str(r#"{"action": "LIST"}"#).unwrap();
        assert_eq!(request.action, Action::List);
        assert!(request.callback_context.is_none());
        assert!(request.desired_resource_state.is_null());
    }
}
