//! Mapping from the resource model to the deployment service payload.

use serde::Serialize;

use crate::error::{DeployError, DeployResult};
use crate::types::{DeployId, ResourceModel};

/// Request body sent to the deployment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployPayload {
    /// Location of the training data.
    #[serde(rename = "S3TrainingDataPath")]
    pub s3_training_data_path: String,
    /// Column the model predicts.
    #[serde(rename = "TargetColumnName")]
    pub target_column_name: String,
    /// Address notified by the service.
    #[serde(rename = "NotificationEmail")]
    pub notification_email: String,
    /// Workflow name.
    #[serde(rename = "WorkflowName")]
    pub workflow_name: String,
    /// Job to resume, if one was already issued.
    #[serde(rename = "DeployId", skip_serializing_if = "Option::is_none")]
    pub deploy_id: Option<DeployId>,
}

/// Build the service payload for a model.
///
/// `DeployId` is included if and only if `deploy_id` is given.
pub fn to_external_payload(
    model: &ResourceModel,
    deploy_id: Option<&DeployId>,
) -> DeployResult<DeployPayload> {
    Ok(DeployPayload {
        s3_training_data_path: required(model.s3_training_data_path.as_deref(), "S3TrainingDataPath")?,
        target_column_name: required(model.target_column_name.as_deref(), "TargetColumnName")?,
        notification_email: required(model.notification_email.as_deref(), "NotificationEmail")?,
        workflow_name: required(model.workflow_name.as_deref(), "WorkflowName")?,
        deploy_id: deploy_id.cloned(),
    })
}

fn required(value: Option<&str>, field: &str) -> DeployResult<String> {
    value
        .map(str::to_owned)
        .ok_or_else(|| DeployError::validation(format!("missing required field {field}")))
}
