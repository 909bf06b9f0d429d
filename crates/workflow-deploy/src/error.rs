//! Error types for workflow-deploy.

use crate::types::{DeployStatus, HandlerErrorCode};

/// Result type alias using [`DeployError`].
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while driving a workflow deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Malformed or missing input field.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Network-level failure talking to the deployment service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The deployment service answered with an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The external job reached a terminal failure status.
    #[error("workflow {workflow} deployment failed with status {status}")]
    ExternalJobFailure {
        /// Workflow name from the resource model.
        workflow: String,
        /// Status reported by the service.
        status: DeployStatus,
    },

    /// The external job reported a status outside every known set.
    #[error("workflow {workflow} deployment reported unknown status {status}")]
    UnknownStatus {
        /// Workflow name from the resource model.
        workflow: String,
        /// Status reported by the service.
        status: DeployStatus,
    },

    /// Unexpected type or programming error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DeployError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a protocol error.
    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Handler error code reported to the orchestration platform.
    #[must_use]
    pub const fn error_code(&self) -> HandlerErrorCode {
        match self {
            Self::Validation(_) => HandlerErrorCode::InvalidRequest,
            Self::Transport(_) => HandlerErrorCode::NetworkFailure,
            Self::ExternalJobFailure { .. } => HandlerErrorCode::NotStabilized,
            Self::UnknownStatus { .. } => HandlerErrorCode::GeneralServiceException,
            Self::Protocol(_) | Self::Internal(_) | Self::Config(_) => {
                HandlerErrorCode::InternalFailure
            }
        }
    }

    /// Whether the platform may re-invoke the operation after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
