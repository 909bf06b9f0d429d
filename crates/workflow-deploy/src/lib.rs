//! Workflow Deploy
//!
//! Lifecycle controller for AutoML workflow deployments. Given the desired
//! state of a deployment resource (training data location, target column,
//! notification address, workflow name), it drives an asynchronous external
//! deployment service to create, update or delete the job, and reports
//! progress back to the orchestration platform until the job is terminal.
//!
//! # Architecture
//!
//! ```text
//! LifecycleController ──▶ translate ──▶ DeployService ──▶ ExternalJob
//!          ▲                                                   │
//!          └──────────── ProgressEvent ◀── Stabilizer ◀────────┘
//! ```
//!
//! - [`translate`]: resource model to service payload
//! - [`client`]: the [`DeployService`] seam and its HTTP implementation
//! - [`stabilize`]: status classification and the two waiting strategies
//! - [`controller`]: per-action dispatch and progress reporting
//!
//! # Waiting strategies
//!
//! Jobs outlive a single invocation, so the caller picks how to wait:
//!
//! - [`WaitStrategy::Resumable`] submits once per invocation and returns
//!   `IN_PROGRESS` with a [`CallbackContext`] holding the `DeployId`.
//! - [`WaitStrategy::Blocking`] polls inside the invocation until the job is
//!   terminal.
//!
//! There is no default: the strategy must be configured explicitly.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use workflow_deploy::{
//!     CallbackContext, LifecycleController, MockDeployService, ResourceModel,
//!     stabilize::{ResumableStabilizer, StatusPolicy},
//! };
//!
//! let service = Arc::new(MockDeployService::with_statuses(["IN_PROGRESS", "SUCCESS"]));
//! let stabilizer = Arc::new(ResumableStabilizer::new(StatusPolicy::default(), 20));
//! let controller = LifecycleController::new(service, stabilizer);
//!
//! let first = controller.create(model.clone(), CallbackContext::default()).await;
//! let done = controller.create(model, first.callback_context.unwrap()).await;
//! ```

#![forbid(unsafe_code)]

pub mod api;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod service;
pub mod stabilize;
pub mod strategy;
pub mod translate;
pub mod types;

// Re-export commonly used types at the crate root
pub use client::{DeployService, HttpDeployClient, MockDeployService};
pub use config::DeployConfig;
pub use controller::LifecycleController;
pub use error::{DeployError, DeployResult};
pub use service::HandlerService;
pub use stabilize::{create_stabilizer, Decision, Outcome, Stabilizer};
pub use strategy::{UnknownStatusPolicy, WaitStrategy};
pub use translate::{to_external_payload, DeployPayload};
pub use types::{
    Action, CallbackContext, DeployId, DeployStatus, ExternalJob, HandlerErrorCode,
    HandlerRequest, OperationStatus, ProgressEvent, ResourceModel, TYPE_NAME,
};
