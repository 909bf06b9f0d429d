//! Stabilization engine for external deployment jobs.
//!
//! Every service response goes through one pure step, [`StatusPolicy::step`],
//! which turns a job status into a [`Decision`]. The two [`Stabilizer`]
//! implementations differ only in what they do with a `Wait` decision:
//!
//! ```text
//!                 ┌──────────── Wait ────────────┐
//!                 │                               ▼
//! submit ──▶ step ┤              Resumable: return IN_PROGRESS + context
//!                 │              Blocking:  sleep, submit again
//!                 ├── Succeed ──▶ Succeeded (InferenceApi)
//!                 ├── Fail ─────▶ Failed (ExternalJobFailure)
//!                 └── Unknown ──▶ Failed (UnknownStatus)
//! ```
//!
//! A retryable submit failure ends the run as [`Outcome::Interrupted`], which
//! keeps the job being resumed so a retry does not start a second one.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::DeployService;
use crate::config::StabilizationConfig;
use crate::error::{DeployError, DeployResult};
use crate::strategy::{UnknownStatusPolicy, WaitStrategy};
use crate::translate::{to_external_payload, DeployPayload};
use crate::types::{CallbackContext, DeployId, DeployStatus, ExternalJob, ResourceModel};

/// What to do after one service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The job is still running.
    Wait {
        /// Job to resume.
        deploy_id: DeployId,
    },
    /// The job succeeded.
    Succeed {
        /// Value for the model's `InferenceApi`.
        inference_api: String,
    },
    /// The job reached a terminal failure status.
    Fail {
        /// Reported status.
        status: DeployStatus,
    },
    /// The status is in no known set and the policy rejects it.
    Unknown {
        /// Reported status.
        status: DeployStatus,
    },
}

/// Classification rules applied to every job status.
#[derive(Debug, Clone)]
pub struct StatusPolicy {
    success_statuses: Vec<String>,
    unknown_status: UnknownStatusPolicy,
    placeholder_api_uri: String,
}

impl StatusPolicy {
    /// Create a policy from configuration.
    #[must_use]
    pub fn from_config(config: &StabilizationConfig) -> Self {
        Self {
            success_statuses: config.success_statuses.clone(),
            unknown_status: config.unknown_status,
            placeholder_api_uri: config.placeholder_api_uri.clone(),
        }
    }

    /// Classify one job.
    ///
    /// Fails only when a running job carries no `DeployId`, since it could
    /// not be resumed. Replies to a resumed submit have the resumed id filled
    /// in before they get here.
    pub fn step(&self, job: &ExternalJob) -> DeployResult<Decision> {
        let status = &job.status;

        if status.is_in_progress() {
            let deploy_id = job.deploy_id.clone().ok_or_else(|| {
                DeployError::protocol("in-progress response carried no DeployId")
            })?;
            return Ok(Decision::Wait { deploy_id });
        }

        if status.is_terminal_failure() {
            return Ok(Decision::Fail {
                status: status.clone(),
            });
        }

        let known_success = self
            .success_statuses
            .iter()
            .any(|s| s == status.as_str());

        if known_success || self.unknown_status == UnknownStatusPolicy::Succeed {
            let inference_api = job
                .api_uri
                .clone()
                .unwrap_or_else(|| self.placeholder_api_uri.clone());
            return Ok(Decision::Succeed { inference_api });
        }

        Ok(Decision::Unknown {
            status: status.clone(),
        })
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::from_config(&StabilizationConfig::default())
    }
}

/// Result of one stabilization run.
#[derive(Debug)]
pub enum Outcome {
    /// Re-invoke later with the context.
    InProgress {
        /// Context to hand back to the caller.
        context: CallbackContext,
        /// Suggested delay before re-invocation, in seconds.
        delay_secs: u64,
    },
    /// The job succeeded.
    Succeeded {
        /// Value for the model's `InferenceApi`.
        inference_api: String,
    },
    /// The job ended in a failure the caller must not retry.
    Failed(DeployError),
    /// A submit failed in a way the caller may retry.
    Interrupted {
        /// Job to resume on retry. Empty if none was issued yet.
        context: CallbackContext,
        /// The retryable failure.
        error: DeployError,
    },
}

/// A waiting strategy for external jobs.
#[async_trait]
pub trait Stabilizer: Send + Sync {
    /// The strategy this stabilizer implements.
    fn strategy(&self) -> WaitStrategy;

    /// Submit the model and wait according to the strategy.
    ///
    /// `context` carries the job of a previous invocation, if any. Errors
    /// are call-level failures such as validation or protocol errors.
    /// Job-level failures come back as [`Outcome::Failed`] and retryable
    /// submit failures as [`Outcome::Interrupted`].
    async fn stabilize(
        &self,
        service: &dyn DeployService,
        model: &ResourceModel,
        context: CallbackContext,
    ) -> DeployResult<Outcome>;
}

/// Create the stabilizer selected by configuration.
pub fn create_stabilizer(config: &StabilizationConfig) -> DeployResult<Arc<dyn Stabilizer>> {
    let policy = StatusPolicy::from_config(config);

    match config.require_strategy()? {
        WaitStrategy::Resumable => Ok(Arc::new(ResumableStabilizer::new(
            policy,
            config.callback_delay_secs,
        ))),
        WaitStrategy::Blocking => Ok(Arc::new(BlockingStabilizer::new(
            policy,
            Duration::from_secs(config.poll_interval_secs),
        ))),
    }
}

/// Submit once.
///
/// A reply without a `DeployId` is taken to be about the job being resumed.
async fn submit(
    service: &dyn DeployService,
    payload: &DeployPayload,
) -> DeployResult<ControlFlow<Outcome, ExternalJob>> {
    match service.submit(payload).await {
        Ok(mut job) => {
            if job.deploy_id.is_none() {
                job.deploy_id.clone_from(&payload.deploy_id);
            }
            Ok(ControlFlow::Continue(job))
        }
        Err(error) if error.is_retryable() => {
            warn!(
                workflow = %payload.workflow_name,
                deploy_id = ?payload.deploy_id,
                error = %error,
                "deployment service unreachable, keeping job for retry"
            );
            Ok(ControlFlow::Break(Outcome::Interrupted {
                context: CallbackContext {
                    deploy_id: payload.deploy_id.clone(),
                },
                error,
            }))
        }
        Err(error) => Err(error),
    }
}

/// Split a decision into "keep waiting on this job" and a final outcome.
fn conclude(decision: Decision, model: &ResourceModel) -> ControlFlow<Outcome, DeployId> {
    let workflow = model.workflow_label().to_owned();

    match decision {
        Decision::Wait { deploy_id } => ControlFlow::Continue(deploy_id),
        Decision::Succeed { inference_api } => {
            info!(workflow = %workflow, inference_api = %inference_api, "workflow deployed");
            ControlFlow::Break(Outcome::Succeeded { inference_api })
        }
        Decision::Fail { status } => {
            warn!(workflow = %workflow, status = %status, "workflow deployment failed");
            ControlFlow::Break(Outcome::Failed(DeployError::ExternalJobFailure {
                workflow,
                status,
            }))
        }
        Decision::Unknown { status } => {
            warn!(workflow = %workflow, status = %status, "workflow deployment reported unknown status");
            ControlFlow::Break(Outcome::Failed(DeployError::UnknownStatus { workflow, status }))
        }
    }
}

/// Steps the job once per invocation.
#[derive(Debug, Clone)]
pub struct ResumableStabilizer {
    policy: StatusPolicy,
    callback_delay_secs: u64,
}

impl ResumableStabilizer {
    /// Create a resumable stabilizer.
    #[must_use]
    pub const fn new(policy: StatusPolicy, callback_delay_secs: u64) -> Self {
        Self {
            policy,
            callback_delay_secs,
        }
    }
}

#[async_trait]
impl Stabilizer for ResumableStabilizer {
    fn strategy(&self) -> WaitStrategy {
        WaitStrategy::Resumable
    }

    async fn stabilize(
        &self,
        service: &dyn DeployService,
        model: &ResourceModel,
        context: CallbackContext,
    ) -> DeployResult<Outcome> {
        let payload = to_external_payload(model, context.deploy_id.as_ref())?;
        let job = match submit(service, &payload).await? {
            ControlFlow::Continue(job) => job,
            ControlFlow::Break(outcome) => return Ok(outcome),
        };

        match conclude(self.policy.step(&job)?, model) {
            ControlFlow::Continue(deploy_id) => {
                info!(
                    workflow = %payload.workflow_name,
                    deploy_id = %deploy_id,
                    delay_secs = self.callback_delay_secs,
                    "deployment in progress, awaiting re-invocation"
                );
                Ok(Outcome::InProgress {
                    context: CallbackContext::resuming(deploy_id),
                    delay_secs: self.callback_delay_secs,
                })
            }
            ControlFlow::Break(outcome) => Ok(outcome),
        }
    }
}

/// Polls the job inside the invocation until it is terminal.
#[derive(Debug, Clone)]
pub struct BlockingStabilizer {
    policy: StatusPolicy,
    poll_interval: Duration,
}

impl BlockingStabilizer {
    /// Create a blocking stabilizer.
    #[must_use]
    pub const fn new(policy: StatusPolicy, poll_interval: Duration) -> Self {
        Self {
            policy,
            poll_interval,
        }
    }
}

#[async_trait]
impl Stabilizer for BlockingStabilizer {
    fn strategy(&self) -> WaitStrategy {
        WaitStrategy::Blocking
    }

    async fn stabilize(
        &self,
        service: &dyn DeployService,
        model: &ResourceModel,
        context: CallbackContext,
    ) -> DeployResult<Outcome> {
        let mut payload = to_external_payload(model, context.deploy_id.as_ref())?;
        let mut polls: u32 = 0;

        loop {
            let job = match submit(service, &payload).await? {
                ControlFlow::Continue(job) => job,
                ControlFlow::Break(outcome) => return Ok(outcome),
            };
            polls += 1;

            match conclude(self.policy.step(&job)?, model) {
                ControlFlow::Continue(deploy_id) => {
                    debug!(
                        workflow = %payload.workflow_name,
                        deploy_id = %deploy_id,
                        polls,
                        "deployment in progress, waiting"
                    );
                    payload.deploy_id = Some(deploy_id);
                    tokio::time::sleep(self.poll_interval).await;
                }
                ControlFlow::Break(outcome) => {
                    debug!(workflow = %payload.workflow_name, polls, "deployment reached terminal status");
                    return Ok(outcome);
                }
            }
        }
    }
}
