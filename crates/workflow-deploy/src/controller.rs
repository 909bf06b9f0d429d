//! Lifecycle controller for workflow deployment resources.
//!
//! Dispatches each platform action and shapes the outward [`ProgressEvent`].
//! CREATE and UPDATE share one path through the stabilizer; DELETE is a
//! single fire-and-report call; READ and LIST do not touch the service.

use std::sync::Arc;

use tracing::{debug, error, info, Instrument};

use crate::client::{DeployService, HttpDeployClient};
use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};
use crate::stabilize::{create_stabilizer, Outcome, Stabilizer};
use crate::strategy::WaitStrategy;
use crate::translate::to_external_payload;
use crate::types::{
    Action, CallbackContext, HandlerRequest, ProgressEvent, ResourceModel, TYPE_NAME,
};

/// Drives workflow deployments for the orchestration platform.
///
/// Holds no per-operation state: everything needed to resume a job travels
/// in the [`CallbackContext`].
pub struct LifecycleController {
    service: Arc<dyn DeployService>,
    stabilizer: Arc<dyn Stabilizer>,
}

impl LifecycleController {
    /// Create a controller from explicit collaborators.
    pub fn new(service: Arc<dyn DeployService>, stabilizer: Arc<dyn Stabilizer>) -> Self {
        Self {
            service,
            stabilizer,
        }
    }

    /// Create a controller talking to the configured deployment service.
    ///
    /// Fails if no waiting strategy is configured.
    pub fn from_config(config: &DeployConfig) -> DeployResult<Self> {
        let stabilizer = create_stabilizer(&config.stabilization)?;
        let service = Arc::new(HttpDeployClient::new(&config.service)?);

        info!(
            endpoint = %service.endpoint(),
            strategy = %stabilizer.strategy(),
            "lifecycle controller configured"
        );

        Ok(Self::new(service, stabilizer))
    }

    /// Waiting strategy used for CREATE and UPDATE.
    #[must_use]
    pub fn strategy(&self) -> WaitStrategy {
        self.stabilizer.strategy()
    }

    /// Handle one platform invocation.
    pub async fn invoke(&self, request: HandlerRequest) -> ProgressEvent {
        let span = tracing::info_span!(
            "invoke",
            resource_type = TYPE_NAME,
            action = %request.action,
            request_token = request.client_request_token.as_deref().unwrap_or(""),
        );

        async move {
            let event = self.dispatch(request).await;
            debug!(status = ?event.status, terminal = event.is_terminal(), "invocation answered");
            event
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: HandlerRequest) -> ProgressEvent {
        let action = request.action;
        if action == Action::List {
            return self.list();
        }

        let model = match ResourceModel::from_value(request.desired_resource_state) {
            Ok(model) => model,
            Err(e) => return failure(action, None, &e),
        };
        let context = request.callback_context.unwrap_or_default();

        match action {
            Action::Create => self.create(model, context).await,
            Action::Update => self.update(model, context).await,
            Action::Delete => self.delete(model).await,
            Action::Read => self.read(model),
            Action::List => self.list(),
        }
    }

    /// Create the deployment, or resume a create in progress.
    pub async fn create(&self, model: ResourceModel, context: CallbackContext) -> ProgressEvent {
        self.converge(Action::Create, model, context).await
    }

    /// Update the deployment, or resume an update in progress.
    pub async fn update(&self, model: ResourceModel, context: CallbackContext) -> ProgressEvent {
        self.converge(Action::Update, model, context).await
    }

    async fn converge(
        &self,
        action: Action,
        mut model: ResourceModel,
        context: CallbackContext,
    ) -> ProgressEvent {
        let (verb, done) = match action {
            Action::Update => ("updating", "updated"),
            _ => ("creating", "created"),
        };

        info!(
            workflow = %model.workflow_label(),
            deploy_id = ?context.deploy_id,
            strategy = %self.stabilizer.strategy(),
            "{verb} workflow"
        );

        let outcome = self
            .stabilizer
            .stabilize(self.service.as_ref(), &model, context)
            .await;

        match outcome {
            Ok(Outcome::InProgress {
                context,
                delay_secs,
            }) => ProgressEvent::in_progress(model, context, delay_secs),
            Ok(Outcome::Succeeded { inference_api }) => {
                model.inference_api = Some(inference_api);
                let message = format!("Workflow {} {done}", model.workflow_label());
                ProgressEvent::success(model).with_message(message)
            }
            Ok(Outcome::Interrupted { context, error }) => {
                let event = failure(action, Some(model), &error);
                if context.deploy_id.is_some() {
                    event.with_context(context)
                } else {
                    event
                }
            }
            Ok(Outcome::Failed(e)) | Err(e) => failure(action, Some(model), &e),
        }
    }

    /// Ask the service to tear the deployment down.
    ///
    /// Reports success once the call is made; teardown is not awaited.
    pub async fn delete(&self, model: ResourceModel) -> ProgressEvent {
        let payload = match to_external_payload(&model, None) {
            Ok(payload) => payload,
            Err(e) => return failure(Action::Delete, Some(model), &e),
        };

        info!(workflow = %payload.workflow_name, "deleting workflow");

        match self.service.delete(&payload).await {
            Ok(()) => ProgressEvent::success(model),
            Err(e) => failure(Action::Delete, Some(model), &e),
        }
    }

    /// Return the model as given.
    #[must_use]
    pub fn read(&self, model: ResourceModel) -> ProgressEvent {
        ProgressEvent::success(model)
    }

    /// List deployments. The service offers no listing, so this is empty.
    #[must_use]
    pub fn list(&self) -> ProgressEvent {
        ProgressEvent::listed(Vec::new())
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("strategy", &self.stabilizer.strategy())
            .finish_non_exhaustive()
    }
}

fn failure(action: Action, model: Option<ResourceModel>, e: &DeployError) -> ProgressEvent {
    let workflow = model
        .as_ref()
        .map_or("<unknown>", ResourceModel::workflow_label)
        .to_owned();

    error!(
        workflow = %workflow,
        action = %action,
        error = %e,
        retryable = e.is_retryable(),
        "workflow operation failed"
    );

    ProgressEvent::failed(
        model,
        e.error_code(),
        format!("{action} of workflow {workflow} failed: {e}"),
    )
}
