//! Client side of the external deployment service.
//!
//! The [`DeployService`] trait is the seam between the controller and the
//! service. [`HttpDeployClient`] talks to the real service; [`MockDeployService`]
//! replays scripted job statuses for tests.

mod http;

pub use http::HttpDeployClient;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{DeployError, DeployResult};
use crate::translate::DeployPayload;
use crate::types::{DeployId, DeployStatus, ExternalJob};

/// Operations offered by the deployment service.
///
/// Implementations perform no retries; waiting and re-polling belong to the
/// stabilization engine.
#[async_trait]
pub trait DeployService: Send + Sync {
    /// Create, update or resume a job.
    ///
    /// Create and update are the same call; a payload carrying a `DeployId`
    /// resumes that job instead of starting a new one.
    async fn submit(&self, payload: &DeployPayload) -> DeployResult<ExternalJob>;

    /// Ask the service to tear the job down. The response is not interpreted.
    async fn delete(&self, payload: &DeployPayload) -> DeployResult<()>;
}

/// Parse a deployment service response body.
///
/// Only the shape is checked here; whether a status can be acted on is up to
/// the stabilization engine.
pub fn parse_job(body: &[u8]) -> DeployResult<ExternalJob> {
    serde_json::from_slice(body)
        .map_err(|e| DeployError::protocol(format!("invalid deployment service response: {e}")))
}

/// Scripted reply of a [`MockDeployService`].
#[derive(Debug, Clone)]
enum MockReply {
    Job {
        status: DeployStatus,
        api_uri: Option<String>,
        echo_id: bool,
    },
    Error(String),
    Unreachable,
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    submitted: Vec<DeployPayload>,
    deleted: Vec<DeployPayload>,
    issued: Vec<DeployId>,
}

/// In-memory deployment service for testing.
///
/// Issues a new `DeployId` only for payloads without one and rejects payloads
/// naming a job it never issued, so tests can check that resumption echoes
/// the same job.
#[derive(Debug, Default)]
pub struct MockDeployService {
    state: Mutex<MockState>,
}

impl MockDeployService {
    /// Create a mock with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock replying with the given statuses in order.
    #[must_use]
    pub fn with_statuses<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Self {
        statuses
            .into_iter()
            .fold(Self::new(), |mock, status| mock.respond(status))
    }

    /// Queue a reply with the given status.
    #[must_use]
    pub fn respond(self, status: &str) -> Self {
        self.push(MockReply::Job {
            status: DeployStatus::new(status),
            api_uri: None,
            echo_id: true,
        })
    }

    /// Queue a reply with the given status and no `DeployId`.
    #[must_use]
    pub fn respond_without_id(self, status: &str) -> Self {
        self.push(MockReply::Job {
            status: DeployStatus::new(status),
            api_uri: None,
            echo_id: false,
        })
    }

    /// Queue a reply with the given status and `ApiUri`.
    #[must_use]
    pub fn respond_with_uri(self, status: &str, api_uri: &str) -> Self {
        self.push(MockReply::Job {
            status: DeployStatus::new(status),
            api_uri: Some(api_uri.to_owned()),
            echo_id: true,
        })
    }

    /// Queue a protocol failure.
    #[must_use]
    pub fn respond_error(self, message: &str) -> Self {
        self.push(MockReply::Error(message.to_owned()))
    }

    /// Queue a transport failure, as if the service could not be reached.
    #[must_use]
    pub fn respond_unreachable(self) -> Self {
        self.push(MockReply::Unreachable)
    }

    fn push(self, reply: MockReply) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.replies.push_back(reply);
        }
        self
    }

    /// Payloads received by `submit`, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<DeployPayload> {
        self.state
            .lock()
            .map(|state| state.submitted.clone())
            .unwrap_or_default()
    }

    /// Payloads received by `delete`, in order.
    #[must_use]
    pub fn deleted(&self) -> Vec<DeployPayload> {
        self.state
            .lock()
            .map(|state| state.deleted.clone())
            .unwrap_or_default()
    }

    /// Number of distinct jobs the mock has started.
    #[must_use]
    pub fn jobs_created(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.issued.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeployService for MockDeployService {
    async fn submit(&self, payload: &DeployPayload) -> DeployResult<ExternalJob> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DeployError::internal("lock poisoned"))?;
        state.submitted.push(payload.clone());

        let deploy_id = match &payload.deploy_id {
            Some(id) if state.issued.contains(id) => id.clone(),
            Some(id) => {
                return Err(DeployError::protocol(format!("unknown DeployId {id}")));
            }
            None => {
                let id = DeployId::new(format!("deploy-{}", state.issued.len() + 1));
                state.issued.push(id.clone());
                id
            }
        };

        match state.replies.pop_front() {
            Some(MockReply::Job {
                status,
                api_uri,
                echo_id,
            }) => Ok(ExternalJob {
                deploy_id: echo_id.then_some(deploy_id),
                status,
                api_uri,
            }),
            Some(MockReply::Error(message)) => Err(DeployError::protocol(message)),
            Some(MockReply::Unreachable) => Err(transport_failure()),
            None => Err(DeployError::protocol("no scripted reply left")),
        }
    }

    async fn delete(&self, payload: &DeployPayload) -> DeployResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DeployError::internal("lock poisoned"))?;
        state.deleted.push(payload.clone());
        Ok(())
    }
}

/// A genuine `reqwest` error, produced without touching the network.
fn transport_failure() -> DeployError {
    reqwest::Client::new()
        .get("http://[unreachable")
        .build()
        .map_or_else(DeployError::Transport, |_| {
            DeployError::internal("mock transport failure could not be built")
        })
}
