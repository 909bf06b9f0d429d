//! Configuration for workflow-deploy.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::{DeployError, DeployResult};
use crate::strategy::{UnknownStatusPolicy, WaitStrategy};

/// Top-level configuration for the controller service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeployConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Deployment service client configuration.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Stabilization behaviour.
    #[serde(default)]
    pub stabilization: StabilizationConfig,
}

impl DeployConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `workflow-deploy.toml` in the current directory (if present)
    /// 3. Environment variables with `WORKFLOW_DEPLOY_` prefix
    pub fn load() -> DeployResult<Self> {
        Self::from_file("workflow-deploy.toml")
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DeployResult<Self> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("WORKFLOW_DEPLOY_").split("__"))
            .extract()
            .map_err(|e| DeployError::Config(e.to_string()))
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Request timeout in seconds. Must cover a full blocking stabilization.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8085)
}

const fn default_request_timeout_secs() -> u64 {
    900
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Deployment service client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Resource endpoint of the deployment service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://cd4automl.vtion.ai/v1/resource".to_owned()
}

const fn default_service_timeout_secs() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_service_timeout_secs(),
        }
    }
}

/// Stabilization behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct StabilizationConfig {
    /// Waiting strategy. Has no default and must be set explicitly.
    #[serde(default)]
    pub strategy: Option<WaitStrategy>,

    /// Re-invocation delay suggested by the resumable strategy, in seconds.
    #[serde(default = "default_callback_delay_secs")]
    pub callback_delay_secs: u64,

    /// Wait between polls of the blocking strategy, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Statuses treated as terminal success.
    #[serde(default = "default_success_statuses")]
    pub success_statuses: Vec<String>,

    /// What to do with a status outside every known set.
    #[serde(default)]
    pub unknown_status: UnknownStatusPolicy,

    /// `InferenceApi` value used when a successful job has no `ApiUri`.
    #[serde(default = "default_placeholder_api_uri")]
    pub placeholder_api_uri: String,
}

impl StabilizationConfig {
    /// The configured strategy, or an error if none was chosen.
    pub fn require_strategy(&self) -> DeployResult<WaitStrategy> {
        self.strategy.ok_or_else(|| {
            DeployError::Config(
                "stabilization.strategy must be set to \"resumable\" or \"blocking\"".to_owned(),
            )
        })
    }
}

const fn default_callback_delay_secs() -> u64 {
    20
}

const fn default_poll_interval_secs() -> u64 {
    30
}

fn default_success_statuses() -> Vec<String> {
    ["SUCCESS", "SUCCEEDED", "COMPLETED"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_placeholder_api_uri() -> String {
    "MyTestUrl".to_owned()
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            callback_delay_secs: default_callback_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            success_statuses: default_success_statuses(),
            unknown_status: UnknownStatusPolicy::default(),
            placeholder_api_uri: default_placeholder_api_uri(),
        }
    }
}
