//! Workflow deploy service binary.
//!
//! Serves the lifecycle controller to the orchestration platform.

use tracing::info;
use tracing_subscriber::EnvFilter;

use workflow_deploy::{DeployConfig, HandlerService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("workflow_deploy=info".parse()?),
        )
        .init();

    info!("workflow deploy service starting");

    let config = DeployConfig::load().unwrap_or_else(|e| {
        info!(error = %e, "failed to load config, using defaults");
        DeployConfig::default()
    });

    info!(
        listen_addr = %config.server.listen_addr,
        endpoint = %config.service.endpoint,
        strategy = ?config.stabilization.strategy,
        "configuration loaded"
    );

    HandlerService::new(config).run().await?;

    Ok(())
}
