//! Service lifecycle management.
//!
//! Provides the main service runner with signal handling and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api;
use crate::config::DeployConfig;
use crate::controller::LifecycleController;
use crate::error::{DeployError, DeployResult};

/// The controller service.
///
/// Builds the lifecycle controller from configuration, serves the invocation
/// API, and shuts down on Ctrl+C, SIGTERM or [`HandlerService::shutdown`].
pub struct HandlerService {
    config: DeployConfig,
    cancel: CancellationToken,
}

impl HandlerService {
    /// Create a new service with the given configuration.
    #[must_use]
    pub fn new(config: DeployConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Run the service until shutdown.
    pub async fn run(&self) -> DeployResult<()> {
        let controller = Arc::new(LifecycleController::from_config(&self.config)?);

        let state = api::AppState {
            controller,
            invocation_budget: Duration::from_secs(self.config.server.request_timeout_secs),
        };
        let app = api::router(state);

        let addr = self.config.server.listen_addr;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| DeployError::Config(format!("failed to bind {addr}: {e}")))?;

        info!(listen_addr = %addr, "workflow deploy service listening");

        axum::serve(listener, app)
            .with_graceful_shutdown({
                let cancel = self.cancel.clone();
                async move {
                    let trigger = wait_for_shutdown(cancel).await;
                    info!(trigger = ?trigger, "draining in-flight invocations");
                }
            })
            .await
            .map_err(|e| DeployError::internal(format!("server error: {e}")))?;

        info!("workflow deploy service shutdown complete");
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// What ended the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownTrigger {
    Interrupt,
    Terminate,
    Requested,
}

async fn interrupt() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

async fn wait_for_shutdown(cancel: CancellationToken) -> ShutdownTrigger {
    tokio::select! {
        biased;
        () = cancel.cancelled() => ShutdownTrigger::Requested,
        () = interrupt() => ShutdownTrigger::Interrupt,
        () = terminate() => ShutdownTrigger::Terminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::WaitStrategy;

    #[test]
    fn service_shutdown() {
        let service = HandlerService::new(DeployConfig::default());
        assert!(!service.cancel.is_cancelled());
        service.shutdown();
        assert!(service.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_is_reported_as_requested() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(wait_for_shutdown(cancel).await, ShutdownTrigger::Requested);
    }

    #[tokio::test]
    async fn run_refuses_unconfigured_strategy() {
        let service = HandlerService::new(DeployConfig::default());
        let err = service.run().await.unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let mut config = DeployConfig::default();
        config.server.listen_addr = "127.0.0.1:0".parse().unwrap();
        config.stabilization.strategy = Some(WaitStrategy::Resumable);

        let service = Arc::new(HandlerService::new(config));
        let runner = Arc::clone(&service);
        let handle = tokio::spawn(async move { runner.run().await });

        service.shutdown();
        handle.await.unwrap().unwrap();
    }
}
