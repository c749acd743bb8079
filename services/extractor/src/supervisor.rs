//! Start/stop lifecycle for long-running services.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{error, info};

/// A component the supervisor runs until shutdown.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    /// Run until `shutdown` becomes true. Work in progress should be allowed
    /// to finish before returning.
    async fn start(&self, shutdown: watch::Receiver<bool>) -> Result<()>;

    /// Release resources after `start` has returned.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Runs services side by side and stops them together.
#[derive(Default)]
pub struct Supervisor {
    services: Vec<Arc<dyn Service>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, service: Arc<dyn Service>) {
        self.services.push(service);
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Run every service until a termination signal arrives.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run every service until `signal` completes, then broadcast shutdown,
    /// wait for each service to return and call its `stop`.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut handles = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let service = Arc::clone(service);
            let shutdown = shutdown_rx.clone();
            info!(service = service.name(), "Starting service");
            handles.push(tokio::spawn(async move { service.start(shutdown).await }));
        }
        drop(shutdown_rx);

        signal.await;
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);

        for (service, handle) in self.services.iter().zip(handles) {
            match handle.await {
                Ok(Ok(())) => info!(service = service.name(), "Service finished"),
                Ok(Err(e)) => error!(service = service.name(), error = %e, "Service failed"),
                Err(e) => error!(service = service.name(), error = %e, "Service task panicked"),
            }
        }

        for service in &self.services {
            if let Err(e) = service.stop().await {
                error!(service = service.name(), error = %e, "Service stop failed");
            }
        }

        info!("All services stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, SIGTERM or SIGQUIT.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let wait = |kind: SignalKind| async move {
            match signal(kind) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install signal handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => {}
            _ = wait(SignalKind::terminate()) => {}
            _ = wait(SignalKind::quit()) => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
