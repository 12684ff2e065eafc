//! Server lifecycle management
//!
//! Manages the startup and shutdown of all server components:
//! - HTTP/REST server
//! - Background health monitor

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use opsdeck_cluster::{HealthMonitor, LoadBalancer, NodeRegistry};
use opsdeck_core::Config;

/// Container for shared services
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<NodeRegistry>,
    pub load_balancer: Arc<LoadBalancer>,
    pub health_monitor: Arc<HealthMonitor>,
}

/// `OpsDeck` server - manages all server components
pub struct OpsDeckServer {
    config: Config,
    services: Services,
    http_handle: Option<JoinHandle<()>>,
    monitor_handle: Option<JoinHandle<()>>,
}

impl OpsDeckServer {
    /// Create a new server instance
    pub const fn new(config: Config, services: Services) -> Self {
        Self {
            config,
            services,
            http_handle: None,
            monitor_handle: None,
        }
    }

    /// Start all components and wait for shutdown signal
    pub async fn start(mut self) -> anyhow::Result<()> {
        info!("Starting OpsDeck server...");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        self.monitor_handle = Some(self.services.health_monitor.start());

        let http_handle = self.start_http_server(shutdown_rx)?;
        self.http_handle = Some(http_handle);

        info!("All components started successfully");

        let http_handle = self
            .http_handle
            .take()
            .ok_or_else(|| anyhow::anyhow!("HTTP server handle missing after startup"))?;

        tokio::select! {
            _ = http_handle => {
                error!("HTTP server stopped unexpectedly");
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        let _ = shutdown_tx.send(true);

        self.shutdown().await;

        Ok(())
    }

    /// Gracefully shut down all server components
    async fn shutdown(&mut self) {
        info!("Shutting down OpsDeck server...");

        // A tick already in flight completes before the loop exits
        self.services.health_monitor.shutdown();
        if let Some(handle) = self.monitor_handle.take() {
            if let Err(e) = handle.await {
                error!("Health monitor task failed: {}", e);
            }
        }

        let nodes = self.services.registry.node_count().await;
        info!(nodes, "OpsDeck server shut down");
    }

    /// Start HTTP server with graceful shutdown support
    fn start_http_server(&self, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<JoinHandle<()>> {
        let http_address = self.config.http_address();
        let http_router = opsdeck_api::http::create_router(
            self.services.registry.clone(),
            self.services.load_balancer.clone(),
        );

        let handle = tokio::spawn(async move {
            let http_addr: std::net::SocketAddr = match http_address.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("Invalid HTTP address '{}': {}", http_address, e);
                    return;
                }
            };

            let listener = match tokio::net::TcpListener::bind(http_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind HTTP address {}: {}", http_addr, e);
                    return;
                }
            };

            info!("HTTP server listening on {}", http_addr);

            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, http_router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        Ok(handle)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
