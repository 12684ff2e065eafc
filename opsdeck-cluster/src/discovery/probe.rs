//! Active liveness probes
//!
//! A probe answers one question: did the node respond successfully within the
//! timeout? Failures of any kind are reported as `false`, never as errors.

use async_trait::async_trait;
use std::time::Duration;

use opsdeck_core::config::{ClusterConfig, ProbeKind};
use opsdeck_core::models::Node;

use crate::error::{Error, Result};

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, node: &Node) -> bool;
}

/// Probe over HTTP: GET the node's health endpoint and expect a 2xx
pub struct HttpProbe {
    client: reqwest::Client,
    health_path: String,
}

impl HttpProbe {
    pub fn new(timeout: Duration, health_path: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build probe client: {e}")))?;

        Ok(Self {
            client,
            health_path: health_path.into(),
        })
    }

    fn url(&self, node: &Node) -> String {
        format!("http://{}{}", node.endpoint(), self.health_path)
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, node: &Node) -> bool {
        let url = self.url(node);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::debug!(node = %node.name, %url, status = %resp.status(), "Health probe returned failure status");
                false
            }
            Err(e) => {
                tracing::debug!(node = %node.name, %url, error = %e, "Health probe failed");
                false
            }
        }
    }
}

/// Probe by opening a TCP connection to the node's advertised port
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    async fn probe(&self, node: &Node) -> bool {
        let addr = node.endpoint();
        let result =
            tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(&addr)).await;

        match result {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(node = %node.name, %addr, error = %e, "TCP probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(node = %node.name, %addr, "TCP probe timed out");
                false
            }
        }
    }
}

/// Build the probe selected by configuration
pub fn probe_from_config(config: &ClusterConfig) -> Result<Box<dyn HealthProbe>> {
    let timeout = Duration::from_secs(config.probe_timeout_seconds);
    Ok(match config.probe_kind {
        ProbeKind::Http => Box::new(HttpProbe::new(timeout, config.health_path.clone())?),
        ProbeKind::Tcp => Box::new(TcpProbe::new(timeout)),
    })
}
