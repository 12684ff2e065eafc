//! Health monitoring for cluster nodes
//!
//! Re-evaluates node liveness on a fixed interval from two signals: heartbeat
//! freshness and an active probe. A node is alive only when both agree.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use opsdeck_core::config::ClusterConfig;
use opsdeck_core::models::{Node, NodeStatus};

use super::node_registry::{NodeRegistry, StatusTransition};
use super::probe::HealthProbe;
use crate::clock::Clock;

/// Timing and concurrency settings for the monitor
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// Time between ticks
    pub check_interval: Duration,
    /// Heartbeats older than this count as stale
    pub heartbeat_timeout: chrono::Duration,
    /// Upper bound on probes in flight during one tick
    pub max_concurrent_probes: usize,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            heartbeat_timeout: chrono::Duration::minutes(2),
            max_concurrent_probes: 16,
        }
    }
}

impl From<&ClusterConfig> for HealthMonitorConfig {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            check_interval: Duration::from_secs(config.health_check_interval_seconds),
            heartbeat_timeout: i64::try_from(config.heartbeat_timeout_seconds)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or(chrono::Duration::MAX),
            max_concurrent_probes: config.max_concurrent_probes.max(1),
        }
    }
}

/// Outcome of one monitor tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Nodes evaluated this tick
    pub evaluated: usize,
    /// Evaluated nodes found alive
    pub alive: usize,
    /// Evaluated nodes found dead (stale heartbeat or failed probe)
    pub dead: usize,
    /// Offline and draining nodes left alone
    pub skipped: usize,
    /// Status changes written back to the registry
    pub transitions: Vec<StatusTransition>,
}

/// Background health monitor
///
/// Use [`HealthMonitor::run_tick`] to drive evaluation by hand, or
/// [`HealthMonitor::start`] to run it on an interval until [`HealthMonitor::shutdown`].
pub struct HealthMonitor {
    registry: Arc<NodeRegistry>,
    probe: Arc<dyn HealthProbe>,
    clock: Arc<dyn Clock>,
    config: HealthMonitorConfig,
    cancel_token: CancellationToken,
}

impl HealthMonitor {
    /// Create a monitor sharing the registry's clock
    #[must_use]
    pub fn new(
        registry: Arc<NodeRegistry>,
        probe: Arc<dyn HealthProbe>,
        config: HealthMonitorConfig,
    ) -> Self {
        let clock = registry.clock();
        Self {
            registry,
            probe,
            clock,
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Stop the loop when `token` (or a parent of it) is cancelled
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    #[must_use]
    pub fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    /// Start the monitoring loop
    ///
    /// Returns the `JoinHandle` so the caller can detect panics or task completion.
    /// Use `shutdown()` to stop the loop; a tick already running finishes first.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = self.clone();
        let cancel_token = self.cancel_token.clone();
        let mut timer = interval(self.config.check_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.check_interval.as_secs(),
            heartbeat_timeout_secs = self.config.heartbeat_timeout.num_seconds(),
            max_concurrent_probes = self.config.max_concurrent_probes,
            "Health monitor started"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        tracing::info!("Health monitor shutting down");
                        return;
                    }
                    _ = timer.tick() => {
                        monitor.run_tick().await;
                    }
                }
            }
        })
    }

    /// Gracefully shut down the monitoring loop
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Evaluate every node once and write back changed statuses
    pub async fn run_tick(&self) -> TickReport {
        let now = self.clock.now();
        let nodes = self.registry.list_nodes().await;

        let mut report = TickReport::default();
        let mut candidates = Vec::with_capacity(nodes.len());
        for node in nodes {
            // Offline is never probed; draining would ignore the verdict anyway
            if node.status.is_offline() || node.status.is_draining() {
                report.skipped += 1;
            } else {
                candidates.push(node);
            }
        }

        // Probes run outside the registry lock, bounded by max_concurrent_probes
        let heartbeat_timeout = self.config.heartbeat_timeout;
        let verdicts: Vec<(Node, bool)> = stream::iter(candidates)
            .map(|node| {
                let probe = self.probe.clone();
                async move {
                    let alive = is_alive(probe.as_ref(), &node, now, heartbeat_timeout).await;
                    (node, alive)
                }
            })
            .buffer_unordered(self.config.max_concurrent_probes)
            .collect()
            .await;

        for (node, alive) in verdicts {
            report.evaluated += 1;
            let status = if alive {
                report.alive += 1;
                NodeStatus::Healthy
            } else {
                report.dead += 1;
                NodeStatus::Unhealthy
            };

            match self.registry.apply_probe_status(&node.name, status).await {
                Ok(Some(transition)) => {
                    match transition.to {
                        NodeStatus::Healthy => {
                            tracing::info!(node = %transition.name, from = %transition.from, "Node is healthy");
                        }
                        _ => {
                            tracing::warn!(
                                node = %transition.name,
                                from = %transition.from,
                                last_heartbeat = %node.last_heartbeat,
                                "Node is unhealthy"
                            );
                        }
                    }
                    report.transitions.push(transition);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(node = %node.name, error = %e, "Failed to persist health status");
                }
            }
        }

        tracing::debug!(
            evaluated = report.evaluated,
            alive = report.alive,
            dead = report.dead,
            skipped = report.skipped,
            transitions = report.transitions.len(),
            "Health check tick complete"
        );
        report
    }
}

/// Fresh heartbeat AND successful probe
async fn is_alive(
    probe: &dyn HealthProbe,
    node: &Node,
    now: chrono::DateTime<chrono::Utc>,
    heartbeat_timeout: chrono::Duration,
) -> bool {
    if node.is_stale(now, heartbeat_timeout) {
        tracing::debug!(
            node = %node.name,
            last_heartbeat = %node.last_heartbeat,
            "Heartbeat is stale, skipping probe"
        );
        return false;
    }
    probe.probe(node).await
}
