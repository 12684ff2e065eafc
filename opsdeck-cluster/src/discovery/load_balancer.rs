//! Load balancing for cluster requests
//!
//! Picks one target among the registry's healthy nodes. Draining, unhealthy
//! and offline nodes are never candidates.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use opsdeck_core::models::Node;

use super::node_registry::NodeRegistry;
use crate::error::{Error, Result};

/// Load balancing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingStrategy {
    /// Rotate through healthy nodes in name order
    #[default]
    RoundRobin,
    /// Fewest active connections
    LeastConnections,
    /// Lowest CPU usage
    LeastCpu,
}

impl LoadBalancingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::LeastConnections => "least_connections",
            Self::LeastCpu => "least_cpu",
        }
    }

    /// Parse a strategy name, falling back to round-robin for unknown names
    #[must_use]
    pub fn parse_or_default(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "round_robin" => Self::RoundRobin,
            "least_connections" => Self::LeastConnections,
            "least_cpu" => Self::LeastCpu,
            other => {
                tracing::warn!(strategy = %other, "Unknown load balancing strategy, using round_robin");
                Self::RoundRobin
            }
        }
    }
}

impl fmt::Display for LoadBalancingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LoadBalancingStrategy {
    fn from(name: &str) -> Self {
        Self::parse_or_default(name)
    }
}

/// Load balancer for cluster node selection
pub struct LoadBalancer {
    node_registry: Arc<NodeRegistry>,
    default_strategy: LoadBalancingStrategy,
    round_robin_index: AtomicUsize,
}

impl LoadBalancer {
    #[must_use]
    pub const fn new(node_registry: Arc<NodeRegistry>, default_strategy: LoadBalancingStrategy) -> Self {
        Self {
            node_registry,
            default_strategy,
            round_robin_index: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn default_strategy(&self) -> LoadBalancingStrategy {
        self.default_strategy
    }

    /// Select a node using the configured default strategy
    pub async fn select(&self) -> Result<Node> {
        self.select_node(self.default_strategy).await
    }

    /// Select a healthy node using `strategy`
    ///
    /// Fails with [`Error::ClusterNotReady`] when no node is healthy. Ties in the
    /// `least_*` strategies go to the node whose name sorts first.
    pub async fn select_node(&self, strategy: LoadBalancingStrategy) -> Result<Node> {
        let mut nodes = self.node_registry.get_healthy_nodes().await;
        if nodes.is_empty() {
            return Err(Error::ClusterNotReady);
        }

        let selected = match strategy {
            LoadBalancingStrategy::RoundRobin => {
                // Sort by name for stable ordering across calls
                nodes.sort_by(|a, b| a.name.cmp(&b.name));
                let index = self
                    .round_robin_index
                    .fetch_add(1, AtomicOrdering::AcqRel)
                    % nodes.len();
                Some(nodes.swap_remove(index))
            }
            LoadBalancingStrategy::LeastConnections => min_by(nodes, |a, b| {
                a.active_connections.cmp(&b.active_connections)
            }),
            LoadBalancingStrategy::LeastCpu => {
                min_by(nodes, |a, b| a.cpu_usage.total_cmp(&b.cpu_usage))
            }
        }
        .ok_or(Error::ClusterNotReady)?;

        tracing::trace!(node = %selected.name, strategy = %strategy, "Node selected");
        Ok(selected)
    }
}

fn min_by<F>(nodes: Vec<Node>, metric: F) -> Option<Node>
where
    F: Fn(&Node, &Node) -> Ordering,
{
    nodes
        .into_iter()
        .min_by(|a, b| metric(a, b).then_with(|| a.name.cmp(&b.name)))
}
