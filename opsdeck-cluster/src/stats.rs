//! Fleet-wide capacity and utilization summaries

use serde::{Deserialize, Serialize};

use opsdeck_core::models::{Node, NodeStatus};

use crate::discovery::NodeRegistry;

/// Aggregate figures over every tracked node, whatever its status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub total_nodes: usize,
    pub healthy_nodes: usize,
    pub unhealthy_nodes: usize,
    pub draining_nodes: usize,
    pub offline_nodes: usize,
    /// Σ cpu_cores
    pub total_cpu: u64,
    /// Σ cpu_usage × cpu_cores / 100
    pub used_cpu: f64,
    pub total_memory: u64,
    pub used_memory: f64,
    pub total_disk: u64,
    pub used_disk: f64,
}

impl ClusterStats {
    /// Fold a node snapshot into cluster totals
    #[must_use]
    pub fn from_nodes<'a, I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = &'a Node>,
    {
        nodes.into_iter().fold(Self::default(), |mut stats, node| {
            stats.total_nodes += 1;
            match node.status {
                NodeStatus::Healthy => stats.healthy_nodes += 1,
                NodeStatus::Unhealthy => stats.unhealthy_nodes += 1,
                NodeStatus::Draining => stats.draining_nodes += 1,
                NodeStatus::Offline => stats.offline_nodes += 1,
            }

            stats.total_cpu += u64::from(node.cpu_cores);
            stats.total_memory += node.memory_gb;
            stats.total_disk += node.disk_gb;

            stats.used_cpu += node.cpu_usage * f64::from(node.cpu_cores) / 100.0;
            stats.used_memory += node.memory_usage * node.memory_gb as f64 / 100.0;
            stats.used_disk += node.disk_usage * node.disk_gb as f64 / 100.0;
            stats
        })
    }
}

/// Compute cluster statistics from one consistent registry snapshot
pub async fn cluster_stats(registry: &NodeRegistry) -> ClusterStats {
    let nodes = registry.list_nodes().await;
    ClusterStats::from_nodes(&nodes)
}
