//! Node registry for cluster membership
//!
//! Holds the authoritative in-memory index of nodes behind a single
//! reader-writer lock and keeps it in step with a durable [`NodeStore`].
//!
//! Every mutation builds the new record, writes it to the store while the
//! write lock is held, and only then swaps it into the index. A failed durable
//! write therefore leaves the in-memory view untouched.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use opsdeck_core::models::{NewNode, Node, NodeMetrics, NodeStatus};
use opsdeck_core::repository::NodeStore;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

/// A status change applied by the health monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub name: String,
    pub from: NodeStatus,
    pub to: NodeStatus,
}

pub struct NodeRegistry {
    store: Arc<dyn NodeStore>,
    clock: Arc<dyn Clock>,
    nodes: RwLock<HashMap<String, Node>>,
}

impl NodeRegistry {
    /// Create an empty registry over `store`
    ///
    /// Call [`NodeRegistry::load`] to pick up records that already exist in the store.
    #[must_use]
    pub fn new(store: Arc<dyn NodeStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            nodes: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_system_clock(store: Arc<dyn NodeStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    /// Time source shared with the health monitor
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Rebuild the in-memory index from the store, returning the node count
    pub async fn load(&self) -> Result<usize> {
        let stored = self.store.load_all().await?;

        let mut nodes = self.nodes.write().await;
        nodes.clear();
        for node in stored {
            nodes.insert(node.name.clone(), node);
        }

        tracing::info!(count = nodes.len(), "Node registry loaded from store");
        Ok(nodes.len())
    }

    /// Register a new node
    ///
    /// Fails with [`Error::DuplicateNode`] if the name is already known.
    pub async fn register_node(&self, new: NewNode) -> Result<Node> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(&new.name) {
            return Err(Error::DuplicateNode(new.name));
        }

        let node = Node::from_new(new, self.clock.now());
        let stored = match self.store.insert(&node).await {
            Ok(stored) => stored,
            Err(opsdeck_core::Error::AlreadyExists(_)) => {
                return Err(Error::DuplicateNode(node.name));
            }
            Err(e) => return Err(e.into()),
        };

        nodes.insert(stored.name.clone(), stored.clone());

        tracing::info!(
            node = %stored.name,
            id = stored.id,
            endpoint = %stored.endpoint(),
            role = %stored.role,
            status = %stored.status,
            "Node registered"
        );
        Ok(stored)
    }

    /// Remove a node, returning its last known record
    pub async fn unregister_node(&self, name: &str) -> Result<Node> {
        let mut nodes = self.nodes.write().await;
        if !nodes.contains_key(name) {
            return Err(Error::NodeNotFound(name.to_string()));
        }

        if !self.store.delete(name).await? {
            tracing::warn!(node = %name, "Node was missing from the store during unregister");
        }

        let removed = nodes
            .remove(name)
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))?;

        tracing::info!(node = %name, "Node unregistered");
        Ok(removed)
    }

    pub async fn get_node(&self, name: &str) -> Option<Node> {
        self.nodes.read().await.get(name).cloned()
    }

    /// Snapshot of every node, in no particular order
    pub async fn list_nodes(&self) -> Vec<Node> {
        self.nodes.read().await.values().cloned().collect()
    }

    /// Snapshot of the nodes whose status is `healthy`
    pub async fn get_healthy_nodes(&self) -> Vec<Node> {
        self.nodes
            .read()
            .await
            .values()
            .filter(|n| n.status.is_healthy())
            .cloned()
            .collect()
    }

    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }

    /// Explicitly set a node's status and refresh its heartbeat
    ///
    /// This is the only way out of `draining` and the only way into `offline`.
    pub async fn update_node_status(&self, name: &str, status: NodeStatus) -> Result<Node> {
        let now = self.clock.now();
        let updated = self
            .mutate(name, |node| {
                node.status = status;
                node.last_heartbeat = now;
                node.updated_at = now;
            })
            .await?;

        tracing::info!(node = %name, status = %status, "Node status updated");
        Ok(updated)
    }

    /// Take a node out of load-balancing rotation
    pub async fn drain_node(&self, name: &str) -> Result<Node> {
        self.update_node_status(name, NodeStatus::Draining).await
    }

    /// Overwrite a node's utilization figures and refresh its heartbeat
    pub async fn update_node_metrics(&self, name: &str, metrics: &NodeMetrics) -> Result<Node> {
        let now = self.clock.now();
        let updated = self
            .mutate(name, |node| {
                node.apply_metrics(metrics);
                node.last_heartbeat = now;
                node.updated_at = now;
            })
            .await?;

        tracing::debug!(
            node = %name,
            cpu_usage = metrics.cpu_usage,
            memory_usage = metrics.memory_usage,
            active_connections = metrics.active_connections,
            "Node metrics updated"
        );
        Ok(updated)
    }

    /// Apply a status computed by the health monitor
    ///
    /// The current status is re-read under the write lock, so a node drained or
    /// taken offline while its probe was in flight keeps that status. Returns
    /// `None` when nothing was written. The heartbeat is left alone.
    pub(crate) async fn apply_probe_status(
        &self,
        name: &str,
        status: NodeStatus,
    ) -> Result<Option<StatusTransition>> {
        let mut nodes = self.nodes.write().await;
        let Some(current) = nodes.get(name) else {
            // Unregistered mid-tick
            return Ok(None);
        };

        let from = current.status;
        if from.is_draining() || from.is_offline() || from == status {
            return Ok(None);
        }

        let mut updated = current.clone();
        updated.status = status;
        updated.updated_at = self.clock.now();
        self.store.update(&updated).await?;
        nodes.insert(name.to_string(), updated);

        Ok(Some(StatusTransition {
            name: name.to_string(),
            from,
            to: status,
        }))
    }

    async fn mutate<F>(&self, name: &str, apply: F) -> Result<Node>
    where
        F: FnOnce(&mut Node),
    {
        let mut nodes = self.nodes.write().await;
        let mut updated = nodes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))?;

        apply(&mut updated);
        self.store.update(&updated).await?;
        nodes.insert(name.to_string(), updated.clone());

        Ok(updated)
    }
}
