//! In-memory node store
//!
//! Used for single-process deployments without a database and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::NodeStore;
use crate::models::Node;
use crate::{Error, Result};

#[derive(Debug)]
pub struct MemoryNodeStore {
    nodes: RwLock<HashMap<String, Node>>,
    next_id: AtomicI64,
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    /// Fetch a stored record by name
    pub async fn get(&self, name: &str) -> Option<Node> {
        self.nodes.read().await.get(name).cloned()
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn load_all(&self) -> Result<Vec<Node>> {
        Ok(self.nodes.read().await.values().cloned().collect())
    }

    async fn insert(&self, node: &Node) -> Result<Node> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(&node.name) {
            return Err(Error::AlreadyExists(format!("node {}", node.name)));
        }

        let mut stored = node.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        nodes.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, node: &Node) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&node.name) {
            Some(existing) => {
                *existing = node.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("node {}", node.name))),
        }
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.nodes.write().await.remove(name).is_some())
    }
}
