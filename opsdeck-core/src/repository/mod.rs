//! Durable node storage
//!
//! The registry talks to storage only through [`NodeStore`], so Postgres and the
//! in-memory store are interchangeable.

pub mod memory;
pub mod node;

use async_trait::async_trait;

use crate::models::Node;
use crate::Result;

pub use memory::MemoryNodeStore;
pub use node::PgNodeRepository;

/// Durable storage for node records, one record per unique node name
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Load every stored node
    async fn load_all(&self) -> Result<Vec<Node>>;

    /// Insert a new node and return it with its assigned id.
    ///
    /// Fails with `Error::AlreadyExists` when the name is taken.
    async fn insert(&self, node: &Node) -> Result<Node>;

    /// Overwrite the mutable fields of an existing node.
    ///
    /// Fails with `Error::NotFound` when no record has that name.
    async fn update(&self, node: &Node) -> Result<()>;

    /// Delete a node by name, returning whether a record was removed
    async fn delete(&self, name: &str) -> Result<bool>;
}
