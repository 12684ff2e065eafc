//! Error types for cluster module

use thiserror::Error;

/// Cluster error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node already registered: {0}")]
    DuplicateNode(String),

    #[error("Cluster not ready: no healthy nodes available")]
    ClusterNotReady,

    #[error("Persistence error: {0}")]
    Persistence(#[from] opsdeck_core::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether a caller may reasonably retry the operation later
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ClusterNotReady | Self::Persistence(_))
    }
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, Error>;
