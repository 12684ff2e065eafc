//! Cluster membership and load-balancing control plane
//!
//! - [`NodeRegistry`]: authoritative node index kept in step with durable storage
//! - [`HealthMonitor`]: background liveness evaluation (heartbeat + probe)
//! - [`LoadBalancer`]: target selection over the healthy set
//! - [`ClusterStats`]: fleet-wide capacity and utilization figures

pub mod clock;
pub mod discovery;
pub mod error;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use discovery::{
    probe_from_config, HealthMonitor, HealthMonitorConfig, HealthProbe, HttpProbe,
    LoadBalancer, LoadBalancingStrategy, NodeRegistry, StatusTransition, TcpProbe, TickReport,
};
pub use error::{Error, Result};
pub use stats::{cluster_stats, ClusterStats};
