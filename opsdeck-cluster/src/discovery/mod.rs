//! Cluster node discovery and health monitoring

pub mod health_monitor;
pub mod load_balancer;
pub mod node_registry;
pub mod probe;

pub use health_monitor::{HealthMonitor, HealthMonitorConfig, TickReport};
pub use load_balancer::{LoadBalancer, LoadBalancingStrategy};
pub use node_registry::{NodeRegistry, StatusTransition};
pub use probe::{probe_from_config, HealthProbe, HttpProbe, TcpProbe};
