pub mod node;

pub use node::{NewNode, Node, NodeMetrics, NodeRole, NodeStatus};
