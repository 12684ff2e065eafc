// Module: http
// JSON REST surface over the node registry, load balancer and stats

pub mod cluster;
pub mod error;
pub mod health;
pub mod json;
pub mod nodes;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use opsdeck_cluster::{LoadBalancer, NodeRegistry};

pub use error::{AppError, AppResult};
pub use json::AppJson;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
    pub load_balancer: Arc<LoadBalancer>,
}

impl AppState {
    #[must_use]
    pub const fn new(registry: Arc<NodeRegistry>, load_balancer: Arc<LoadBalancer>) -> Self {
        Self {
            registry,
            load_balancer,
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(registry: Arc<NodeRegistry>, load_balancer: Arc<LoadBalancer>) -> Router {
    let state = AppState::new(registry, load_balancer);

    Router::new()
        // Liveness of the control plane itself
        .merge(health::create_health_router())
        // Node management
        .route("/nodes", get(nodes::list_nodes).post(nodes::register_node))
        .route(
            "/nodes/{name}",
            get(nodes::get_node).delete(nodes::unregister_node),
        )
        .route("/nodes/{name}/drain", post(nodes::drain_node))
        .route("/nodes/{name}/status", put(nodes::update_node_status))
        .route("/nodes/{name}/metrics", post(nodes::update_node_metrics))
        // Cluster-wide views
        .route("/cluster/stats", get(cluster::get_stats))
        .route("/cluster/select", get(cluster::select_node))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
