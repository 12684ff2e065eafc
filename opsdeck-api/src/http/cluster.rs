//! Cluster statistics and node selection handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use opsdeck_cluster::{cluster_stats, ClusterStats, LoadBalancingStrategy};
use opsdeck_core::models::Node;

use super::{AppResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct SelectQuery {
    /// Falls back to the configured default when absent
    pub strategy: Option<String>,
}

pub async fn get_stats(State(state): State<AppState>) -> Json<ClusterStats> {
    Json(cluster_stats(&state.registry).await)
}

pub async fn select_node(
    State(state): State<AppState>,
    Query(query): Query<SelectQuery>,
) -> AppResult<Json<Node>> {
    let strategy = query
        .strategy
        .as_deref()
        .map_or(state.load_balancer.default_strategy(), LoadBalancingStrategy::from);

    let node = state.load_balancer.select_node(strategy).await?;
    Ok(Json(node))
}
