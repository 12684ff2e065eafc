//! Node registration and administration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use opsdeck_core::models::{NewNode, Node, NodeMetrics, NodeStatus};

use super::{AppError, AppJson, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnregisterResponse {
    pub name: String,
    pub removed: bool,
}

pub async fn list_nodes(State(state): State<AppState>) -> Json<Vec<Node>> {
    let mut nodes = state.registry.list_nodes().await;
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    Json(nodes)
}

pub async fn register_node(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewNode>,
) -> AppResult<(StatusCode, Json<Node>)> {
    req.validate()?;

    let node = state.registry.register_node(req).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn get_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Node>> {
    state
        .registry
        .get_node(&name)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Node not found: {name}")))
}

pub async fn unregister_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<UnregisterResponse>> {
    let node = state.registry.unregister_node(&name).await?;
    Ok(Json(UnregisterResponse {
        name: node.name,
        removed: true,
    }))
}

pub async fn drain_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Node>> {
    let node = state.registry.drain_node(&name).await?;
    Ok(Json(node))
}

pub async fn update_node_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
    AppJson(req): AppJson<UpdateStatusRequest>,
) -> AppResult<Json<Node>> {
    let status: NodeStatus = req.status.parse()?;

    let node = state.registry.update_node_status(&name, status).await?;
    Ok(Json(node))
}

pub async fn update_node_metrics(
    State(state): State<AppState>,
    Path(name): Path<String>,
    AppJson(metrics): AppJson<NodeMetrics>,
) -> AppResult<Json<Node>> {
    metrics.validate()?;

    let node = state.registry.update_node_metrics(&name, &metrics).await?;
    Ok(Json(node))
}
