//! End-to-end scenarios across registry, monitor, balancer and stats
//!
//! Run with: cargo test -p opsdeck-cluster --test cluster_scenarios

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

use opsdeck_cluster::{
    cluster_stats, Error, HealthMonitor, HealthMonitorConfig, HealthProbe, LoadBalancer,
    LoadBalancingStrategy, ManualClock, NodeRegistry,
};
use opsdeck_core::models::{NewNode, Node, NodeMetrics, NodeStatus};
use opsdeck_core::repository::MemoryNodeStore;

struct AlwaysUp;

#[async_trait]
impl HealthProbe for AlwaysUp {
    async fn probe(&self, _node: &Node) -> bool {
        true
    }
}

struct Cluster {
    registry: Arc<NodeRegistry>,
    clock: Arc<ManualClock>,
    balancer: LoadBalancer,
    monitor: HealthMonitor,
}

fn cluster() -> Cluster {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let registry = Arc::new(NodeRegistry::new(
        Arc::new(MemoryNodeStore::new()),
        clock.clone(),
    ));
    let balancer = LoadBalancer::new(registry.clone(), LoadBalancingStrategy::RoundRobin);
    let monitor = HealthMonitor::new(
        registry.clone(),
        Arc::new(AlwaysUp),
        HealthMonitorConfig::default(),
    );
    Cluster {
        registry,
        clock,
        balancer,
        monitor,
    }
}

fn worker(name: &str) -> NewNode {
    NewNode::new(name, "10.0.0.10", 8080).with_capacity(4, 16, 200)
}

#[tokio::test]
async fn least_connections_picks_quietest_node() {
    let c = cluster();
    for (name, connections) in [("a", 10), ("b", 20), ("c", 5)] {
        c.registry
            .register_node(worker(name).with_metrics(NodeMetrics {
                active_connections: connections,
                ..Default::default()
            }))
            .await
            .unwrap();
    }

    let selected = c
        .balancer
        .select_node(LoadBalancingStrategy::LeastConnections)
        .await
        .unwrap();
    assert_eq!(selected.name, "c");
    assert_eq!(selected.active_connections, 5);
}

#[tokio::test]
async fn cluster_stats_for_single_node() {
    let c = cluster();
    c.registry
        .register_node(
            NewNode::new("big", "10.0.0.1", 8080)
                .with_capacity(8, 32, 0)
                .with_metrics(NodeMetrics {
                    cpu_usage: 25.0,
                    memory_usage: 50.0,
                    ..Default::default()
                }),
        )
        .await
        .unwrap();

    let stats = cluster_stats(&c.registry).await;
    assert_eq!(stats.total_cpu, 8);
    assert_eq!(stats.used_cpu, 2.0);
    assert_eq!(stats.total_memory, 32);
    assert_eq!(stats.used_memory, 16.0);
}

#[tokio::test]
async fn drained_nodes_leave_rotation() {
    let c = cluster();
    for name in ["n1", "n2", "n3", "n4", "n5"] {
        c.registry.register_node(worker(name)).await.unwrap();
    }
    c.registry.drain_node("n2").await.unwrap();
    c.registry.drain_node("n4").await.unwrap();

    assert_eq!(c.registry.get_healthy_nodes().await.len(), 3);
    for _ in 0..10 {
        let selected = c
            .balancer
            .select_node(LoadBalancingStrategy::from("round_robin"))
            .await
            .unwrap();
        assert_ne!(selected.name, "n2");
        assert_ne!(selected.name, "n4");
    }

    // Drained nodes stay out even after a monitor tick with passing probes
    c.monitor.run_tick().await;
    assert_eq!(c.registry.get_healthy_nodes().await.len(), 3);
}

#[tokio::test]
async fn silent_node_changes_status_only_on_tick() {
    let c = cluster();
    c.registry.register_node(worker("quiet")).await.unwrap();

    c.clock.advance(Duration::minutes(2) + Duration::seconds(1));
    let node = c.registry.get_node("quiet").await.unwrap();
    assert_eq!(node.status, NodeStatus::Healthy);

    c.monitor.run_tick().await;
    let node = c.registry.get_node("quiet").await.unwrap();
    assert_eq!(node.status, NodeStatus::Unhealthy);

    // Marked unhealthy, never deleted
    assert_eq!(c.registry.node_count().await, 1);
    assert!(matches!(
        c.balancer.select().await,
        Err(Error::ClusterNotReady)
    ));
}

#[tokio::test]
async fn explicit_status_update_ends_draining() {
    let c = cluster();
    c.registry.register_node(worker("n1")).await.unwrap();
    c.registry.drain_node("n1").await.unwrap();

    c.monitor.run_tick().await;
    assert_eq!(
        c.registry.get_node("n1").await.unwrap().status,
        NodeStatus::Draining
    );

    c.registry
        .update_node_status("n1", NodeStatus::Healthy)
        .await
        .unwrap();

    // A stale heartbeat now demotes it like any other healthy node
    c.clock.advance(Duration::minutes(3));
    let report = c.monitor.run_tick().await;
    assert_eq!(report.transitions.len(), 1);
    assert_eq!(
        c.registry.get_node("n1").await.unwrap().status,
        NodeStatus::Unhealthy
    );
}

#[tokio::test]
async fn concurrent_writers_and_readers() {
    let c = cluster();
    for i in 0..8 {
        c.registry
            .register_node(worker(&format!("n{i}")))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..8u64 {
        let registry = c.registry.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("n{i}");
            for round in 0..20u64 {
                registry
                    .update_node_metrics(
                        &name,
                        &NodeMetrics {
                            active_connections: round,
                            cpu_usage: 25.0,
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
                let stats = cluster_stats(&registry).await;
                assert_eq!(stats.total_nodes, 8);
                assert_eq!(stats.total_cpu, 32);
            }
            i
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for node in c.registry.list_nodes().await {
        assert_eq!(node.active_connections, 19);
    }
    let stats = cluster_stats(&c.registry).await;
    assert_eq!(stats.used_cpu, 8.0);
}
