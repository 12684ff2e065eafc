mod server;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use opsdeck_cluster::{
    probe_from_config, HealthMonitor, HealthMonitorConfig, LoadBalancer, LoadBalancingStrategy,
    NodeRegistry,
};
use opsdeck_core::{
    bootstrap::{init_database, load_config},
    logging,
    repository::{MemoryNodeStore, NodeStore, PgNodeRepository},
    Config,
};

use server::{OpsDeckServer, Services};

/// Pick the durable store: Postgres when configured, in-memory otherwise
async fn init_store(config: &Config) -> Result<Arc<dyn NodeStore>> {
    if !config.uses_database() {
        info!("Database not configured, node state will not survive restarts");
        return Ok(Arc::new(MemoryNodeStore::new()));
    }

    let pool = init_database(config).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            anyhow::anyhow!("Migration failed: {e}")
        })?;
    info!("Migrations completed");

    Ok(Arc::new(PgNodeRepository::new(pool)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load and validate configuration
    let config = load_config()?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("OpsDeck server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Durable store
    let store = init_store(&config).await?;

    // 4. Node registry, rebuilt from the store
    let registry = Arc::new(NodeRegistry::with_system_clock(store));
    let restored = registry.load().await?;
    info!(nodes = restored, "Node registry loaded");

    // 5. Load balancer
    let strategy = LoadBalancingStrategy::parse_or_default(&config.cluster.default_strategy);
    let load_balancer = Arc::new(LoadBalancer::new(registry.clone(), strategy));
    info!(strategy = %strategy, "Load balancer initialized");

    // 6. Health monitor
    let probe = probe_from_config(&config.cluster)?;
    let monitor_config = HealthMonitorConfig::from(&config.cluster);
    let health_monitor = Arc::new(HealthMonitor::new(
        registry.clone(),
        Arc::from(probe),
        monitor_config,
    ));
    info!(
        interval = ?Duration::from_secs(config.cluster.health_check_interval_seconds),
        probe = ?config.cluster.probe_kind,
        "Health monitor initialized"
    );

    // 7. Run until shutdown
    let services = Services {
        registry,
        load_balancer,
        health_monitor,
    };

    OpsDeckServer::new(config, services).start().await
}
