//! Node repository for database operations

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::debug;

use super::NodeStore;
use crate::models::{Node, NodeRole, NodeStatus};
use crate::{Error, Result};

const NODE_COLUMNS: &str = r#"
    id, name, address, port, role, status,
    cpu_cores, memory_gb, disk_gb,
    cpu_usage, memory_usage, disk_usage, active_connections, requests_per_sec,
    last_heartbeat, created_at, updated_at
"#;

/// Postgres-backed node repository
#[derive(Clone)]
pub struct PgNodeRepository {
    pool: PgPool,
}

impl PgNodeRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_node(row: &PgRow) -> Result<Node> {
        let role: String = row.try_get("role")?;
        let status: String = row.try_get("status")?;
        let port: i32 = row.try_get("port")?;
        let cpu_cores: i32 = row.try_get("cpu_cores")?;
        let memory_gb: i64 = row.try_get("memory_gb")?;
        let disk_gb: i64 = row.try_get("disk_gb")?;
        let active_connections: i64 = row.try_get("active_connections")?;

        Ok(Node {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            port: to_unsigned("port", port)?,
            role: role.parse::<NodeRole>()?,
            status: status.parse::<NodeStatus>()?,
            cpu_cores: to_unsigned("cpu_cores", cpu_cores)?,
            memory_gb: to_unsigned("memory_gb", memory_gb)?,
            disk_gb: to_unsigned("disk_gb", disk_gb)?,
            cpu_usage: row.try_get("cpu_usage")?,
            memory_usage: row.try_get("memory_usage")?,
            disk_usage: row.try_get("disk_usage")?,
            active_connections: to_unsigned("active_connections", active_connections)?,
            requests_per_sec: row.try_get("requests_per_sec")?,
            last_heartbeat: row.try_get("last_heartbeat")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn to_unsigned<S, T>(column: &str, value: S) -> Result<T>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    T::try_from(value)
        .map_err(|_| Error::Internal(format!("column {column} holds out-of-range value {value}")))
}

fn to_signed<S, T>(column: &str, value: S) -> Result<T>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    T::try_from(value)
        .map_err(|_| Error::InvalidInput(format!("{column} value {value} is too large")))
}

#[async_trait]
impl NodeStore for PgNodeRepository {
    async fn load_all(&self) -> Result<Vec<Node>> {
        let rows = sqlx::query(&format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        let nodes = rows
            .iter()
            .map(Self::row_to_node)
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} nodes", nodes.len());
        Ok(nodes)
    }

    async fn insert(&self, node: &Node) -> Result<Node> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO nodes (
                name, address, port, role, status,
                cpu_cores, memory_gb, disk_gb,
                cpu_usage, memory_usage, disk_usage, active_connections, requests_per_sec,
                last_heartbeat, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {NODE_COLUMNS}
            "#
        ))
        .bind(&node.name)
        .bind(&node.address)
        .bind(i32::from(node.port))
        .bind(node.role.as_str())
        .bind(node.status.as_str())
        .bind(to_signed::<_, i32>("cpu_cores", node.cpu_cores)?)
        .bind(to_signed::<_, i64>("memory_gb", node.memory_gb)?)
        .bind(to_signed::<_, i64>("disk_gb", node.disk_gb)?)
        .bind(node.cpu_usage)
        .bind(node.memory_usage)
        .bind(node.disk_usage)
        .bind(to_signed::<_, i64>("active_connections", node.active_connections)?)
        .bind(node.requests_per_sec)
        .bind(node.last_heartbeat)
        .bind(node.created_at)
        .bind(node.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::AlreadyExists(_) => Error::AlreadyExists(format!("node {}", node.name)),
            other => other,
        })?;

        let stored = Self::row_to_node(&row)?;
        debug!(node = %stored.name, id = stored.id, "Inserted node");
        Ok(stored)
    }

    async fn update(&self, node: &Node) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE nodes
            SET status = $2,
                cpu_usage = $3,
                memory_usage = $4,
                disk_usage = $5,
                active_connections = $6,
                requests_per_sec = $7,
                last_heartbeat = $8,
                updated_at = $9
            WHERE name = $1
            "#,
        )
        .bind(&node.name)
        .bind(node.status.as_str())
        .bind(node.cpu_usage)
        .bind(node.memory_usage)
        .bind(node.disk_usage)
        .bind(to_signed::<_, i64>("active_connections", node.active_connections)?)
        .bind(node.requests_per_sec)
        .bind(node.last_heartbeat)
        .bind(node.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("node {}", node.name)));
        }

        debug!(node = %node.name, status = %node.status, "Updated node");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM nodes WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        debug!(node = %name, deleted = result.rows_affected(), "Deleted node");
        Ok(result.rows_affected() > 0)
    }
}
