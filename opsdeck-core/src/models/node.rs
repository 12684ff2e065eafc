use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Role a node plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum NodeRole {
    Master,
    #[default]
    Worker,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Self::Master),
            "worker" => Ok(Self::Worker),
            other => Err(Error::InvalidInput(format!("unknown node role: {other}"))),
        }
    }
}

/// Lifecycle status of a node
///
/// `Draining` is sticky: only an explicit status update moves a node out of it.
/// `Offline` is administrative and excluded from health probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum NodeStatus {
    #[default]
    Healthy,
    Unhealthy,
    Draining,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Draining => "draining",
            Self::Offline => "offline",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Draining)
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Self::Healthy),
            "unhealthy" => Ok(Self::Unhealthy),
            "draining" => Ok(Self::Draining),
            "offline" => Ok(Self::Offline),
            other => Err(Error::InvalidInput(format!("unknown node status: {other}"))),
        }
    }
}

/// A managed worker unit tracked by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub role: NodeRole,
    pub status: NodeStatus,

    // Capacity, fixed at registration
    pub cpu_cores: u32,
    pub memory_gb: u64,
    pub disk_gb: u64,

    // Utilization, mutated by metric updates
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub active_connections: u64,
    pub requests_per_sec: f64,

    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Build an unsaved node from a registration request.
    ///
    /// `id` stays 0 until a store assigns one.
    #[must_use]
    pub fn from_new(new: NewNode, now: DateTime<Utc>) -> Self {
        let metrics = new.metrics.unwrap_or_default();
        Self {
            id: 0,
            name: new.name,
            address: new.address,
            port: new.port,
            role: new.role,
            status: new.status,
            cpu_cores: new.cpu_cores,
            memory_gb: new.memory_gb,
            disk_gb: new.disk_gb,
            cpu_usage: metrics.cpu_usage,
            memory_usage: metrics.memory_usage,
            disk_usage: metrics.disk_usage,
            active_connections: metrics.active_connections,
            requests_per_sec: metrics.requests_per_sec,
            last_heartbeat: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the five utilization fields
    pub fn apply_metrics(&mut self, metrics: &NodeMetrics) {
        self.cpu_usage = metrics.cpu_usage;
        self.memory_usage = metrics.memory_usage;
        self.disk_usage = metrics.disk_usage;
        self.active_connections = metrics.active_connections;
        self.requests_per_sec = metrics.requests_per_sec;
    }

    /// Current utilization as a metrics value
    #[must_use]
    pub fn metrics(&self) -> NodeMetrics {
        NodeMetrics {
            cpu_usage: self.cpu_usage,
            memory_usage: self.memory_usage,
            disk_usage: self.disk_usage,
            active_connections: self.active_connections,
            requests_per_sec: self.requests_per_sec,
        }
    }

    /// `host:port` endpoint advertised by the node
    #[must_use]
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    /// Whether the last heartbeat is older than `timeout` at `now`
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_heartbeat) > timeout
    }
}

/// Registration request for a new node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNode {
    pub name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub role: NodeRole,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub cpu_cores: u32,
    #[serde(default)]
    pub memory_gb: u64,
    #[serde(default)]
    pub disk_gb: u64,
    /// Initial utilization, zero when omitted
    #[serde(default)]
    pub metrics: Option<NodeMetrics>,
}

impl NewNode {
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            role: NodeRole::Worker,
            status: NodeStatus::Healthy,
            cpu_cores: 0,
            memory_gb: 0,
            disk_gb: 0,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, cpu_cores: u32, memory_gb: u64, disk_gb: u64) -> Self {
        self.cpu_cores = cpu_cores;
        self.memory_gb = memory_gb;
        self.disk_gb = disk_gb;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: NodeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate caller-supplied fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("node name must not be empty".to_string()));
        }
        if self.name.len() > 255 {
            return Err(Error::InvalidInput("node name is too long".to_string()));
        }
        if self.address.trim().is_empty() {
            return Err(Error::InvalidInput("node address must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::InvalidInput("node port must be non-zero".to_string()));
        }
        if i32::try_from(self.cpu_cores).is_err() {
            return Err(Error::InvalidInput(format!(
                "cpu_cores must be at most {}, got {}",
                i32::MAX,
                self.cpu_cores
            )));
        }
        for (field, value) in [("memory_gb", self.memory_gb), ("disk_gb", self.disk_gb)] {
            if i64::try_from(value).is_err() {
                return Err(Error::InvalidInput(format!(
                    "{field} must be at most {}, got {value}",
                    i64::MAX
                )));
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.validate()?;
        }
        Ok(())
    }
}

/// Utilization snapshot reported by a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub active_connections: u64,
    pub requests_per_sec: f64,
}

impl NodeMetrics {
    /// Percentages must lie in `[0, 100]`, the request rate must be non-negative
    /// and the connection count must fit a signed 64-bit column
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            ("cpu_usage", self.cpu_usage),
            ("memory_usage", self.memory_usage),
            ("disk_usage", self.disk_usage),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "{field} must be between 0 and 100, got {value}"
                )));
            }
        }
        if !self.requests_per_sec.is_finite() || self.requests_per_sec < 0.0 {
            return Err(Error::InvalidInput(format!(
                "requests_per_sec must be non-negative, got {}",
                self.requests_per_sec
            )));
        }
        if i64::try_from(self.active_connections).is_err() {
            return Err(Error::InvalidInput(format!(
                "active_connections must be at most {}, got {}",
                i64::MAX,
                self.active_connections
            )));
        }
        Ok(())
    }
}
