use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for any cluster interval or timeout (one week)
pub const MAX_CLUSTER_TIMING_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

/// Database settings. An empty `url` keeps node records in memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// How the health monitor probes a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ProbeKind {
    /// GET `http://address:port{health_path}`, success on 2xx
    #[default]
    Http,
    /// Plain TCP connect to `address:port`
    Tcp,
}

/// Health monitoring and load balancing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Seconds between health monitor ticks
    pub health_check_interval_seconds: u64,
    /// Per-probe timeout
    pub probe_timeout_seconds: u64,
    /// Heartbeats older than this make a node unhealthy
    pub heartbeat_timeout_seconds: u64,
    /// Upper bound on probes in flight during one tick
    pub max_concurrent_probes: usize,
    pub probe_kind: ProbeKind,
    /// Path of the node health endpoint for HTTP probes
    pub health_path: String,
    /// Strategy used by `/cluster/select` when none is given
    pub default_strategy: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            health_check_interval_seconds: 30,
            probe_timeout_seconds: 5,
            heartbeat_timeout_seconds: 120,
            max_concurrent_probes: 16,
            probe_kind: ProbeKind::Http,
            health_path: "/health".to_string(),
            default_strategy: "round_robin".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // OPSDECK__CLUSTER__PROBE_TIMEOUT_SECONDS, etc.
        builder = builder.add_source(
            Environment::with_prefix("OPSDECK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Validate settings, collecting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.http_port == 0 {
            errors.push("server.http_port must be non-zero".to_string());
        }
        if !self.database.url.is_empty()
            && self.database.min_connections > self.database.max_connections
        {
            errors.push("database.min_connections exceeds database.max_connections".to_string());
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            ));
        }

        let cluster = &self.cluster;
        for (key, value) in [
            ("health_check_interval_seconds", cluster.health_check_interval_seconds),
            ("probe_timeout_seconds", cluster.probe_timeout_seconds),
            ("heartbeat_timeout_seconds", cluster.heartbeat_timeout_seconds),
        ] {
            if value == 0 || value > MAX_CLUSTER_TIMING_SECONDS {
                errors.push(format!(
                    "cluster.{key} must be between 1 and {MAX_CLUSTER_TIMING_SECONDS}, got {value}"
                ));
            }
        }
        if cluster.max_concurrent_probes == 0 {
            errors.push("cluster.max_concurrent_probes must be non-zero".to_string());
        }
        if !cluster.health_path.starts_with('/') {
            errors.push("cluster.health_path must start with '/'".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Whether node records are persisted to Postgres
    #[must_use]
    pub fn uses_database(&self) -> bool {
        !self.database.url.is_empty()
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.server.http_port > 0);
        assert!(!config.uses_database());
        assert_eq!(config.cluster.health_check_interval_seconds, 30);
        assert_eq!(config.cluster.probe_timeout_seconds, 5);
        assert_eq!(config.cluster.heartbeat_timeout_seconds, 120);
        assert_eq!(config.cluster.probe_kind, ProbeKind::Http);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.server.http_port = 0;
        config.logging.format = "xml".to_string();
        config.cluster.max_concurrent_probes = 0;
        config.cluster.health_path = "health".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_validate_bounds_cluster_timings() {
        let mut config = Config::default();
        config.cluster.heartbeat_timeout_seconds = 10_000_000_000_000_000;
        config.cluster.probe_timeout_seconds = 0;
        config.cluster.health_check_interval_seconds = MAX_CLUSTER_TIMING_SECONDS;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("heartbeat_timeout_seconds")));
        assert!(errors.iter().any(|e| e.contains("probe_timeout_seconds")));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = std::env::temp_dir().join(format!("opsdeck-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  http_port: 9090\ncluster:\n  probe_kind: tcp\n  health_check_interval_seconds: 10\n",
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.http_port, 9090);
        assert_eq!(config.cluster.probe_kind, ProbeKind::Tcp);
        assert_eq!(config.cluster.health_check_interval_seconds, 10);
        // Unset fields keep their defaults
        assert_eq!(config.cluster.probe_timeout_seconds, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_http_address() {
        let config = Config::default();
        assert_eq!(config.http_address(), "0.0.0.0:8080");
    }
}
