//! Structured logging for the control plane
//!
//! Dependency targets (`sqlx`, `hyper`, `reqwest`, `h2`) are capped at `warn`
//! unless `RUST_LOG` is set.

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

/// Dependencies whose default output is too chatty at `info`
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "reqwest=warn", "h2=warn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(format: &str) -> anyhow::Result<Self> {
        match format.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => anyhow::bail!("Unknown log format \"{other}\", expected json or pretty"),
        }
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` replaces the configured level and quiet targets entirely.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let format = LogFormat::parse(&config.format)?;
    let filter = build_filter(&config.level)?;
    let writer = match &config.file_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {path}"))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(false)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .context("a global tracing subscriber is already installed")
}

fn build_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let level = parse_log_level(level)?;
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    QUIET_TARGETS
        .iter()
        .try_fold(EnvFilter::new(level.as_str()), |filter, target| {
            Ok(filter.add_directive(target.parse()?))
        })
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!("Invalid log level: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level(" INFO ").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_log_format() {
        assert_eq!(LogFormat::parse("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn test_filter_quiets_dependencies() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let rendered = build_filter("debug").unwrap().to_string().to_ascii_lowercase();
        assert!(rendered.contains("debug"));
        assert!(rendered.contains("sqlx=warn"));
        assert!(rendered.contains("reqwest=warn"));
    }

    #[test]
    fn test_init_logging_rejects_bad_settings() {
        let bad_level = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(init_logging(&bad_level).is_err());

        let bad_format = LoggingConfig {
            format: "xml".to_string(),
            ..Default::default()
        };
        assert!(init_logging(&bad_format).is_err());
    }
}
