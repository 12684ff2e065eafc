//! Startup configuration discovery

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::Config;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "OPSDECK_CONFIG_PATH";

/// Locations tried, in order, when no explicit path is given
const DEFAULT_CONFIG_PATHS: &[&str] = &["config.yaml", "/etc/opsdeck/config.yaml"];

/// Resolve the config file to read, if any
///
/// An explicit path must exist; a missing default location is simply skipped.
pub fn find_config_file(explicit: Option<&str>, defaults: &[&str]) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        let path = PathBuf::from(path);
        anyhow::ensure!(
            path.is_file(),
            "{CONFIG_PATH_ENV} points at {}, which is not a file",
            path.display()
        );
        return Ok(Some(path));
    }

    Ok(defaults
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf))
}

/// Load and validate the server configuration
///
/// Reads the file from [`find_config_file`] when there is one, then applies
/// `OPSDECK__SECTION__KEY` overrides. Any parse or validation failure aborts
/// startup.
pub fn load_config() -> Result<Config> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok();
    let path = find_config_file(explicit.as_deref(), DEFAULT_CONFIG_PATHS)?;

    let config = match &path {
        Some(path) => {
            let path = path.to_string_lossy();
            Config::load(Some(&*path)).with_context(|| format!("invalid config file {path}"))?
        }
        None => Config::from_env().context("invalid OPSDECK__* environment settings")?,
    };

    config.validate().map_err(|errors| {
        anyhow::anyhow!(
            "{} configuration error(s): {}",
            errors.len(),
            errors.join("; ")
        )
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_must_exist() {
        let err = find_config_file(Some("/nonexistent/opsdeck.yaml"), &[]).unwrap_err();
        assert!(err.to_string().contains(CONFIG_PATH_ENV));
    }

    #[test]
    fn test_first_existing_default_wins() {
        let dir = std::env::temp_dir().join(format!("opsdeck-find-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let present = dir.join("present.yaml");
        std::fs::write(&present, "server:\n  http_port: 9000\n").unwrap();
        let missing = dir.join("missing.yaml");

        let defaults = [missing.to_str().unwrap(), present.to_str().unwrap()];
        let found = find_config_file(None, &defaults).unwrap();
        assert_eq!(found.as_deref(), Some(present.as_path()));

        assert!(find_config_file(None, &[missing.to_str().unwrap()])
            .unwrap()
            .is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
