//! Postgres pool for the durable node store

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::Config;

/// Pool settings derived from `database.*`
#[must_use]
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

/// Connection string with any password replaced, safe to log
#[must_use]
pub fn redacted_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

/// Connect the node store pool
///
/// Migrations are applied by the binary after this returns.
pub async fn init_database(config: &Config) -> Result<PgPool> {
    let database = &config.database;
    let target = redacted_url(&database.url);

    let pool = pool_options(database)
        .connect(&database.url)
        .await
        .with_context(|| format!("cannot connect node store at {target}"))?;

    info!(
        database = %target,
        max_connections = database.max_connections,
        "Node store connected"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_follow_config() {
        let config = DatabaseConfig {
            max_connections: 4,
            min_connections: 2,
            connect_timeout_seconds: 3,
            ..DatabaseConfig::default()
        };
        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 4);
        assert_eq!(options.get_min_connections(), 2);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_redacted_url_hides_password() {
        assert_eq!(
            redacted_url("postgres://opsdeck:s3cret@db:5432/opsdeck"),
            "postgres://opsdeck:***@db:5432/opsdeck"
        );
        assert_eq!(
            redacted_url("postgres://db:5432/opsdeck"),
            "postgres://db:5432/opsdeck"
        );
        assert_eq!(redacted_url("not a url"), "not a url");
    }
}
