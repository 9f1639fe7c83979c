//! Job runner configuration
//!
//! Values come from an optional `config/ledger.toml`, then from `LEDGER__*`
//! environment variables, nested with `__`:
//!
//! * `LEDGER__DATABASE__URL` - PostgreSQL connection string (falls back to `DATABASE_URL`)
//! * `LEDGER__DATABASE__MAX_CONNECTIONS`, `LEDGER__DATABASE__MIN_CONNECTIONS`
//! * `LEDGER__DATABASE__CONNECT_TIMEOUT_SECS`, `LEDGER__DATABASE__LOCK_TIMEOUT_MS`
//! * `LEDGER__POSTING__ESTIMATED_COGS_RATIO`, `LEDGER__POSTING__JOURNAL_PREFIX`
//! * `LEDGER__LOG_FORMAT` - `text` or `json`

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use domain_ledger::PostingPolicy;
use infra_db::DatabaseConfig;

const CONFIG_FILE: &str = "config/ledger.toml";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Connection settings for the job runner's pool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub lock_timeout_ms: Option<u64>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let pool = DatabaseConfig::default();
        Self {
            url: pool.url,
            max_connections: pool.max_connections,
            min_connections: pool.min_connections,
            connect_timeout_secs: pool.connect_timeout.as_secs(),
            lock_timeout_ms: None,
        }
    }
}

impl DatabaseSettings {
    /// Pool configuration for these settings
    pub fn pool_config(&self) -> DatabaseConfig {
        let config = DatabaseConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs));

        match self.lock_timeout_ms {
            Some(ms) => config.lock_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}

/// Job runner configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub database: DatabaseSettings,
    pub posting: PostingPolicy,
    pub log_format: LogFormat,
}

impl JobsConfig {
    /// Loads configuration from the optional file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let environment = Environment::with_prefix("LEDGER").separator("__").try_parsing(true);
        Self::from_sources(environment, std::env::var("DATABASE_URL").ok())
    }

    fn from_sources(environment: Environment, fallback_url: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::with_name(CONFIG_FILE).required(false));
        if let Some(url) = fallback_url {
            builder = builder.set_default("database.url", url)?;
        }

        builder.add_source(environment).build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let source = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();

        Environment::with_prefix("LEDGER")
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = JobsConfig::from_sources(environment(&[]), None).unwrap();

        assert_eq!(config, JobsConfig::default());
        assert_eq!(config.database.url, "postgres://localhost/ledger");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.posting.estimated_cogs_ratio, dec!(0.6));
    }

    #[test]
    fn test_environment_overrides() {
        let config = JobsConfig::from_sources(
            environment(&[
                ("LEDGER__DATABASE__URL", "postgres://db/books"),
                ("LEDGER__DATABASE__MAX_CONNECTIONS", "4"),
                ("LEDGER__DATABASE__LOCK_TIMEOUT_MS", "5000"),
                ("LEDGER__POSTING__JOURNAL_PREFIX", "GL"),
                ("LEDGER__LOG_FORMAT", "json"),
            ]),
            None,
        )
        .unwrap();

        assert_eq!(config.database.url, "postgres://db/books");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.lock_timeout_ms, Some(5000));
        assert_eq!(config.posting.journal_prefix, "GL");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_database_url_fallback_loses_to_prefixed_variable() {
        let fallback = Some("postgres://fallback/ledger".to_string());

        let plain = JobsConfig::from_sources(environment(&[]), fallback.clone()).unwrap();
        let prefixed = JobsConfig::from_sources(
            environment(&[("LEDGER__DATABASE__URL", "postgres://primary/ledger")]),
            fallback,
        )
        .unwrap();

        assert_eq!(plain.database.url, "postgres://fallback/ledger");
        assert_eq!(prefixed.database.url, "postgres://primary/ledger");
    }

    #[test]
    fn test_pool_config_carries_settings() {
        let settings = DatabaseSettings {
            url: "postgres://db/books".to_string(),
            max_connections: 3,
            min_connections: 1,
            connect_timeout_secs: 5,
            lock_timeout_ms: Some(2500),
        };

        let pool = settings.pool_config();

        assert_eq!(pool.url, "postgres://db/books");
        assert_eq!(pool.max_connections, 3);
        assert_eq!(pool.min_connections, 1);
        assert_eq!(pool.connect_timeout, Duration::from_secs(5));
        assert_eq!(pool.lock_timeout, Some(Duration::from_millis(2500)));
    }
}
