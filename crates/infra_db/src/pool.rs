//! Connection pool and schema migrations

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

pub type DatabasePool = PgPool;

/// Pool settings
///
/// ```rust
/// use std::time::Duration;
/// use infra_db::DatabaseConfig;
///
/// let config = DatabaseConfig::new("postgres://localhost/ledger")
///     .max_connections(20)
///     .lock_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub connect_timeout: Duration,
    /// Upper bound on waiting for a row lock. Postings queue on the
    /// company's journal counter, so a stuck writer would otherwise stall
    /// every other posting for that company.
    pub lock_timeout: Option<Duration>,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            lock_timeout: None,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/ledger")
    }
}

/// Opens a pool with the given settings
///
/// # Errors
///
/// Returns `DatabaseError::ConnectionFailed` if no connection can be made
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        lock_timeout_ms = config.lock_timeout.map(|t| t.as_millis() as u64),
        "creating database pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout);

    if let Some(timeout) = config.lock_timeout {
        let millis = timeout.as_millis();
        options = options.after_connect(move |conn, _meta| {
            Box::pin(async move {
                let statement = format!("SET lock_timeout = {}", millis);
                sqlx::query(&statement).execute(&mut *conn).await?;
                Ok(())
            })
        });
    }

    let pool = options
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("database pool ready");
    Ok(pool)
}

/// Applies the schema migrations bundled from `migrations/`
///
/// # Errors
///
/// Returns `DatabaseError::MigrationFailed` if any migration does not apply
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

    info!("database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::new("postgres://test")
            .max_connections(50)
            .min_connections(10)
            .connect_timeout(Duration::from_secs(60))
            .lock_timeout(Duration::from_secs(5));

        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 10);
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.lock_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_config_defaults() {
        let config = DatabaseConfig::default();

        assert_eq!(config.url, "postgres://localhost/ledger");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(config.lock_timeout.is_none());
    }
}
