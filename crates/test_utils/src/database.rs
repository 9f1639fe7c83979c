//! PostgreSQL for integration tests
//!
//! Starts a throwaway Postgres 16 container and applies the ledger schema
//! from `migrations/`. Each [`TestDatabase`] owns its container, which is
//! removed when the value is dropped.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "ledger";
const POSTGRES_PASSWORD: &str = "ledger";
const POSTGRES_DB: &str = "ledger_test";

const SCHEMA: &str = include_str!("../../../migrations/0001_gl_core.sql");

/// Every table of the ledger schema, children first
pub const LEDGER_TABLES: &[&str] = &[
    "reconciliation_matches",
    "reconciliations",
    "bank_statement_entries",
    "bank_transactions",
    "bank_accounts",
    "prepaid_recognitions",
    "prepaid_expenses",
    "loan_payments",
    "loan_schedules",
    "loans",
    "stock_movements",
    "products",
    "gl_postings",
    "journal_lines",
    "journal_entries",
    "journal_counters",
    "default_accounts",
    "accounts",
];

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection URL for a container reachable at `host:port`
pub fn connection_url(host: &str, port: u16) -> String {
    format!(
        "postgres://{}:{}@{}:{}/{}",
        POSTGRES_USER, POSTGRES_PASSWORD, host, port, POSTGRES_DB
    )
}

/// A Postgres container with the ledger schema applied
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    url: String,
    pool: PgPool,
}

impl TestDatabase {
    /// Starts a container and applies the schema
    pub async fn start() -> Result<Self, BoxError> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(5432).await?;
        let url = connection_url(&host, port);

        // Concurrency tests hold several posting transactions open at once.
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of rows in a ledger table
    pub async fn row_count(&self, table: &str) -> Result<i64, BoxError> {
        if !LEDGER_TABLES.contains(&table) {
            return Err(format!("{} is not a ledger table", table).into());
        }

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Empties every ledger table, keeping the schema
    pub async fn reset(&self) -> Result<(), BoxError> {
        let statement = format!("TRUNCATE TABLE {} CASCADE", LEDGER_TABLES.join(", "));
        sqlx::query(&statement).execute(&self.pool).await?;
        Ok(())
    }
}

/// Starts a database for one test
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::start().await
}
