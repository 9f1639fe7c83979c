//! Ledger jobs binary
//!
//! ```bash
//! ledger-jobs migrate
//! ledger-jobs seed-chart --company <uuid>
//! ledger-jobs recognize-prepaid --company <uuid> --as-of 2024-03-31
//! ledger-jobs accrue-interest --company <uuid>
//! ledger-jobs upcoming-payments --company <uuid> --days 14
//! ```
//!
//! Configuration is read from `LEDGER__*` variables (see
//! [`interface_jobs::JobsConfig`]); a `.env` file is loaded first if present.
//! `RUST_LOG` controls the log filter.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interface_jobs::{migrate, Cli, Command, JobRunner, JobsConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = JobsConfig::load().context("loading configuration")?;
    init_tracing(config.log_format);

    let pool = infra_db::create_pool(config.database.pool_config())
        .await
        .context("connecting to the database")?;

    match cli.command {
        Command::Migrate => migrate(&pool).await?,
        Command::Job(job) => {
            let company = job.company();
            let runner = JobRunner::postgres(pool, config.posting);
            let output = runner
                .run(job, Utc::now().date_naive())
                .await
                .with_context(|| format!("job failed for company {}", company))?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
