use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::engine::RevisionEngine;
use folio_db::PgStorage;

mod cli;
mod commands;
mod config;

use cli::Cli;
use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=info,folio_core=info,folio_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = AppConfig::from_env()?;
    tracing::debug!(
        max_connections = config.max_connections,
        default_locale = %config.engine.default_locale,
        "Loaded configuration"
    );

    // --- Database ---
    let pool = folio_db::create_pool(&config.database_url, config.max_connections).await?;
    folio_db::health_check(&pool).await?;
    tracing::debug!("Database health check passed");

    let engine = RevisionEngine::new(PgStorage::new(pool.clone()), config.engine);
    commands::run(cli.command, pool, &engine).await
}
