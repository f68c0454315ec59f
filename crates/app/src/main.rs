use anyhow::Context;
use api::ApiServer;
use clap::Parser;
use services::{AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod db;
mod seed;

use cli::{Cli, Command};
use config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("tactile error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config =
        AppConfig::load_with_dotenv(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database.url = db;
    }
    init_tracing(&config.log.filter)?;

    let db_url = db::normalize_sqlite_url(&config.database.url);
    db::prepare_sqlite_file(&db_url)?;
    let services =
        AppServices::new_sqlite(&db_url, config.database.store_options(), Clock::default_clock())
            .await
            .with_context(|| format!("failed to open database {db_url}"))?;

    match cli.command {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.server.bind_addr());
            let server = ApiServer::start(addr.as_str(), services)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(url = %server.url("/"), "serving; press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            server.shutdown().await;
        }
        Command::Migrate => {
            let status = services.ensure_schema().await?;
            println!(
                "students={} learning_sessions={} assessment_sessions={} active_sessions={} ready={}",
                status.students,
                status.learning_sessions,
                status.assessment_sessions,
                status.active_sessions,
                status.is_complete()
            );
        }
        Command::Seed => {
            let report = seed::run(&services).await?;
            println!(
                "seeded {} new students, {} sessions, {} answers",
                report.students, report.sessions, report.answers
            );
        }
    }
    Ok(())
}

fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
