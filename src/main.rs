//! Evrika CLI entry point.

use anyhow::Result;
use clap::Parser;
use evrika::cli::{commands, log_directive, Cli, Commands};
use evrika::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            log_directive(cli.verbose, &settings.general.log_level)
        })))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    match cli.command {
        Commands::Serve { host, port } => commands::run_serve(host, port, settings).await?,

        Commands::Ingest { url, force } => commands::run_ingest(&url, force, settings).await?,

        Commands::Ask { question, video } => {
            commands::run_ask(&question, video.as_deref(), settings).await?
        }

        Commands::Search { query, video } => {
            commands::run_search(&query, video.as_deref(), settings).await?
        }

        Commands::Brief { video, pdf } => {
            commands::run_brief(&video, pdf.as_deref(), settings).await?
        }

        Commands::Chat => commands::run_chat(settings).await?,

        Commands::List => commands::run_list(settings).await?,

        Commands::Doctor => commands::run_doctor(&settings, cli.config.as_deref())?,

        Commands::Config { action } => {
            commands::run_config(&action, cli.config.as_deref(), settings)?
        }
    }

    Ok(())
}
