mod cli;
mod commands;
mod config;
mod services;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Settings;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Parse CLI args
    let cli = Cli::parse();

    // Handle init command early (doesn't need config)
    if let Commands::Init { path } = &cli.command {
        seeker_engine::init_logging(cli.debug);
        return commands::init::run_init(path);
    }

    // Load config
    let settings = Settings::load(cli.config.as_deref())?;
    seeker_engine::init_logging(cli.debug || settings.server.debug);

    for warning in settings.validate()? {
        warn!("{}", warning);
    }

    // Dispatch to command
    match cli.command {
        Commands::Init { .. } => {
            // Already handled above
            unreachable!()
        }
        Commands::Index => commands::index::execute(&settings).await?,
        Commands::Search {
            query,
            filters,
            json,
        } => commands::search::execute(&settings, &query, filters.as_deref(), json).await?,
        Commands::Stats => commands::stats::execute(&settings)?,
        Commands::Serve { host, port, watch } => {
            commands::serve::execute(&settings, host, port, watch).await?
        }
    }

    Ok(())
}
