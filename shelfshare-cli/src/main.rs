//! `shelfshare` -- ShelfShare favorites from the command line.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use shelfshare_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let (config_path, explicit) = cli.config_source();
    let loaded = commands::load_config(&config_path, explicit).await;

    // Logging comes up even when the config is broken, so `config validate`
    // can still report.
    let mut general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    logging::init_tracing(&general).map_err(|e| CliError::Config(e.to_string()))?;

    debug!(config = %config_path.display(), explicit, "shelfshare starting");

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, &config_path, loaded, &writer),
        Commands::Health => commands::health::execute(&loaded?, &writer).await,
        Commands::Favorites(args) => commands::favorites::execute(args, &loaded?, &writer).await,
    }
}
