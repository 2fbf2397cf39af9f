//! `streamalert` -- command-line entry point for the rule processor.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use streamalert_core::config::{GeneralConfig, StreamAlertConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = if cli.command.needs_config() {
        Some(Arc::new(load_config(&cli.config).await?))
    } else {
        None
    };

    let mut general = config
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_else(GeneralConfig::default);
    if let Some(level) = cli.log_level {
        general.log_level = level;
    }
    logging::init_tracing(&general).map_err(|e| CliError::Config(e.to_string()))?;
    streamalert_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "streamalert starting");

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Process(args) => {
            let config = config.ok_or_else(|| {
                CliError::Config("process requires a configuration".to_owned())
            })?;
            commands::process::execute(args, config, &writer).await
        }
        Commands::Rules(args) => commands::rules::execute(args, config.as_deref(), &writer).await,
    }
}

/// Load and validate the configuration once for the whole run.
async fn load_config(path: &Path) -> Result<StreamAlertConfig, CliError> {
    Ok(StreamAlertConfig::load(path).await?)
}
