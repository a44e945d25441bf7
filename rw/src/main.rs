//! Runwaiter CLI entry point

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use runwaiter::cli::{Cli, Command};
use runwaiter::config::Config;
use runwaiter::daemon;

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::CheckConfig) => {
            config.validate()?;
            let rendered = serde_yaml::to_string(&config).context("Failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
        Some(Command::Run) | None => daemon::run(&config).await,
    }
}
