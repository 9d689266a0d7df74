use clap::Parser;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use canopy_cli::{
    cli::{Cli, LogLevel},
    commands,
    config::{CliConfig, Overrides},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(
        cli.config.clone(),
        Overrides {
            db_path: cli.db_path.clone(),
            templates_path: cli.templates.clone(),
        },
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // Priority: --log-level > --verbose > config file > warn
    let level = cli
        .log_level
        .or(cli.verbose.then_some(LogLevel::Debug))
        .or_else(|| config.log_level())
        .unwrap_or(LogLevel::Warn);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(db = %config.database.path.display(), "Configuration loaded");

    match commands::dispatch(cli, config) {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
