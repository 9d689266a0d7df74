pub mod category;
pub mod group;
pub mod init;
pub mod tree;

use crate::app::App;
use crate::cli::{Cli, Commands};
use crate::config::CliConfig;
use anyhow::Result;
use std::process::ExitCode;

/// How a command that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The request was refused: validation errors, a cancelled save or a
    /// failed check
    Rejected,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Rejected => ExitCode::from(2),
        }
    }
}

pub fn dispatch(cli: Cli, config: CliConfig) -> Result<Status> {
    let format = cli.format;
    match cli.command {
        Commands::Init => init::execute(&config, format),
        Commands::Group(command) => group::execute(&App::open(&config)?, command, format),
        Commands::Category(command) => category::execute(&App::open(&config)?, command, format),
        Commands::Tree(command) => tree::execute(&App::open(&config)?, command, format),
    }
}
