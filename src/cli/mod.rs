//! CLI module
//!
//! Provides the command-line interface:
//! - serve: boot the datastore and enter the serving loop
//! - check: one-shot query parse check

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run_command;
pub use errors::{CliError, CliErrorCode, CliResult};

/// Parses arguments and runs the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
