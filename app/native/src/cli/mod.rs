//! CLI module for Clearbar.
//!
//! Running `clearbar` without a subcommand starts the effect; the other
//! commands expose the wallpaper pipeline and configuration from the shell.

mod commands;

use clap::Parser;
pub use commands::Cli;

use crate::error::ClearbarError;

/// Runs the CLI.
///
/// Parses command-line arguments, installs logging and executes the command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), ClearbarError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);
    cli.execute()
}
