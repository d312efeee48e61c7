//! Config CLI commands.
//!
//! Commands for managing the Clearbar configuration file.

use std::path::PathBuf;

use clap::Subcommand;

use crate::config::{config_paths, load_config_from_path};
use crate::config::template::{create_config_file, generate_config_template};
use crate::error::ClearbarError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Initialize a new configuration file with all options documented.
    ///
    /// Creates a new configuration file at the default location with all
    /// available options commented out. This allows you to see all possible
    /// configuration options and uncomment the ones you want to use.
    #[command(
        name = "init",
        after_long_help = r#"Examples:
  clearbar config init              # Create config at default location
  clearbar config init --force      # Overwrite existing config
  clearbar config init --path ~/my-config.jsonc  # Create at custom path
  clearbar config init --stdout     # Print template to stdout"#
    )]
    Init {
        /// Overwrite existing configuration file if it exists.
        #[arg(long, short)]
        force: bool,

        /// Custom path for the configuration file.
        /// If not specified, uses ~/.config/clearbar/config.jsonc
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the configuration template to stdout instead of writing to a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Show the path to the configuration file.
    ///
    /// Displays the paths where Clearbar looks for configuration files,
    /// and indicates which one is currently in use (if any).
    Path,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cmd: &ConfigCommands) -> Result<(), ClearbarError> {
    match cmd {
        ConfigCommands::Init { force, path, stdout } => {
            if *stdout {
                print_config_template()
            } else {
                init_config(*force, path.clone())
            }
        }
        ConfigCommands::Path => show_config_path(),
    }
}

/// Print the configuration template to stdout.
#[allow(clippy::unnecessary_wraps)]
fn print_config_template() -> Result<(), ClearbarError> {
    println!("{}", generate_config_template());
    Ok(())
}

/// Initialize a new configuration file.
fn init_config(force: bool, custom_path: Option<PathBuf>) -> Result<(), ClearbarError> {
    let config_path = custom_path.unwrap_or_else(|| {
        config_paths().into_iter().next().unwrap_or_else(|| PathBuf::from("config.jsonc"))
    });

    if config_path.exists() && !force {
        return Err(ClearbarError::ConfigError(format!(
            "Configuration file already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        )));
    }

    create_config_file(&config_path).map_err(|e| {
        ClearbarError::ConfigError(format!(
            "Failed to create config file {}: {e}",
            config_path.display()
        ))
    })?;

    tracing::info!(path = %config_path.display(), "config: template written");
    println!("{}", config_path.display());

    Ok(())
}

/// Lists the search paths, marks the one in use and checks that it parses.
#[allow(clippy::unnecessary_wraps)]
fn show_config_path() -> Result<(), ClearbarError> {
    let paths = config_paths();
    let active = paths.iter().position(|path| path.is_file());

    for (index, path) in paths.iter().enumerate() {
        let marker = match active {
            Some(active) if active == index => " (active)",
            _ if path.exists() => " (shadowed)",
            _ => "",
        };
        println!("{}{marker}", path.display());
    }

    let Some(active) = active.map(|index| &paths[index]) else {
        println!("\nNo configuration file found. Run 'clearbar config init' to create one.");
        return Ok(());
    };

    match load_config_from_path(active) {
        Ok(_) => println!("\n{} is valid.", active.display()),
        Err(err) => println!("\n{} is invalid, defaults are used: {err}", active.display()),
    }

    Ok(())
}
