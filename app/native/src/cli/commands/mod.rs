//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `config_cmd` - Configuration file management commands
//! - `run` - Starting the effect (overlay or headless)
//! - `types` - Shared argument types
//! - `wallpaper` - Wallpaper locate, crop and watch commands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{self, ClearbarConfig};
use crate::error::ClearbarError;

pub mod config_cmd;
pub mod run;
pub mod types;
pub mod wallpaper;

pub use config_cmd::ConfigCommands;
pub use run::RunArgs;
pub use types::OsArg;
pub use wallpaper::CropArgs;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Clearbar - a wallpaper-aware translucent menu bar backdrop for macOS.
#[derive(Parser, Debug)]
#[command(name = "clearbar")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments) and `~`.
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Enable debug logging. `RUST_LOG` takes precedence when set.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Start the effect over the menu bar. This is the default command.
    #[command(after_long_help = r#"Examples:
  clearbar run                                              # Draw over the menu bar
  clearbar run --headless                                   # Follow the wallpaper, log commits
  clearbar run --headless --image ~/wall.jpg --display 3024x1964@2 --once"#)]
    Run(RunArgs),

    /// Print the URL of the wallpaper shown on the main display.
    ///
    /// Dynamic and shuffling wallpapers are resolved through the system log,
    /// looking back two minutes, or two seconds with --current.
    Locate {
        /// Only accept a wallpaper resolved within the last few seconds.
        #[arg(long)]
        current: bool,
    },

    /// Crop the menu bar strip out of a wallpaper image.
    #[command(after_long_help = r#"Examples:
  clearbar crop ~/wall.heic --width 3024 --height 1964 --menu-bar-height 74 -o strip.png"#)]
    Crop(CropArgs),

    /// Print wallpaper change events as JSON lines.
    Watch,

    /// Print the menu bar height, in points, for an OS version.
    #[command(name = "menu-bar-height")]
    MenuBarHeight {
        /// OS version, e.g. 15 or 26.0.1.
        #[arg(long, value_name = "VERSION")]
        os: OsArg,

        /// The display has a camera housing.
        #[arg(long)]
        notch: bool,

        /// Also print the height in pixels for this backing scale.
        #[arg(long, value_name = "SCALE")]
        scale: Option<f64>,
    },

    /// Configuration file management commands.
    ///
    /// Initialize and locate the configuration file.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output Clearbar configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with editors
    /// that support JSON Schema validation.
    Schema,
}

/// Expands `~` and makes relative paths absolute against the working directory.
fn resolve_config_path(raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw.trim()).as_ref());
    if expanded.is_absolute() {
        return expanded;
    }
    std::env::current_dir().map_or_else(|_| expanded.clone(), |cwd| cwd.join(&expanded))
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_deref().map(resolve_config_path) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), ClearbarError> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(ClearbarError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        match &self.command {
            None => run::execute(&RunArgs::default(), config::init()),
            Some(Commands::Run(args)) => run::execute(args, config::init()),
            Some(Commands::Locate { current }) => wallpaper::execute_locate(*current, config::init()),
            Some(Commands::Crop(args)) => wallpaper::execute_crop(args),
            Some(Commands::Watch) => wallpaper::execute_watch(),
            Some(Commands::MenuBarHeight { os, notch, scale }) => {
                print_menu_bar_height(config::init(), *os, *notch, *scale);
                Ok(())
            }
            Some(Commands::Config(cmd)) => config_cmd::execute(cmd),
            Some(Commands::Schema) => {
                println!("{}", serde_json::to_string_pretty(&config::config_schema())?);
                Ok(())
            }
        }
    }
}

fn print_menu_bar_height(config: &ClearbarConfig, os: OsArg, notch: bool, scale: Option<f64>) {
    let points = config.menu_bar_height.height_points(os.0.major, notch);
    match scale {
        Some(scale) => println!("{points}pt ({}px)", (f64::from(points) * scale).round()),
        None => println!("{points}"),
    }
}
