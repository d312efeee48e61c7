//! Clearbar - wallpaper-aware translucent menu bar backdrop for macOS.
//!
//! This binary serves as both the overlay application and CLI:
//! - When called with no arguments: starts the effect over the menu bar
//! - When called with subcommands (e.g., `clearbar locate`): runs CLI commands

fn main() {
    if let Err(err) = clearbar_lib::cli::run() {
        eprintln!("clearbar: {err}");
        std::process::exit(1);
    }
}
