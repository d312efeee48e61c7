//! Platform integration.
//!
//! - [`thread`] - Named background threads and main-thread dispatch
//! - `macos` - `AppKit`, Core Animation and notification glue (macOS only)

#[cfg(target_os = "macos")]
pub mod macos;
pub mod thread;
