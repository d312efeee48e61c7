//! macOS host integration.
//!
//! - [`app`] - Application lifecycle and the menu bar overlay window
//! - [`layers`] - Core Animation layer host
//! - [`notifications`] - System notification observers and outgoing posts
//! - [`objc`] - Objective-C helper utilities
//! - [`screen`] - `NSScreen` geometry snapshots

pub mod app;
pub mod layers;
pub mod notifications;
pub mod objc;
pub mod screen;

pub use app::run;
