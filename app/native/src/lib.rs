//! Clearbar - a wallpaper-aware translucent menu bar backdrop for macOS.
//!
//! The menu bar band is drawn as a live blur of what lies below it, tinted,
//! with a strip of the current wallpaper screen-blended on top so the bar
//! follows dynamic and shuffling wallpapers.
//!
//! The pipeline is portable: wallpaper discovery ([`wallpaper`]), the change
//! event bus ([`events`]), the compositor state machine ([`compositor`]) and
//! the main scheduling context ([`runtime`]). The macOS window server glue
//! lives in [`platform`].

pub mod cli;
pub mod compositor;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod events;
pub mod logging;
pub mod platform;
pub mod runtime;
pub mod utils;
pub mod wallpaper;
