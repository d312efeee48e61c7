//! Error types for Clearbar.
//!
//! This module provides the unified error type returned by CLI commands.
//! Component-level errors (`ProcessingError`, `LocateError`, `LogError`,
//! `ConfigError`) convert into it at the command boundary.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::wallpaper::{LocateError, LogError, ProcessingError};

/// Errors that can occur during application execution.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum ClearbarError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Wallpaper lookup failed.
    #[error("Wallpaper error: {0}")]
    WallpaperError(String),
    /// Image decoding or cropping failed.
    #[error("Image error: {0}")]
    ImageError(String),
    /// Reading the unified log failed.
    #[error("Log error: {0}")]
    LogError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// The requested operation needs the macOS host.
    #[error("Unsupported platform: {0}")]
    Unsupported(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for ClearbarError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for ClearbarError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<ProcessingError> for ClearbarError {
    fn from(err: ProcessingError) -> Self { Self::ImageError(err.to_string()) }
}

impl From<LocateError> for ClearbarError {
    fn from(err: LocateError) -> Self { Self::WallpaperError(err.to_string()) }
}

impl From<LogError> for ClearbarError {
    fn from(err: LogError) -> Self { Self::LogError(err.to_string()) }
}

impl From<ConfigError> for ClearbarError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<String> for ClearbarError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for ClearbarError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}
