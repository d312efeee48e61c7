//! Small shared utilities.
//!
//! - [`command`] - Locating external tools on `PATH` and well-known prefixes

pub mod command;
