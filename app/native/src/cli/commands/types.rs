//! Shared types for CLI commands.
//!
//! This module contains argument types that are used across multiple CLI command modules.

use std::str::FromStr;

use crate::display::{Display, OsVersion};

/// Pixel geometry of a display given on the command line as
/// `WIDTHxHEIGHT[@SCALE]`, for example `3024x1964@2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySpec {
    pub width_px: u32,
    pub height_px: u32,
    pub backing_scale: f64,
}

impl DisplaySpec {
    /// Builds a display snapshot with an explicit menu bar height in points.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_display(self, menu_bar_height_pt: u32) -> Display {
        Display {
            id: 0,
            width_px: self.width_px,
            height_px: self.height_px,
            menu_bar_height_px: (f64::from(menu_bar_height_pt) * self.backing_scale).round() as u32,
            backing_scale: self.backing_scale,
        }
    }
}

impl FromStr for DisplaySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid display '{s}'. Expected WIDTHxHEIGHT or WIDTHxHEIGHT@SCALE");

        let (size, scale) = match s.split_once('@') {
            Some((size, scale)) => (size, scale.trim().parse::<f64>().map_err(|_| invalid())?),
            None => (s, 1.0),
        };
        let (width, height) = size.to_lowercase().split_once('x').map_or_else(
            || Err(invalid()),
            |(w, h)| Ok((w.trim().parse::<u32>(), h.trim().parse::<u32>())),
        )?;
        let (Ok(width_px), Ok(height_px)) = (width, height) else {
            return Err(invalid());
        };

        if width_px == 0 || height_px == 0 || !scale.is_finite() || scale <= 0.0 {
            return Err(invalid());
        }

        Ok(Self { width_px, height_px, backing_scale: scale })
    }
}

/// An OS version argument such as `15`, `15.3` or `26.0.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsArg(pub OsVersion);

impl FromStr for OsArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OsVersion::parse(s)
            .map(Self)
            .ok_or_else(|| format!("Invalid OS version '{s}'. Expected MAJOR[.MINOR[.PATCH]]"))
    }
}
