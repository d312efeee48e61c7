//! Effect configuration and per-appearance filter parameters.

use std::f64::consts::PI;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::layers::CompositingFilter;
use crate::config::color::Rgba;

/// System light/dark appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    #[default]
    Light,
    Dark,
}

impl Appearance {
    /// Maps the `AppleInterfaceStyle` default (`"Dark"` or absent) to an appearance.
    #[must_use]
    pub fn from_interface_style(style: Option<&str>) -> Self {
        match style {
            Some(style) if style.eq_ignore_ascii_case("dark") => Self::Dark,
            _ => Self::Light,
        }
    }
}

/// A color that may differ between appearances. Resolved each time it is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorProvider {
    Fixed(Rgba),
    Adaptive { light: Rgba, dark: Rgba },
}

impl ColorProvider {
    #[must_use]
    pub const fn resolve(&self, appearance: Appearance) -> Rgba {
        match (self, appearance) {
            (Self::Fixed(color), _) => *color,
            (Self::Adaptive { light, .. }, Appearance::Light) => *light,
            (Self::Adaptive { dark, .. }, Appearance::Dark) => *dark,
        }
    }
}

impl Default for ColorProvider {
    fn default() -> Self { Self::Fixed(Rgba::TRANSPARENT) }
}

/// Caller-supplied look of the backdrop and tint layers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Effect {
    pub background_color: ColorProvider,
    pub tint_color: ColorProvider,
    pub tint_filter: Option<CompositingFilter>,
}

impl Effect {
    /// Blur only; transparent colors and no tint filter.
    #[must_use]
    pub fn clear() -> Self { Self::default() }
}

/// Backdrop filter values for one appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackdropTuning {
    pub brightness: f64,
    pub contrast: f64,
    pub invert: bool,
    pub hue_rotate: bool,
    /// Hue rotation angle in radians.
    pub hue_angle: f64,
}

impl BackdropTuning {
    pub const LIGHT: Self = Self {
        brightness: 0.0919,
        contrast: 1.166,
        invert: true,
        hue_rotate: true,
        hue_angle: PI,
    };

    pub const DARK: Self = Self {
        brightness: -0.063,
        contrast: 1.14,
        invert: false,
        hue_rotate: false,
        hue_angle: PI,
    };
}

/// One [`BackdropTuning`] row per appearance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppearanceTable {
    pub light: BackdropTuning,
    pub dark: BackdropTuning,
}

impl Default for AppearanceTable {
    fn default() -> Self {
        Self {
            light: BackdropTuning::LIGHT,
            dark: BackdropTuning::DARK,
        }
    }
}

impl AppearanceTable {
    #[must_use]
    pub const fn row(&self, appearance: Appearance) -> BackdropTuning {
        match appearance {
            Appearance::Light => self.light,
            Appearance::Dark => self.dark,
        }
    }
}

/// Everything the layers need for one appearance, fully resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParameters {
    pub background_color: Rgba,
    pub tint_color: Rgba,
    pub tint_filter: Option<CompositingFilter>,
    pub brightness: f64,
    pub contrast: f64,
    pub invert_enabled: bool,
    pub hue_rotate_enabled: bool,
    pub hue_angle: f64,
    pub exposure: f64,
}

impl EffectParameters {
    /// Selects the row for `appearance` and resolves the effect colors against it.
    #[must_use]
    pub const fn resolve(
        effect: &Effect,
        appearance: Appearance,
        table: &AppearanceTable,
        exposure: f64,
    ) -> Self {
        let row = table.row(appearance);
        Self {
            background_color: effect.background_color.resolve(appearance),
            tint_color: effect.tint_color.resolve(appearance),
            tint_filter: effect.tint_filter,
            brightness: row.brightness,
            contrast: row.contrast,
            invert_enabled: row.invert,
            hue_rotate_enabled: row.hue_rotate,
            hue_angle: row.hue_angle,
            exposure,
        }
    }
}
