//! Configuration types for Clearbar.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//! Every field is optional; missing fields take their built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::color::parse_color;
use crate::compositor::{
    AppearanceTable, BackdropTuning, ColorProvider, CompositingFilter, CompositorSettings, Effect,
};
use crate::constants::effect::{EXPOSURE_BASELINE_EV, TRANSITION_DURATION_SECS};
use crate::display::MenuBarHeightTable;
use crate::wallpaper::RecencyWindows;

/// A color given once, or once per appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ColorValue {
    /// `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `rgba(r, g, b, a)` or `clear`.
    Single(String),
    Adaptive { light: String, dark: String },
}

impl ColorValue {
    /// Parses the color strings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a color cannot be parsed.
    pub fn to_provider(&self) -> Result<ColorProvider, ConfigError> {
        match self {
            Self::Single(value) => Ok(ColorProvider::Fixed(parse_color(value).map_err(ConfigError::InvalidValue)?)),
            Self::Adaptive { light, dark } => Ok(ColorProvider::Adaptive {
                light: parse_color(light).map_err(ConfigError::InvalidValue)?,
                dark: parse_color(dark).map_err(ConfigError::InvalidValue)?,
            }),
        }
    }
}

/// Colors and blend mode of the backdrop and tint layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectConfig {
    /// Background color of the blur layer. Defaults to transparent.
    pub background_color: Option<ColorValue>,
    /// Color of the tint layer. Defaults to transparent.
    pub tint_color: Option<ColorValue>,
    /// Compositing filter of the tint layer.
    pub tint_filter: Option<CompositingFilter>,
}

impl EffectConfig {
    /// Builds the compositor effect.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a color cannot be parsed.
    pub fn to_effect(&self) -> Result<Effect, ConfigError> {
        let provider = |value: Option<&ColorValue>| {
            value.map_or_else(|| Ok(ColorProvider::default()), ColorValue::to_provider)
        };

        Ok(Effect {
            background_color: provider(self.background_color.as_ref())?,
            tint_color: provider(self.tint_color.as_ref())?,
            tint_filter: self.tint_filter,
        })
    }
}

/// Partial override of a built-in [`BackdropTuning`] row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TuningOverride {
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
    pub invert: Option<bool>,
    pub hue_rotate: Option<bool>,
    /// Radians.
    pub hue_angle: Option<f64>,
}

impl TuningOverride {
    #[must_use]
    pub fn apply(&self, base: BackdropTuning) -> BackdropTuning {
        BackdropTuning {
            brightness: self.brightness.unwrap_or(base.brightness),
            contrast: self.contrast.unwrap_or(base.contrast),
            invert: self.invert.unwrap_or(base.invert),
            hue_rotate: self.hue_rotate.unwrap_or(base.hue_rotate),
            hue_angle: self.hue_angle.unwrap_or(base.hue_angle),
        }
    }
}

/// Backdrop overrides per appearance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppearanceOverrides {
    pub light: TuningOverride,
    pub dark: TuningOverride,
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ClearbarConfig {
    pub effect: EffectConfig,
    /// Cross-fade duration in seconds when the wallpaper strip changes.
    pub transition_duration: f64,
    /// Exposure (EV) applied to the wallpaper strip.
    pub exposure: f64,
    /// Lookback windows for the log fallback.
    pub recency: RecencyWindows,
    /// Menu bar height per OS version and notch presence, in points.
    pub menu_bar_height: MenuBarHeightTable,
    /// Backdrop filter overrides.
    pub appearance: AppearanceOverrides,
    /// Crop wallpapers on a worker thread.
    pub off_main_thread_crop: bool,
}

impl Default for ClearbarConfig {
    fn default() -> Self {
        Self {
            effect: EffectConfig::default(),
            transition_duration: TRANSITION_DURATION_SECS,
            exposure: EXPOSURE_BASELINE_EV,
            recency: RecencyWindows::default(),
            menu_bar_height: MenuBarHeightTable::default(),
            appearance: AppearanceOverrides::default(),
            off_main_thread_crop: true,
        }
    }
}

impl ClearbarConfig {
    /// Checks values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.effect.to_effect()?;

        if !self.transition_duration.is_finite() || self.transition_duration < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "transitionDuration must be a non-negative number of seconds, got {}",
                self.transition_duration
            )));
        }
        if !self.exposure.is_finite() {
            return Err(ConfigError::InvalidValue("exposure must be a finite number".to_string()));
        }
        Ok(())
    }

    /// The effect, or the clear effect if a color is invalid.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect.to_effect().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "config: invalid effect, using the clear effect");
            Effect::clear()
        })
    }

    #[must_use]
    pub fn appearance_table(&self) -> AppearanceTable {
        AppearanceTable {
            light: self.appearance.light.apply(BackdropTuning::LIGHT),
            dark: self.appearance.dark.apply(BackdropTuning::DARK),
        }
    }

    #[must_use]
    pub fn compositor_settings(&self) -> CompositorSettings {
        let defaults = CompositorSettings::default();
        CompositorSettings {
            appearance_table: self.appearance_table(),
            exposure: if self.exposure.is_finite() { self.exposure } else { defaults.exposure },
            transition: Duration::try_from_secs_f64(self.transition_duration)
                .unwrap_or(defaults.transition),
        }
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/clearbar/config.jsonc or \
         ~/Library/Application Support/clearbar/config.jsonc"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
    /// A value is syntactically valid but not acceptable.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/clearbar/` when set
/// 2. `~/.config/clearbar/`
/// 3. `~/Library/Application Support/clearbar/` (macOS native)
///
/// Each directory is checked for `config.jsonc` then `config.json`.
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut dirs_to_check = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        dirs_to_check.push(PathBuf::from(xdg_config).join("clearbar"));
    }
    if let Some(home) = dirs::home_dir() {
        dirs_to_check.push(home.join(".config").join("clearbar"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        dirs_to_check.push(config_dir.join("clearbar"));
    }

    let mut paths = Vec::new();
    for dir in dirs_to_check {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of the expected locations,
/// or the errors of [`load_config_from_path`] for the file found.
pub fn load_config() -> Result<(ClearbarConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist,
/// `ConfigError::IoError` if it could not be read,
/// `ConfigError::ParseError` if it is not valid JSONC, and
/// `ConfigError::InvalidValue` if a value fails validation.
pub fn load_config_from_path(path: &Path) -> Result<(ClearbarConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    // Strip comments from JSONC before parsing
    let reader = json_comments::StripComments::new(file);
    let config: ClearbarConfig = serde_json::from_reader(reader)?;
    config.validate()?;

    Ok((config, path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::Appearance;
    use crate::config::color::Rgba;

    #[test]
    fn test_default_config() {
        let config = ClearbarConfig::default();
        assert!((config.transition_duration - 2.0).abs() < f64::EPSILON);
        assert!((config.exposure - -1.0).abs() < f64::EPSILON);
        assert!(config.off_main_thread_crop);
        assert_eq!(config.recency.last_known_secs, 120);
        assert_eq!(config.effect(), Effect::clear());
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: ClearbarConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ClearbarConfig::default());
    }

    #[test]
    fn test_effect_with_single_and_adaptive_colors() {
        let json = r##"{
            "effect": {
                "backgroundColor": "#ffffff33",
                "tintColor": { "light": "rgba(255, 255, 255, 0.2)", "dark": "#000" },
                "tintFilter": "overlay"
            }
        }"##;

        let config: ClearbarConfig = serde_json::from_str(json).unwrap();
        let effect = config.effect.to_effect().unwrap();

        assert_eq!(effect.tint_filter, Some(CompositingFilter::Overlay));
        assert_eq!(effect.tint_color.resolve(Appearance::Dark), Rgba::new(0.0, 0.0, 0.0, 1.0));
        assert!((effect.background_color.resolve(Appearance::Light).a - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_color_fails_validation() {
        let config: ClearbarConfig =
            serde_json::from_str(r#"{ "effect": { "tintColor": "magenta" } }"#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
        assert_eq!(config.effect(), Effect::clear());
    }

    #[test]
    fn test_negative_transition_fails_validation() {
        let config = ClearbarConfig { transition_duration: -1.0, ..Default::default() };
        assert!(config.validate().is_err());
        assert_eq!(config.compositor_settings().transition, Duration::from_secs(2));
    }

    #[test]
    fn test_appearance_overrides_are_partial() {
        let json = r#"{ "appearance": { "dark": { "brightness": -0.1 } } }"#;
        let config: ClearbarConfig = serde_json::from_str(json).unwrap();
        let table = config.appearance_table();

        assert!((table.dark.brightness - -0.1).abs() < f64::EPSILON);
        assert!((table.dark.contrast - 1.14).abs() < f64::EPSILON);
        assert_eq!(table.light, BackdropTuning::LIGHT);
    }

    #[test]
    fn test_compositor_settings_from_config() {
        let config = ClearbarConfig {
            transition_duration: 0.5,
            exposure: -0.5,
            ..Default::default()
        };
        let settings = config.compositor_settings();
        assert_eq!(settings.transition, Duration::from_millis(500));
        assert!((settings.exposure - -0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_config_from_path_strips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(
            &path,
            r#"{
                // Shorter fade
                "transitionDuration": 1.0,
                /* taller bar on the next OS */
                "menuBarHeight": { "tahoe": 33 }
            }"#,
        )
        .unwrap();

        let (config, loaded_from) = load_config_from_path(&path).unwrap();
        assert_eq!(loaded_from, path);
        assert!((config.transition_duration - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.menu_bar_height.tahoe, 33);
        assert_eq!(config.menu_bar_height.notch, 37);
    }

    #[test]
    fn test_load_config_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config_from_path(&dir.path().join("missing.jsonc")),
            Err(ConfigError::NotFound)
        ));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ \"exposure\": }").unwrap();
        assert!(matches!(load_config_from_path(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_paths_are_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty() || std::env::var("HOME").is_err());
        assert!(paths.iter().all(|p| p.parent().is_some_and(|d| d.ends_with("clearbar"))));
    }

    #[test]
    fn test_config_error_display() {
        let msg = ConfigError::NotFound.to_string();
        assert!(msg.contains("No configuration file found"));
    }
}
