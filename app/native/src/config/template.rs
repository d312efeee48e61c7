//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::path::Path;

/// Generates a configuration template with all options commented out.
#[must_use]
pub fn generate_config_template() -> String {
    r##"// Clearbar Configuration File
// ===========================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.
//
// Changes to "effect" are applied while running; other options need a restart.

{
  // ============================================================================
  // Effect
  // ============================================================================
  // Colors accept "#RGB", "#RRGGBB", "#RRGGBBAA", "rgba(r, g, b, a)" or "clear",
  // either as a single value or as { "light": ..., "dark": ... }.
  // "effect": {
  //   // Color behind the blur layer
  //   "backgroundColor": "clear",
  //
  //   // Color of the tint layer above the blur
  //   "tintColor": "clear",
  //
  //   // Blend mode of the tint layer: "screen", "multiply", "overlay",
  //   // "softLight", "plusLighter", "plusDarker", "colorDodge", "colorBurn"
  //   "tintFilter": null
  // },

  // ============================================================================
  // Wallpaper Strip
  // ============================================================================
  // Cross-fade duration in seconds when the wallpaper changes
  // "transitionDuration": 2.0,
  //
  // Exposure (EV) applied to the wallpaper strip
  // "exposure": -1.0,
  //
  // Crop wallpapers on a background thread
  // "offMainThreadCrop": true,
  //
  // How far back (seconds) to search the system log for dynamic wallpapers
  // "recency": {
  //   "lastKnownSecs": 120,
  //   "currentSecs": 2
  // },

  // ============================================================================
  // Menu Bar Height (points)
  // ============================================================================
  // "menuBarHeight": {
  //   // OS major version with the uniform, taller menu bar
  //   "tahoeMajorVersion": 26,
  //   "tahoe": 31,
  //
  //   // Displays with a camera housing
  //   "notch": 37,
  //
  //   // Everything else
  //   "standard": 24
  // },

  // ============================================================================
  // Backdrop Filters
  // ============================================================================
  // Any field left out keeps its built-in value.
  // "appearance": {
  //   "light": {
  //     "brightness": 0.0919,
  //     "contrast": 1.166,
  //     "invert": true,
  //     "hueRotate": true,
  //     "hueAngle": 3.141592653589793
  //   },
  //   "dark": {
  //     "brightness": -0.063,
  //     "contrast": 1.14,
  //     "invert": false,
  //     "hueRotate": false
  //   }
  // }
}
"##
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, generate_config_template())
}
