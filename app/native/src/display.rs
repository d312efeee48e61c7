//! Display snapshots and the menu bar height policy.
//!
//! A [`Display`] is a read-only pixel-geometry snapshot of a screen. It is
//! re-queried whenever the host reports a backing-scale or geometry change.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Compatibility table mapping the host OS to the menu bar height in points.
///
/// The values mirror what the system wallpaper renderer reserves at the top of
/// the screen. The table is configurable so new OS releases can be handled
/// without a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MenuBarHeightTable {
    /// OS major version that uses the taller, uniform menu bar.
    pub tahoe_major_version: u32,
    /// Height used on that OS version, regardless of the notch.
    pub tahoe: u32,
    /// Height used on displays with a camera housing (non-zero top safe-area inset).
    pub notch: u32,
    /// Height used everywhere else.
    pub standard: u32,
}

impl Default for MenuBarHeightTable {
    fn default() -> Self {
        Self {
            tahoe_major_version: 26,
            tahoe: 31,
            notch: 37,
            standard: 24,
        }
    }
}

impl MenuBarHeightTable {
    /// Returns the menu bar height in points for the given OS and notch state.
    #[must_use]
    pub const fn height_points(&self, os_major_version: u32, has_notch: bool) -> u32 {
        if os_major_version == self.tahoe_major_version {
            self.tahoe
        } else if has_notch {
            self.notch
        } else {
            self.standard
        }
    }
}

/// Menu bar height (points) using the built-in table.
#[must_use]
pub fn menu_bar_height_points(os_major_version: u32, has_notch: bool) -> u32 {
    MenuBarHeightTable::default().height_points(os_major_version, has_notch)
}

/// Pixel geometry of a screen.
///
/// Every `_px` field, `menu_bar_height_px` included, is in backing pixels
/// (points multiplied by `backing_scale`): a 37 pt menu bar is 74 px on a 2x display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Display {
    /// Host identifier of the screen.
    pub id: u32,
    pub width_px: u32,
    pub height_px: u32,
    /// Height of the menu bar band, in pixels.
    pub menu_bar_height_px: u32,
    pub backing_scale: f64,
}

impl Display {
    /// Builds a snapshot from point-based screen metrics, as reported by the host.
    ///
    /// Pixel sizes are the point sizes multiplied by the backing scale.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::too_many_arguments
    )]
    pub fn from_points(
        id: u32,
        width_pt: f64,
        height_pt: f64,
        backing_scale: f64,
        os_major_version: u32,
        has_notch: bool,
        table: &MenuBarHeightTable,
    ) -> Self {
        let scale = if backing_scale > 0.0 { backing_scale } else { 1.0 };
        let menu_bar_pt = f64::from(table.height_points(os_major_version, has_notch));

        Self {
            id,
            width_px: (width_pt * scale).round() as u32,
            height_px: (height_pt * scale).round() as u32,
            menu_bar_height_px: (menu_bar_pt * scale).round() as u32,
            backing_scale: scale,
        }
    }

    /// Returns whether two snapshots need different wallpaper strips.
    #[must_use]
    pub const fn same_geometry(&self, other: &Self) -> bool {
        self.width_px == other.width_px
            && self.height_px == other.height_px
            && self.menu_bar_height_px == other.menu_bar_height_px
    }
}

/// Host OS version information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl OsVersion {
    /// Parses the output of `sw_vers -productVersion` (e.g. `15.3.1`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('.').map(str::parse::<u32>);
        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(Result::ok).unwrap_or(0);
        let patch = parts.next().and_then(Result::ok).unwrap_or(0);
        Some(Self { major, minor, patch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Menu bar height policy
    // ========================================================================

    #[test]
    fn test_menu_bar_height_on_tahoe_ignores_notch() {
        assert_eq!(menu_bar_height_points(26, true), 31);
        assert_eq!(menu_bar_height_points(26, false), 31);
    }

    #[test]
    fn test_menu_bar_height_with_notch() {
        assert_eq!(menu_bar_height_points(25, true), 37);
        assert_eq!(menu_bar_height_points(15, true), 37);
    }

    #[test]
    fn test_menu_bar_height_without_notch() {
        assert_eq!(menu_bar_height_points(25, false), 24);
        assert_eq!(menu_bar_height_points(14, false), 24);
    }

    #[test]
    fn test_menu_bar_height_points_matches_default_table() {
        let table = MenuBarHeightTable::default();
        for os in [14, 15, 25, 26, 27] {
            for notch in [false, true] {
                assert_eq!(menu_bar_height_points(os, notch), table.height_points(os, notch));
            }
        }
    }

    #[test]
    fn test_menu_bar_height_table_is_overridable() {
        let table = MenuBarHeightTable {
            tahoe_major_version: 27,
            tahoe: 33,
            ..Default::default()
        };
        assert_eq!(table.height_points(27, false), 33);
        assert_eq!(table.height_points(26, false), 24);
    }

    #[test]
    fn test_menu_bar_height_table_deserializes_partially() {
        let table: MenuBarHeightTable = serde_json::from_str(r#"{ "notch": 40 }"#).unwrap();
        assert_eq!(table.notch, 40);
        assert_eq!(table.tahoe, 31);
        assert_eq!(table.standard, 24);
    }

    // ========================================================================
    // Display snapshots
    // ========================================================================

    #[test]
    fn test_display_from_points_scales_to_pixels() {
        let display =
            Display::from_points(1, 1512.0, 982.0, 2.0, 15, true, &MenuBarHeightTable::default());
        assert_eq!(display.width_px, 3024);
        assert_eq!(display.height_px, 1964);
        assert_eq!(display.menu_bar_height_px, 74);
    }

    #[test]
    fn test_display_from_points_guards_zero_scale() {
        let display =
            Display::from_points(1, 1920.0, 1080.0, 0.0, 14, false, &MenuBarHeightTable::default());
        assert!((display.backing_scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(display.menu_bar_height_px, 24);
    }

    #[test]
    fn test_same_geometry_ignores_id() {
        let a = Display {
            id: 1,
            width_px: 2560,
            height_px: 1440,
            menu_bar_height_px: 24,
            backing_scale: 1.0,
        };
        let b = Display { id: 2, ..a };
        let c = Display { menu_bar_height_px: 48, ..a };
        assert!(a.same_geometry(&b));
        assert!(!a.same_geometry(&c));
    }

    // ========================================================================
    // OS version parsing
    // ========================================================================

    #[test]
    fn test_os_version_parse() {
        assert_eq!(
            OsVersion::parse("15.3.1\n"),
            Some(OsVersion { major: 15, minor: 3, patch: 1 })
        );
        assert_eq!(OsVersion::parse("26").map(|v| v.major), Some(26));
        assert_eq!(OsVersion::parse(""), None);
    }
}
