//! Wallpaper discovery, change tracking and strip processing.
//!
//! - [`locator`] resolves the wallpaper currently shown on a display.
//! - [`log`] reads the wallpaper agent's unified log entries.
//! - [`listener`] turns log activity and screen unlocks into change events.
//! - [`processing`] fits a wallpaper to a display and crops the menu bar band.

pub mod listener;
pub mod locator;
pub mod log;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod processing;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

pub use listener::WallpaperListener;
pub use locator::{DesktopImageSource, LocateError, Locate, Recency, RecencyWindows, WallpaperLocator};
pub use log::{LogError, LogHistory, LogShow, LogStream, extract_wallpaper_url};
pub use processing::{CropPlan, CroppedStrip, ProcessingError, StripGeometry, fit_and_crop};

/// The wallpaper image shown on a display.
///
/// Two references are equal when they point at the same image URL; the display
/// is metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperReference {
    pub display_id: u32,
    pub image_url: String,
}

impl PartialEq for WallpaperReference {
    fn eq(&self, other: &Self) -> bool { self.image_url == other.image_url }
}

impl Eq for WallpaperReference {}

impl WallpaperReference {
    /// Creates a reference from a `file://` URL string.
    #[must_use]
    pub fn new(display_id: u32, image_url: impl Into<String>) -> Self {
        Self { display_id, image_url: image_url.into() }
    }

    /// Creates a reference from an absolute file path.
    #[must_use]
    pub fn from_path(display_id: u32, path: &Path) -> Option<Self> {
        Url::from_file_path(path).ok().map(|url| Self::new(display_id, url.to_string()))
    }

    /// Returns the local file path behind the URL, percent-decoded.
    #[must_use]
    pub fn to_path(&self) -> Option<PathBuf> {
        Url::parse(&self.image_url).ok()?.to_file_path().ok()
    }

    /// Returns the image file name, for logging.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.to_path()
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| self.image_url.clone())
    }
}
