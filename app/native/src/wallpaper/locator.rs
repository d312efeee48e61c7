//! Resolves the wallpaper image shown on a display.
//!
//! The desktop-image API is consulted first. Dynamic and managed wallpapers
//! report a directory there, in which case the most recent image-cache lookup
//! in the unified log is used instead.

use std::path::PathBuf;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::WallpaperReference;
use super::log::{LogError, LogHistory, last_wallpaper_url};
use crate::constants::effect::{CURRENT_RECENCY_SECS, LAST_KNOWN_RECENCY_SECS};
use crate::display::Display;

/// Errors raised while locating a wallpaper.
#[derive(Debug, Error)]
pub enum LocateError {
    /// Neither the desktop-image API nor the log window yielded a wallpaper file.
    #[error("no wallpaper found for the display")]
    NotFound,
    /// The log store could not be queried.
    #[error("log access failed: {0}")]
    LogAccess(#[from] LogError),
}

/// Per-display desktop image query.
pub trait DesktopImageSource: Send + Sync {
    /// Returns the path the OS reports for the display: a file, a directory for
    /// dynamic wallpapers, or `None` when nothing is reported.
    fn desktop_image_path(&self, display: &Display) -> Option<PathBuf>;
}

/// Which lookback window to use for the log fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    /// The last wallpaper seen within the longer window.
    LastKnown,
    /// Only a wallpaper resolved moments ago.
    Current,
}

/// Lookback windows used for the log fallback, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RecencyWindows {
    pub last_known_secs: u64,
    pub current_secs: u64,
}

impl Default for RecencyWindows {
    fn default() -> Self {
        Self {
            last_known_secs: LAST_KNOWN_RECENCY_SECS,
            current_secs: CURRENT_RECENCY_SECS,
        }
    }
}

impl RecencyWindows {
    /// Returns the window for the given recency.
    #[must_use]
    pub const fn window(&self, recency: Recency) -> Duration {
        match recency {
            Recency::LastKnown => Duration::from_secs(self.last_known_secs),
            Recency::Current => Duration::from_secs(self.current_secs),
        }
    }
}

/// Anything that can resolve the wallpaper of a display.
pub trait Locate: Send + Sync {
    /// Resolves the wallpaper shown on `display`.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::NotFound`] when nothing can be resolved, or
    /// [`LocateError::LogAccess`] when the log fallback could not run.
    fn locate(&self, display: &Display, recency: Recency) -> Result<WallpaperReference, LocateError>;
}

/// Desktop-image API first, log scrape second.
pub struct WallpaperLocator<D, H> {
    desktop: D,
    history: H,
    windows: RecencyWindows,
}

impl<D: DesktopImageSource, H: LogHistory> WallpaperLocator<D, H> {
    #[must_use]
    pub const fn new(desktop: D, history: H, windows: RecencyWindows) -> Self {
        Self { desktop, history, windows }
    }

    /// Scans the log window for the most recent lookup.
    fn locate_from_log(
        &self,
        display: &Display,
        recency: Recency,
    ) -> Result<WallpaperReference, LocateError> {
        let window = self.windows.window(recency);
        let messages = self.history.recent_messages(window)?;

        let display_id = display.id;
        tracing::debug!(
            display = display_id,
            window_secs = window.as_secs(),
            candidates = messages.len(),
            "wallpaper: scanning log window"
        );

        last_wallpaper_url(messages.iter().map(String::as_str))
            .map(|url| WallpaperReference::new(display.id, url))
            .ok_or(LocateError::NotFound)
    }
}

impl<D: DesktopImageSource, H: LogHistory> Locate for WallpaperLocator<D, H> {
    fn locate(&self, display: &Display, recency: Recency) -> Result<WallpaperReference, LocateError> {
        match self.desktop.desktop_image_path(display) {
            Some(path) if path.is_file() => {
                WallpaperReference::from_path(display.id, &path).ok_or(LocateError::NotFound)
            }
            Some(path) => {
                tracing::debug!(
                    path = %path.display(),
                    "wallpaper: desktop image is not a file, falling back to log"
                );
                self.locate_from_log(display, recency)
            }
            None => self.locate_from_log(display, recency),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use parking_lot::Mutex;

    use super::*;

    struct FixedDesktop(Option<PathBuf>);

    impl DesktopImageSource for FixedDesktop {
        fn desktop_image_path(&self, _display: &Display) -> Option<PathBuf> { self.0.clone() }
    }

    #[derive(Default)]
    struct ScriptedHistory {
        messages: Vec<String>,
        fail: bool,
        windows: Mutex<Vec<Duration>>,
    }

    impl LogHistory for ScriptedHistory {
        fn recent_messages(&self, window: Duration) -> Result<Vec<String>, LogError> {
            self.windows.lock().push(window);
            if self.fail {
                return Err(LogError::Exit {
                    status: "exit status: 1".to_string(),
                    stderr: "not permitted".to_string(),
                });
            }
            Ok(self.messages.clone())
        }
    }

    fn display() -> Display {
        Display {
            id: 1,
            width_px: 2560,
            height_px: 1440,
            menu_bar_height_px: 24,
            backing_scale: 1.0,
        }
    }

    fn lookup(url: &str) -> String {
        format!("BEGIN - Image cache lookup - url: {url}, size: {{3840, 2160}}")
    }

    #[test]
    fn test_locate_returns_concrete_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("Sequoia.png");
        fs::write(&image, b"png").unwrap();

        let history = ScriptedHistory::default();
        let locator = WallpaperLocator::new(
            FixedDesktop(Some(image.clone())),
            history,
            RecencyWindows::default(),
        );

        let reference = locator.locate(&display(), Recency::LastKnown).unwrap();
        assert_eq!(reference.to_path(), Some(image));
        assert!(locator.history.windows.lock().is_empty());
    }

    #[test]
    fn test_locate_directory_picks_most_recent_log_entry() {
        let dir = tempfile::tempdir().unwrap();
        let history = ScriptedHistory {
            messages: vec![
                lookup("file:///Wallpapers/a.heic"),
                lookup("file:///Wallpapers/b.heic"),
            ],
            ..Default::default()
        };
        let locator = WallpaperLocator::new(
            FixedDesktop(Some(dir.path().to_path_buf())),
            history,
            RecencyWindows::default(),
        );

        let reference = locator.locate(&display(), Recency::LastKnown).unwrap();
        assert_eq!(reference.image_url, "file:///Wallpapers/b.heic");
        assert_eq!(reference.display_id, 1);
    }

    #[test]
    fn test_locate_uses_recency_window() {
        let history = ScriptedHistory {
            messages: vec![lookup("file:///Wallpapers/a.heic")],
            ..Default::default()
        };
        let locator = WallpaperLocator::new(
            FixedDesktop(None),
            history,
            RecencyWindows { last_known_secs: 90, current_secs: 3 },
        );

        locator.locate(&display(), Recency::Current).unwrap();
        locator.locate(&display(), Recency::LastKnown).unwrap();

        assert_eq!(
            *locator.history.windows.lock(),
            vec![Duration::from_secs(3), Duration::from_secs(90)]
        );
    }

    #[test]
    fn test_locate_empty_window_is_not_found() {
        let locator = WallpaperLocator::new(
            FixedDesktop(None),
            ScriptedHistory::default(),
            RecencyWindows::default(),
        );
        assert!(matches!(
            locator.locate(&display(), Recency::Current),
            Err(LocateError::NotFound)
        ));
    }

    #[test]
    fn test_locate_surfaces_log_failure() {
        let locator = WallpaperLocator::new(
            FixedDesktop(None),
            ScriptedHistory { fail: true, ..Default::default() },
            RecencyWindows::default(),
        );
        assert!(matches!(
            locator.locate(&display(), Recency::LastKnown),
            Err(LocateError::LogAccess(_))
        ));
    }

    #[test]
    fn test_recency_windows_deserialize_partially() {
        let windows: RecencyWindows = serde_json::from_str(r#"{ "currentSecs": 5 }"#).unwrap();
        assert_eq!(windows.current_secs, 5);
        assert_eq!(windows.last_known_secs, 120);
    }
}
