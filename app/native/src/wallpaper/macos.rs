//! macOS desktop image lookup.
//!
//! Asks `NSWorkspace` for the image configured on a screen. Dynamic and
//! shuffling wallpapers report a directory here, which the locator resolves
//! through the log store instead.

use std::path::PathBuf;

use objc::rc::autoreleasepool;
use objc::runtime::Class;
use objc::{msg_send, sel, sel_impl};

use super::locator::DesktopImageSource;
use crate::display::Display;
use crate::platform::macos::objc::{Id, nsurl_path};
use crate::platform::macos::screen::screen_for_display;

/// Desktop image source backed by `-[NSWorkspace desktopImageURLForScreen:]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkspaceDesktopSource;

impl WorkspaceDesktopSource {
    #[must_use]
    pub const fn new() -> Self { Self }
}

impl DesktopImageSource for WorkspaceDesktopSource {
    fn desktop_image_path(&self, display: &Display) -> Option<PathBuf> {
        autoreleasepool(|| {
            let screen = screen_for_display(display.id)?;
            let workspace_class = Class::get("NSWorkspace")?;

            unsafe {
                let workspace: Id = msg_send![workspace_class, sharedWorkspace];
                if workspace.is_null() {
                    return None;
                }
                let url: Id = msg_send![workspace, desktopImageURLForScreen: screen];
                let path = nsurl_path(url);
                tracing::debug!(display = display.id, path = ?path, "wallpaper: desktop image");
                path
            }
        })
    }
}
