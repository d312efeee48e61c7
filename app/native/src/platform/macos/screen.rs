//! `NSScreen` queries used to build [`Display`] snapshots.

use objc::runtime::Class;
use objc::{class, msg_send, sel, sel_impl};

use super::objc::{Id, NSEdgeInsets, NSOperatingSystemVersion, NSRect, nsstring};
use crate::display::{Display, MenuBarHeightTable, OsVersion};

/// Returns the main screen, or `None` when no screen is attached.
#[must_use]
pub fn main_screen() -> Option<Id> {
    let screen_class = Class::get("NSScreen")?;
    let screen: Id = unsafe { msg_send![screen_class, mainScreen] };
    (!screen.is_null()).then_some(screen)
}

/// Returns the screen whose `NSScreenNumber` is `display_id`.
#[must_use]
pub fn screen_for_display(display_id: u32) -> Option<Id> {
    unsafe {
        let screens: Id = msg_send![class!(NSScreen), screens];
        if screens.is_null() {
            return None;
        }

        let count: usize = msg_send![screens, count];
        (0..count)
            .map(|index| -> Id { msg_send![screens, objectAtIndex: index] })
            .find(|&screen| screen_number(screen) == Some(display_id))
    }
}

/// Returns the `CGDirectDisplayID` of `screen`.
#[must_use]
pub fn screen_number(screen: Id) -> Option<u32> {
    if screen.is_null() {
        return None;
    }

    unsafe {
        let description: Id = msg_send![screen, deviceDescription];
        if description.is_null() {
            return None;
        }
        let number: Id = msg_send![description, objectForKey: nsstring("NSScreenNumber")];
        if number.is_null() {
            return None;
        }
        let value: u32 = msg_send![number, unsignedIntValue];
        Some(value)
    }
}

/// Returns the running OS version.
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn os_version() -> OsVersion {
    unsafe {
        let info: Id = msg_send![class!(NSProcessInfo), processInfo];
        let version: NSOperatingSystemVersion = msg_send![info, operatingSystemVersion];
        OsVersion {
            major: version.major.max(0) as u32,
            minor: version.minor.max(0) as u32,
            patch: version.patch.max(0) as u32,
        }
    }
}

/// Returns whether the screen has a camera housing cut into the menu bar.
#[must_use]
pub fn has_notch(screen: Id) -> bool {
    unsafe {
        let responds: bool = msg_send![screen, respondsToSelector: sel!(safeAreaInsets)];
        if !responds {
            return false;
        }
        let insets: NSEdgeInsets = msg_send![screen, safeAreaInsets];
        insets.top > 0.0
    }
}

/// Snapshots the geometry of `screen`.
#[must_use]
pub fn display_for_screen(screen: Id, table: &MenuBarHeightTable) -> Option<Display> {
    let id = screen_number(screen)?;
    let (frame, scale): (NSRect, f64) =
        unsafe { (msg_send![screen, frame], msg_send![screen, backingScaleFactor]) };

    if frame.size.width <= 0.0 || frame.size.height <= 0.0 {
        return None;
    }

    Some(Display::from_points(
        id,
        frame.size.width,
        frame.size.height,
        scale,
        os_version().major,
        has_notch(screen),
        table,
    ))
}

/// Snapshots the main screen.
#[must_use]
pub fn main_display(table: &MenuBarHeightTable) -> Option<Display> {
    main_screen().and_then(|screen| display_for_screen(screen, table))
}
