//! Objective-C helper utilities shared by the macOS integration.
//!
//! Provides `NSString` conversions, `NSURL` path extraction, user-defaults
//! lookups and the Cocoa geometry structs passed by value to `AppKit`.

use std::ffi::c_void;
use std::path::PathBuf;

use objc::runtime::Object;
use objc::{class, msg_send, sel, sel_impl};

/// Raw Objective-C object pointer.
pub type Id = *mut Object;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NSPoint {
    pub x: f64,
    pub y: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NSSize {
    pub width: f64,
    pub height: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NSRect {
    pub origin: NSPoint,
    pub size: NSSize,
}

impl NSRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: NSPoint { x, y },
            size: NSSize { width, height },
        }
    }
}

/// `NSEdgeInsets`, as returned by `-[NSScreen safeAreaInsets]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NSEdgeInsets {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

/// `NSOperatingSystemVersion`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NSOperatingSystemVersion {
    pub major: isize,
    pub minor: isize,
    pub patch: isize,
}

/// Creates an `NSString` from a Rust string slice.
///
/// # Safety
///
/// The caller must ensure that the Objective-C runtime is properly initialized.
/// The returned object is autoreleased.
#[must_use]
pub unsafe fn nsstring(s: &str) -> Id {
    let bytes = s.as_ptr().cast::<c_void>();
    let len = s.len();
    let encoding: usize = 4; // NSUTF8StringEncoding

    msg_send![
        class!(NSString),
        stringWithBytes: bytes
        length: len
        encoding: encoding
    ]
}

/// Converts an `NSString` to a Rust `String`.
///
/// Returns an empty string if the input is null or conversion fails.
///
/// # Safety
///
/// `nsstring` must be null or a valid `NSString` pointer.
#[must_use]
pub unsafe fn nsstring_to_string(nsstring: Id) -> String {
    if nsstring.is_null() {
        return String::new();
    }

    let c_str: *const i8 = msg_send![nsstring, UTF8String];
    if c_str.is_null() {
        return String::new();
    }

    // SAFETY: c_str is verified non-null above, and UTF8String returns a valid C string
    unsafe { std::ffi::CStr::from_ptr(c_str) }.to_string_lossy().into_owned()
}

/// Returns the file-system path of a file `NSURL`.
///
/// # Safety
///
/// `url` must be null or a valid `NSURL` pointer.
#[must_use]
pub unsafe fn nsurl_path(url: Id) -> Option<PathBuf> {
    if url.is_null() {
        return None;
    }

    let is_file: bool = msg_send![url, isFileURL];
    if !is_file {
        return None;
    }

    let path: Id = msg_send![url, path];
    let path = unsafe { nsstring_to_string(path) };
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Reads a string value from the global user-defaults domain.
///
/// # Safety
///
/// The caller must ensure that the Objective-C runtime is properly initialized.
#[must_use]
pub unsafe fn user_default_string(key: &str) -> Option<String> {
    let defaults: Id = msg_send![class!(NSUserDefaults), standardUserDefaults];
    if defaults.is_null() {
        return None;
    }

    let value: Id = msg_send![defaults, stringForKey: unsafe { nsstring(key) }];
    if value.is_null() {
        return None;
    }
    Some(unsafe { nsstring_to_string(value) })
}
