//! The macOS application: an accessory-policy `NSApplication` with one
//! click-through overlay window covering the menu bar of the main display.
//!
//! The runtime lives in a main-thread `thread_local`; its waker schedules a
//! drain on the main queue through GCD.

use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use objc::rc::autoreleasepool;
use objc::{class, msg_send, sel, sel_impl};

use super::layers::CaLayerHost;
use super::notifications::{
    SystemNotification, current_appearance, forward_to_bus, post_wallpaper_changed,
    register_notification_handler, start_system_observers, stop_system_observers,
};
use super::objc::{Id, NSRect};
use super::screen::{main_display, main_screen};
use crate::compositor::Compositor;
use crate::config::{self, ClearbarConfig};
use crate::constants::wallpaper_log::LOG_BINARY;
use crate::display::Display;
use crate::error::ClearbarError;
use crate::events;
use crate::platform::thread::{dispatch_on_main, spawn_named_thread};
use crate::runtime::{Runtime, RuntimeOptions, Waker};
use crate::wallpaper::macos::WorkspaceDesktopSource;
use crate::wallpaper::{Locate, LogShow, WallpaperListener, WallpaperLocator};

/// `NSApplicationActivationPolicyAccessory`.
const ACTIVATION_POLICY_ACCESSORY: i64 = 1;

/// `NSStatusWindowLevel`.
const STATUS_WINDOW_LEVEL: i64 = 25;

/// `NSWindowCollectionBehaviorCanJoinAllSpaces | NSWindowCollectionBehaviorFullScreenNone`.
const COLLECTION_BEHAVIOR: u64 = 1 | (1 << 9);

/// `NSBackingStoreBuffered`.
const BACKING_STORE_BUFFERED: u64 = 2;

thread_local! {
    static RUNTIME: RefCell<Option<Runtime<CaLayerHost>>> = const { RefCell::new(None) };
    static OVERLAY: RefCell<Option<OverlayWindow>> = const { RefCell::new(None) };
}

// ============================================================================
// Overlay window
// ============================================================================

/// Borderless, transparent window sitting over the menu bar band.
struct OverlayWindow {
    window: Id,
}

impl OverlayWindow {
    /// Frame of the menu bar band of the main screen, in points.
    fn band_frame(display: &Display) -> Option<NSRect> {
        let screen = main_screen()?;
        let frame: NSRect = unsafe { msg_send![screen, frame] };
        let height = f64::from(display.menu_bar_height_px) / display.backing_scale;

        Some(NSRect::new(
            frame.origin.x,
            frame.origin.y + frame.size.height - height,
            frame.size.width,
            height,
        ))
    }

    fn new(display: &Display) -> Option<Self> {
        let frame = Self::band_frame(display)?;

        unsafe {
            let window: Id = msg_send![class!(NSWindow), alloc];
            let window: Id = msg_send![
                window,
                initWithContentRect: frame
                styleMask: 0_u64
                backing: BACKING_STORE_BUFFERED
                defer: false
            ];
            if window.is_null() {
                return None;
            }

            let clear: Id = msg_send![class!(NSColor), clearColor];
            let _: () = msg_send![window, setReleasedWhenClosed: false];
            let _: () = msg_send![window, setOpaque: false];
            let _: () = msg_send![window, setHasShadow: false];
            let _: () = msg_send![window, setBackgroundColor: clear];
            let _: () = msg_send![window, setIgnoresMouseEvents: true];
            let _: () = msg_send![window, setLevel: STATUS_WINDOW_LEVEL];
            let _: () = msg_send![window, setCollectionBehavior: COLLECTION_BEHAVIOR];

            let content: Id = msg_send![window, contentView];
            let _: () = msg_send![content, setWantsLayer: true];

            Some(Self { window })
        }
    }

    /// Root layer of the content view.
    fn root_layer(&self) -> Id {
        unsafe {
            let content: Id = msg_send![self.window, contentView];
            msg_send![content, layer]
        }
    }

    fn show(&self) {
        unsafe {
            let _: () = msg_send![self.window, orderFrontRegardless];
        }
    }

    /// Moves the window over the menu bar band after a screen change.
    fn reposition(&self, display: &Display) {
        let Some(frame) = Self::band_frame(display) else {
            return;
        };
        unsafe {
            let _: () = msg_send![self.window, setFrame: frame display: true];
        }
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        unsafe {
            let _: () = msg_send![self.window, orderOut: std::ptr::null::<objc::runtime::Object>()];
            let _: () = msg_send![self.window, release];
        }
    }
}

// ============================================================================
// Runtime plumbing
// ============================================================================

fn drain_main() {
    RUNTIME.with(|cell| {
        if let Ok(mut slot) = cell.try_borrow_mut()
            && let Some(runtime) = slot.as_mut()
        {
            runtime.drain();
        }
    });
}

fn main_waker() -> Waker { Arc::new(|| dispatch_on_main(drain_main)) }

/// Tears down on the main thread: observers first, so no notification reaches a
/// stopped runtime, then the runtime and the overlay window.
fn shutdown_main() {
    stop_system_observers();
    RUNTIME.with(|cell| {
        if let Ok(mut slot) = cell.try_borrow_mut()
            && let Some(mut runtime) = slot.take()
        {
            runtime.shutdown();
        }
    });
    OVERLAY.with(|cell| cell.borrow_mut().take());
}

fn on_system_notification(notification: SystemNotification, config: &ClearbarConfig) {
    match notification {
        SystemNotification::ScreenParametersChanged => {
            let Some(display) = main_display(&config.menu_bar_height) else {
                return;
            };
            OVERLAY.with(|cell| {
                if let Some(overlay) = cell.borrow().as_ref() {
                    overlay.reposition(&display);
                }
            });
        }
        SystemNotification::WillTerminate => shutdown_main(),
        SystemNotification::ScreenUnlocked | SystemNotification::ThemeChanged => {}
    }
}

/// Resolves the startup wallpaper off the main thread and publishes it.
fn publish_initial_wallpaper(
    listener: Arc<WallpaperListener>,
    locator: Arc<dyn Locate>,
    display: Display,
) {
    spawn_named_thread("initial-locate", move || {
        listener.publish_initial(locator.as_ref(), &display);
    });
}

// ============================================================================
// Entry point
// ============================================================================

/// Runs the application until it is terminated.
///
/// Must be called on the main thread.
///
/// # Errors
///
/// Returns an error if no display is attached or the overlay window cannot be created.
pub fn run(config: &'static ClearbarConfig) -> Result<(), ClearbarError> {
    autoreleasepool(|| {
        let app: Id = unsafe { msg_send![class!(NSApplication), sharedApplication] };
        let _: bool = unsafe { msg_send![app, setActivationPolicy: ACTIVATION_POLICY_ACCESSORY] };

        let display = main_display(&config.menu_bar_height)
            .ok_or_else(|| ClearbarError::CommandError("no display attached".to_string()))?;
        let overlay = OverlayWindow::new(&display)
            .ok_or_else(|| ClearbarError::CommandError("failed to create overlay window".to_string()))?;

        let host = unsafe { CaLayerHost::new(overlay.root_layer()) };
        let compositor = Compositor::new(host, config.compositor_settings());
        let bus = events::bus();
        let mut runtime = Runtime::new(
            compositor,
            bus,
            RuntimeOptions { off_main_thread_crop: config.off_main_thread_crop },
            Some(main_waker()),
        );

        let listener = Arc::new(WallpaperListener::new(bus, display.id));
        let locator: Arc<dyn Locate> = Arc::new(WallpaperLocator::new(
            WorkspaceDesktopSource::new(),
            LogShow::default(),
            config.recency,
        ));
        if let Err(err) = listener.start_stream(Path::new(LOG_BINARY)) {
            tracing::warn!(error = %err, "app: wallpaper log stream unavailable");
        }

        runtime.set_wallpaper_sources(Arc::clone(&listener), Arc::clone(&locator));
        runtime.set_on_applied(Box::new(|reference| {
            post_wallpaper_changed(reference);
        }));
        runtime.connect_bus();
        runtime.start(display, current_appearance(), None);

        if let Some(path) = config::get_config_path() {
            let handle = runtime.handle();
            config::watch_config_file(path, move |updated| {
                handle.post_effect(updated.effect());
            });
        }

        forward_to_bus(bus, config.menu_bar_height);
        register_notification_handler(move |notification| on_system_notification(notification, config));
        start_system_observers();

        overlay.show();
        OVERLAY.with(|cell| *cell.borrow_mut() = Some(overlay));
        RUNTIME.with(|cell| *cell.borrow_mut() = Some(runtime));

        publish_initial_wallpaper(listener, locator, display);

        tracing::info!(
            display = display.id,
            width = display.width_px,
            menu_bar_height = display.menu_bar_height_px,
            "app: running"
        );

        unsafe {
            let _: () = msg_send![app, run];
        }

        shutdown_main();
        Ok(())
    })
}
