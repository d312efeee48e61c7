//! End-to-end tests of the wallpaper pipeline without a window server.
//!
//! Each test drives a `Runtime<HeadlessHost>` through its own leaked bus, so
//! tests never share subscribers with the process-wide bus.
//!
//! ```bash
//! cargo test -p clearbar --test pipeline -- --nocapture
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clearbar_lib::compositor::{
    Appearance, BackdropFilter, Compositor, CompositorSettings, CropOutcome, HeadlessHost,
    HostCommand,
};
use clearbar_lib::display::Display;
use clearbar_lib::events::{BusEvent, ChangeEventBus};
use clearbar_lib::runtime::{Runtime, RuntimeOptions};
use clearbar_lib::wallpaper::processing::crop_wallpaper;
use clearbar_lib::wallpaper::{
    DesktopImageSource, Locate, LogError, LogHistory, Recency, RecencyWindows, WallpaperListener,
    WallpaperLocator, WallpaperReference,
};
use image::{DynamicImage, Rgba, RgbaImage};
use parking_lot::Mutex;

// ============================================================================
// Fixtures
// ============================================================================

fn leaked_bus() -> &'static ChangeEventBus { Box::leak(Box::new(ChangeEventBus::new())) }

fn display() -> Display {
    Display {
        id: 7,
        width_px: 320,
        height_px: 180,
        menu_bar_height_px: 12,
        backing_scale: 2.0,
    }
}

fn write_wallpaper(dir: &Path, name: &str, color: [u8; 4]) -> WallpaperReference {
    let path = dir.join(name);
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(640, 360, Rgba(color)))
        .save(&path)
        .unwrap();
    WallpaperReference::from_path(display().id, &path).unwrap()
}

fn runtime(bus: &'static ChangeEventBus, off_main: bool) -> Runtime<HeadlessHost> {
    let compositor = Compositor::new(HeadlessHost::new(), CompositorSettings::default());
    Runtime::new(compositor, bus, RuntimeOptions { off_main_thread_crop: off_main }, None)
}

fn pump_until(runtime: &mut Runtime<HeadlessHost>, done: impl Fn(&Runtime<HeadlessHost>) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(runtime) && Instant::now() < deadline {
        runtime.drain();
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn wallpaper_commits(host: &HeadlessHost) -> Vec<&str> {
    host.commands()
        .iter()
        .filter_map(|command| match command {
            HostCommand::WallpaperContents { url, .. } => Some(url.as_str()),
            _ => None,
        })
        .collect()
}

fn lookup_message(url: &str) -> String {
    format!("BEGIN - Image cache lookup - url: {url}, size: {{3024, 1964}}")
}

/// Desktop image API returning a fixed path.
struct FixedDesktop(Option<PathBuf>);

impl DesktopImageSource for FixedDesktop {
    fn desktop_image_path(&self, _display: &Display) -> Option<PathBuf> { self.0.clone() }
}

/// Log history returning canned messages and recording the windows asked for.
#[derive(Default)]
struct CannedHistory {
    messages: Vec<String>,
    windows: Mutex<Vec<Duration>>,
}

impl LogHistory for CannedHistory {
    fn recent_messages(&self, window: Duration) -> Result<Vec<String>, LogError> {
        self.windows.lock().push(window);
        Ok(self.messages.clone())
    }
}

/// Shares a [`CannedHistory`] with the test after the locator takes ownership.
struct SharedHistory(Arc<CannedHistory>);

impl LogHistory for SharedHistory {
    fn recent_messages(&self, window: Duration) -> Result<Vec<String>, LogError> {
        self.0.recent_messages(window)
    }
}

// ============================================================================
// Bus to compositor
// ============================================================================

#[test]
fn test_published_wallpaper_reaches_host() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_wallpaper(dir.path(), "a.png", [30, 60, 90, 255]);
    let bus = leaked_bus();

    let mut runtime = runtime(bus, true);
    runtime.connect_bus();
    runtime.start(display(), Appearance::Light, None);

    bus.publish(BusEvent::WallpaperChanged(reference.clone()));
    pump_until(&mut runtime, |rt| rt.compositor().applied_wallpaper().is_some());

    let host = runtime.compositor().host();
    assert_eq!(host.current_wallpaper(), Some(reference.image_url.as_str()));
    assert!(host.commands().iter().any(|command| matches!(
        command,
        HostCommand::WallpaperContents { width: 320, height: 12, .. }
    )));

    runtime.shutdown();
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn test_repeated_wallpaper_is_committed_once() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_wallpaper(dir.path(), "a.png", [30, 60, 90, 255]);

    let mut runtime = runtime(leaked_bus(), false);
    runtime.start(display(), Appearance::Light, Some(reference.clone()));
    runtime.handle_event(BusEvent::WallpaperChanged(reference.clone()));
    runtime.handle_event(BusEvent::WallpaperChanged(WallpaperReference::new(99, reference.image_url.clone())));

    assert_eq!(wallpaper_commits(runtime.compositor().host()), [reference.image_url.as_str()]);
}

#[test]
fn test_last_request_wins_when_crops_finish_out_of_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_wallpaper(dir.path(), "a.png", [255, 0, 0, 255]);
    let second = write_wallpaper(dir.path(), "b.png", [0, 0, 255, 255]);

    let mut compositor = Compositor::new(HeadlessHost::new(), CompositorSettings::default());
    compositor.attach(display(), Appearance::Light);

    let first_ticket = compositor.request_wallpaper(first).unwrap();
    let second_ticket = compositor.request_wallpaper(second.clone()).unwrap();

    let second_strip = crop_wallpaper(&second_ticket.reference, &second_ticket.display);
    assert_eq!(compositor.complete_crop(&second_ticket, second_strip), CropOutcome::Applied(second.clone()));

    let first_strip = crop_wallpaper(&first_ticket.reference, &first_ticket.display);
    assert_eq!(compositor.complete_crop(&first_ticket, first_strip), CropOutcome::Superseded);

    assert_eq!(compositor.applied_wallpaper(), Some(&second));
    assert_eq!(wallpaper_commits(compositor.host()), [second.image_url.as_str()]);
}

#[test]
fn test_undecodable_wallpaper_keeps_previous_strip() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_wallpaper(dir.path(), "good.png", [10, 10, 10, 255]);
    let broken_path = dir.path().join("broken.png");
    std::fs::write(&broken_path, b"not a png").unwrap();
    let broken = WallpaperReference::from_path(display().id, &broken_path).unwrap();

    let mut runtime = runtime(leaked_bus(), false);
    runtime.start(display(), Appearance::Dark, Some(good.clone()));
    runtime.handle_event(BusEvent::WallpaperChanged(broken));

    assert_eq!(runtime.compositor().applied_wallpaper(), Some(&good));
    assert_eq!(wallpaper_commits(runtime.compositor().host()), [good.image_url.as_str()]);
}

// ============================================================================
// Appearance
// ============================================================================

#[test]
fn test_appearance_change_reasserts_filters() {
    let bus = leaked_bus();
    let mut runtime = runtime(bus, false);
    runtime.connect_bus();
    runtime.start(display(), Appearance::Dark, None);
    runtime.compositor_mut().host_mut().take_commands();

    bus.publish(BusEvent::AppearanceChanged(Appearance::Light));
    pump_until(&mut runtime, |rt| rt.compositor().appearance() == Appearance::Light);

    let commands = runtime.compositor().host().commands();
    let backdrop = commands.iter().find_map(|command| match command {
        HostCommand::BackdropFilters(filters) => Some(filters.clone()),
        _ => None,
    });
    let backdrop = backdrop.unwrap();
    assert!(backdrop.iter().any(|filter| matches!(filter, BackdropFilter::Invert { enabled: true })));
    assert!(commands.iter().any(|command| matches!(command, HostCommand::WallpaperFilters { .. })));

    runtime.shutdown();
}

// ============================================================================
// Locator and listener
// ============================================================================

#[test]
fn test_locator_uses_most_recent_log_lookup_for_directories() {
    let dir = tempfile::tempdir().unwrap();
    let history = CannedHistory {
        messages: vec![
            lookup_message("file:///Library/Wallpapers/a.heic"),
            "unrelated message".to_string(),
            lookup_message("file:///Library/Wallpapers/b.heic"),
        ],
        ..CannedHistory::default()
    };
    let locator = WallpaperLocator::new(
        FixedDesktop(Some(dir.path().to_path_buf())),
        history,
        RecencyWindows::default(),
    );

    let reference = locator.locate(&display(), Recency::Current).unwrap();

    assert_eq!(reference.image_url, "file:///Library/Wallpapers/b.heic");
    assert_eq!(reference.display_id, display().id);
}

#[test]
fn test_startup_resolution_reads_last_known_window() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(CannedHistory {
        messages: vec![lookup_message("file:///Library/Wallpapers/b.heic")],
        ..CannedHistory::default()
    });
    let locator = WallpaperLocator::new(
        FixedDesktop(Some(dir.path().to_path_buf())),
        SharedHistory(Arc::clone(&history)),
        RecencyWindows::default(),
    );
    let listener = WallpaperListener::new(leaked_bus(), display().id);

    let published = listener.publish_initial(&locator, &display()).unwrap();

    assert_eq!(published.image_url, "file:///Library/Wallpapers/b.heic");
    assert_eq!(*history.windows.lock(), [Duration::from_secs(120)]);
}

#[test]
fn test_locator_prefers_desktop_file() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_wallpaper(dir.path(), "still.png", [1, 2, 3, 255]);
    let history = Arc::new(CannedHistory::default());

    let locator = WallpaperLocator::new(
        FixedDesktop(reference.to_path()),
        SharedHistory(Arc::clone(&history)),
        RecencyWindows::default(),
    );

    assert_eq!(locator.locate(&display(), Recency::LastKnown).unwrap(), reference);
    assert!(history.windows.lock().is_empty());
}

#[test]
fn test_log_message_flows_to_compositor() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_wallpaper(dir.path(), "dynamic.png", [200, 150, 100, 255]);
    let bus = leaked_bus();

    let mut runtime = runtime(bus, true);
    runtime.connect_bus();
    runtime.start(display(), Appearance::Light, None);

    let listener = WallpaperListener::new(bus, display().id);
    assert!(listener.handle_log_message(&lookup_message(&reference.image_url)));
    assert!(listener.handle_log_message(&lookup_message(&reference.image_url)));
    assert!(!listener.handle_log_message("Image cache hit"));

    pump_until(&mut runtime, |rt| rt.compositor().applied_wallpaper().is_some());
    runtime.drain();
    assert_eq!(runtime.compositor().applied_wallpaper(), Some(&reference));
    assert_eq!(wallpaper_commits(runtime.compositor().host()), [reference.image_url.as_str()]);
    assert_eq!(listener.last_seen(), Some(reference));

    runtime.shutdown();
}

#[test]
fn test_unlock_publishes_only_a_changed_wallpaper() {
    let bus = leaked_bus();
    let mut subscription = bus.subscribe();
    let history = CannedHistory {
        messages: vec![lookup_message("file:///Library/Wallpapers/b.heic")],
        ..CannedHistory::default()
    };
    let locator = WallpaperLocator::new(FixedDesktop(None), history, RecencyWindows::default());
    let listener = WallpaperListener::new(bus, display().id);
    listener.set_last_seen(Some(WallpaperReference::new(display().id, "file:///Library/Wallpapers/a.heic")));

    let published = listener.on_screen_unlocked(&locator, &display()).unwrap();
    assert_eq!(published.image_url, "file:///Library/Wallpapers/b.heic");
    assert!(listener.on_screen_unlocked(&locator, &display()).is_none());

    assert_eq!(subscription.receiver.try_recv().unwrap(), BusEvent::WallpaperChanged(published));
    assert!(subscription.receiver.try_recv().is_err());
}
