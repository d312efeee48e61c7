//! Wallpaper change detection.
//!
//! Two sources feed the bus with [`BusEvent::WallpaperChanged`]:
//!
//! - a `log stream` subscription that reports every image-cache lookup as it
//!   happens, and
//! - screen unlocks, after which the locator is re-run and a change is published
//!   only if the resolved URL differs from the last one seen.
//!
//! Consumers still de-duplicate against what they have applied, since the two
//! sources are not ordered relative to each other.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::WallpaperReference;
use super::locator::{Locate, LocateError, Recency};
use super::log::{LogError, LogStream, extract_wallpaper_url};
use crate::display::Display;
use crate::events::{BusEvent, ChangeEventBus};

struct ListenerState {
    bus: &'static ChangeEventBus,
    display_id: u32,
    last_seen: Mutex<Option<WallpaperReference>>,
}

impl ListenerState {
    fn on_log_message(&self, message: &str) -> bool {
        let Some(url) = extract_wallpaper_url(message) else {
            return false;
        };

        let reference = WallpaperReference::new(self.display_id, url);
        tracing::debug!(url = %reference.image_url, "wallpaper: lookup seen in log stream");

        *self.last_seen.lock() = Some(reference.clone());
        self.bus.publish(BusEvent::WallpaperChanged(reference));
        true
    }
}

/// Publishes wallpaper changes for one display onto the bus.
pub struct WallpaperListener {
    state: Arc<ListenerState>,
    stream: Mutex<Option<LogStream>>,
}

impl WallpaperListener {
    /// Creates an idle listener for `display_id`. No source is active until
    /// [`WallpaperListener::start_stream`] is called.
    #[must_use]
    pub fn new(bus: &'static ChangeEventBus, display_id: u32) -> Self {
        Self {
            state: Arc::new(ListenerState {
                bus,
                display_id,
                last_seen: Mutex::new(None),
            }),
            stream: Mutex::new(None),
        }
    }

    /// Seeds the last seen reference, typically with the wallpaper resolved at startup.
    pub fn set_last_seen(&self, reference: Option<WallpaperReference>) {
        *self.state.last_seen.lock() = reference;
    }

    /// Returns the last reference published or seeded.
    #[must_use]
    pub fn last_seen(&self) -> Option<WallpaperReference> { self.state.last_seen.lock().clone() }

    /// Starts the `log stream` source. A running stream is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the `log` tool cannot be launched.
    pub fn start_stream(&self, log_binary: &Path) -> Result<(), LogError> {
        let state = Arc::clone(&self.state);
        let stream = LogStream::spawn(log_binary, move |message| {
            state.on_log_message(&message);
        })?;

        if let Some(previous) = self.stream.lock().replace(stream) {
            previous.stop();
        }
        tracing::info!("wallpaper: listening for wallpaper changes");
        Ok(())
    }

    /// Returns whether the log stream source is running.
    #[must_use]
    pub fn is_streaming(&self) -> bool { self.stream.lock().is_some() }

    /// Handles one message from the log stream. Returns whether an event was published.
    pub fn handle_log_message(&self, message: &str) -> bool { self.state.on_log_message(message) }

    /// Resolves the wallpaper shown at startup and publishes it.
    ///
    /// Uses the last-known log window: a dynamic wallpaper rarely logs a lookup
    /// in the seconds before launch. Seeds the last seen reference so the next
    /// unlock check only publishes a real change.
    pub fn publish_initial(&self, locator: &dyn Locate, display: &Display) -> Option<WallpaperReference> {
        let reference = match locator.locate(display, Recency::LastKnown) {
            Ok(reference) => reference,
            Err(err) => {
                tracing::warn!(error = %err, "wallpaper: no wallpaper resolved at startup");
                return None;
            }
        };

        *self.state.last_seen.lock() = Some(reference.clone());
        tracing::info!(url = %reference.image_url, "wallpaper: resolved at startup");
        self.state.bus.publish(BusEvent::WallpaperChanged(reference.clone()));
        Some(reference)
    }

    /// Re-resolves the wallpaper after a screen unlock.
    ///
    /// Publishes a change only if the URL differs from the last one seen.
    /// Lookup failures are logged and yield no event.
    pub fn on_screen_unlocked(&self, locator: &dyn Locate, display: &Display) -> Option<WallpaperReference> {
        let reference = match locator.locate(display, Recency::LastKnown) {
            Ok(reference) => reference,
            Err(LocateError::NotFound) => {
                tracing::debug!("wallpaper: nothing resolved after unlock");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "wallpaper: lookup after unlock failed");
                return None;
            }
        };

        {
            let mut last_seen = self.state.last_seen.lock();
            if last_seen.as_ref() == Some(&reference) {
                return None;
            }
            *last_seen = Some(reference.clone());
        }

        tracing::info!(url = %reference.image_url, "wallpaper: changed while locked");
        self.state.bus.publish(BusEvent::WallpaperChanged(reference.clone()));
        Some(reference)
    }

    /// Stops the log stream source. Safe to call more than once.
    pub fn stop(&self) {
        if let Some(stream) = self.stream.lock().take() {
            stream.stop();
            tracing::debug!("wallpaper: listener stopped");
        }
    }
}

impl Drop for WallpaperListener {
    fn drop(&mut self) { self.stop(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLocator(Option<&'static str>);

    impl Locate for FixedLocator {
        fn locate(&self, display: &Display, _recency: Recency) -> Result<WallpaperReference, LocateError> {
            self.0
                .map(|url| WallpaperReference::new(display.id, url))
                .ok_or(LocateError::NotFound)
        }
    }

    fn leaked_bus() -> &'static ChangeEventBus { Box::leak(Box::new(ChangeEventBus::new())) }

    fn display() -> Display {
        Display {
            id: 3,
            width_px: 1920,
            height_px: 1080,
            menu_bar_height_px: 24,
            backing_scale: 1.0,
        }
    }

    const LOOKUP: &str = "BEGIN - Image cache lookup - url: file:///Wallpapers/b.heic, size: 1";

    #[test]
    fn test_log_message_publishes_every_match() {
        let bus = leaked_bus();
        let mut subscription = bus.subscribe();
        let listener = WallpaperListener::new(bus, 3);

        assert!(listener.handle_log_message(LOOKUP));
        assert!(listener.handle_log_message(LOOKUP));
        assert!(!listener.handle_log_message("BEGIN - Image cache lookup - no url here"));

        let expected = BusEvent::WallpaperChanged(WallpaperReference::new(3, "file:///Wallpapers/b.heic"));
        assert_eq!(subscription.receiver.try_recv().unwrap(), expected);
        assert_eq!(subscription.receiver.try_recv().unwrap(), expected);
        assert!(subscription.receiver.try_recv().is_err());
    }

    #[test]
    fn test_unlock_publishes_only_on_change() {
        let bus = leaked_bus();
        let mut subscription = bus.subscribe();
        let listener = WallpaperListener::new(bus, 3);
        listener.set_last_seen(Some(WallpaperReference::new(3, "file:///Wallpapers/a.heic")));

        let unchanged = FixedLocator(Some("file:///Wallpapers/a.heic"));
        assert!(listener.on_screen_unlocked(&unchanged, &display()).is_none());
        assert!(subscription.receiver.try_recv().is_err());

        let changed = FixedLocator(Some("file:///Wallpapers/b.heic"));
        let published = listener.on_screen_unlocked(&changed, &display()).unwrap();
        assert_eq!(published.image_url, "file:///Wallpapers/b.heic");
        assert_eq!(
            subscription.receiver.try_recv().unwrap(),
            BusEvent::WallpaperChanged(published)
        );

        assert!(listener.on_screen_unlocked(&changed, &display()).is_none());
    }

    #[test]
    fn test_unlock_without_result_yields_no_event() {
        let bus = leaked_bus();
        let mut subscription = bus.subscribe();
        let listener = WallpaperListener::new(bus, 3);

        assert!(listener.on_screen_unlocked(&FixedLocator(None), &display()).is_none());
        assert!(subscription.receiver.try_recv().is_err());
        assert!(listener.last_seen().is_none());
    }

    /// Remembers which recency windows were asked for.
    #[derive(Default)]
    struct RecordingLocator {
        asked: Mutex<Vec<Recency>>,
    }

    impl Locate for RecordingLocator {
        fn locate(&self, display: &Display, recency: Recency) -> Result<WallpaperReference, LocateError> {
            self.asked.lock().push(recency);
            Ok(WallpaperReference::new(display.id, "file:///Wallpapers/a.heic"))
        }
    }

    #[test]
    fn test_startup_uses_last_known_window() {
        let bus = leaked_bus();
        let mut subscription = bus.subscribe();
        let listener = WallpaperListener::new(bus, 3);
        let locator = RecordingLocator::default();

        let published = listener.publish_initial(&locator, &display()).unwrap();

        assert_eq!(*locator.asked.lock(), [Recency::LastKnown]);
        assert_eq!(listener.last_seen(), Some(published.clone()));
        assert_eq!(subscription.receiver.try_recv().unwrap(), BusEvent::WallpaperChanged(published));
    }

    #[test]
    fn test_startup_then_unlock_with_same_wallpaper_is_quiet() {
        let bus = leaked_bus();
        let mut subscription = bus.subscribe();
        let listener = WallpaperListener::new(bus, 3);
        let locator = FixedLocator(Some("file:///Wallpapers/a.heic"));

        assert!(listener.publish_initial(&locator, &display()).is_some());
        assert!(listener.on_screen_unlocked(&locator, &display()).is_none());

        assert!(subscription.receiver.try_recv().is_ok());
        assert!(subscription.receiver.try_recv().is_err());
    }

    #[test]
    fn test_startup_without_result_publishes_nothing() {
        let bus = leaked_bus();
        let mut subscription = bus.subscribe();
        let listener = WallpaperListener::new(bus, 3);

        assert!(listener.publish_initial(&FixedLocator(None), &display()).is_none());
        assert!(subscription.receiver.try_recv().is_err());
    }

    #[test]
    fn test_stream_message_updates_last_seen() {
        let listener = WallpaperListener::new(leaked_bus(), 3);
        listener.handle_log_message(LOOKUP);
        assert_eq!(
            listener.last_seen().map(|r| r.image_url),
            Some("file:///Wallpapers/b.heic".to_string())
        );
    }

    #[test]
    fn test_start_stream_with_missing_binary_fails() {
        let listener = WallpaperListener::new(leaked_bus(), 3);
        assert!(listener.start_stream(Path::new("/nonexistent/clearbar/log")).is_err());
        assert!(!listener.is_streaming());
        listener.stop();
    }
}
