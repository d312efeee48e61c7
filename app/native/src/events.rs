//! Change events and the process-wide event bus.
//!
//! Every asynchronous signal the effect reacts to (wallpaper changes,
//! appearance switches, display reconfiguration, screen unlocks) travels
//! through a [`ChangeEventBus`]. Producers publish from any thread; consumers
//! hold a [`Subscription`] and drain it on their own scheduling context.
//!
//! ## Naming Convention
//!
//! Event names follow the pattern: `clearbar://<module>/<event-name>`
//!
//! - `clearbar://` - Prefix identifying this as a clearbar event
//! - `<module>` - The module that owns the event (e.g., `wallpaper`, `display`)
//! - `<event-name>` - Descriptive kebab-case name for the event

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use uuid::Uuid;

use crate::compositor::Appearance;
use crate::display::Display;
use crate::wallpaper::WallpaperReference;

/// Wallpaper related events.
pub mod wallpaper {
    /// Emitted when a new wallpaper URL is observed.
    ///
    /// Payload: `WallpaperReference`
    pub const CHANGED: &str = "clearbar://wallpaper/changed";
}

/// Appearance related events.
pub mod appearance {
    /// Emitted when the system switches between light and dark mode.
    ///
    /// Payload: `"light"` or `"dark"`.
    pub const CHANGED: &str = "clearbar://appearance/changed";
}

/// Display related events.
pub mod display {
    /// Emitted when the backing scale or geometry of the main display changes.
    ///
    /// Payload: `Display`
    pub const CHANGED: &str = "clearbar://display/changed";
}

/// Session related events.
pub mod session {
    /// Emitted when the screen is unlocked.
    ///
    /// Payload: `()` (no payload)
    pub const SCREEN_UNLOCKED: &str = "clearbar://session/screen-unlocked";
}

/// Blend group related events.
pub mod blend_group {
    /// Emitted when the last holder of a blend group releases it.
    ///
    /// Payload: `Uuid` - The released group token.
    pub const RELEASED: &str = "clearbar://blend-group/released";
}

/// An event carried by the bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum BusEvent {
    WallpaperChanged(WallpaperReference),
    AppearanceChanged(Appearance),
    DisplayChanged(Display),
    ScreenUnlocked,
    BlendGroupReleased(Uuid),
}

impl BusEvent {
    /// Returns the `clearbar://` name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WallpaperChanged(_) => wallpaper::CHANGED,
            Self::AppearanceChanged(_) => appearance::CHANGED,
            Self::DisplayChanged(_) => display::CHANGED,
            Self::ScreenUnlocked => session::SCREEN_UNLOCKED,
            Self::BlendGroupReleased(_) => blend_group::RELEASED,
        }
    }
}

/// Identifier of a bus subscription.
pub type SubscriptionId = u64;

/// A live subscription to the bus.
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: UnboundedReceiver<BusEvent>,
}

/// Fan-out event bus with explicit subscribe/unsubscribe.
#[derive(Default)]
pub struct ChangeEventBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, UnboundedSender<BusEvent>)>>,
}

impl ChangeEventBus {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = unbounded_channel();
        self.subscribers.lock().push((id, sender));

        tracing::debug!(subscription = id, "events: subscribed");
        Subscription { id, receiver }
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        let removed = subscribers.len() != before;

        if removed {
            tracing::debug!(subscription = id, "events: unsubscribed");
        }
        removed
    }

    /// Delivers `event` to every subscriber, dropping those whose receiver is gone.
    ///
    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: BusEvent) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|(_, sender)| sender.send(event.clone()).is_ok());

        tracing::trace!(event = event.name(), delivered = subscribers.len(), "events: published");
        subscribers.len()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize { self.subscribers.lock().len() }
}

/// Returns the process-wide bus.
pub fn bus() -> &'static ChangeEventBus {
    static BUS: OnceLock<ChangeEventBus> = OnceLock::new();
    BUS.get_or_init(ChangeEventBus::new)
}
