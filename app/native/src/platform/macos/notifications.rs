//! System notifications via `NSDistributedNotificationCenter` and `NSNotificationCenter`.
//!
//! Screen unlocks and appearance changes arrive as distributed notifications;
//! screen parameter changes and termination come from the application's own
//! notification center. They are delivered on the main run loop and fanned
//! out to the registered handlers, one of which forwards them onto the change
//! event bus.

use std::cell::Cell;
use std::sync::{Arc, OnceLock};

use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel};
use objc::{class, msg_send, sel, sel_impl};
use parking_lot::Mutex;

use super::objc::{Id, nsstring, nsstring_to_string, user_default_string};
use super::screen::main_display;
use crate::compositor::Appearance;
use crate::constants::notifications::{SCREEN_UNLOCKED, THEME_CHANGED, WALLPAPER_CHANGED};
use crate::display::MenuBarHeightTable;
use crate::events::{BusEvent, ChangeEventBus};
use crate::wallpaper::WallpaperReference;

/// Posted by `NSApplication` when screens are added, removed or reconfigured.
const SCREEN_PARAMETERS_CHANGED: &str = "NSApplicationDidChangeScreenParametersNotification";

/// Posted by `NSApplication` right before the process exits.
const WILL_TERMINATE: &str = "NSApplicationWillTerminateNotification";

/// Name of the Objective-C observer class.
const OBSERVER_CLASS: &str = "ClearbarSystemObserver";

/// Host notifications clearbar reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNotification {
    ScreenUnlocked,
    ThemeChanged,
    ScreenParametersChanged,
    WillTerminate,
}

const ALL: [SystemNotification; 4] = [
    SystemNotification::ScreenUnlocked,
    SystemNotification::ThemeChanged,
    SystemNotification::ScreenParametersChanged,
    SystemNotification::WillTerminate,
];

impl SystemNotification {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ScreenUnlocked => SCREEN_UNLOCKED,
            Self::ThemeChanged => THEME_CHANGED,
            Self::ScreenParametersChanged => SCREEN_PARAMETERS_CHANGED,
            Self::WillTerminate => WILL_TERMINATE,
        }
    }

    /// Returns whether the notification is posted across processes.
    const fn is_distributed(self) -> bool { matches!(self, Self::ScreenUnlocked | Self::ThemeChanged) }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.into_iter().find(|notification| notification.name() == name)
    }
}

/// Reads the current system appearance.
#[must_use]
pub fn current_appearance() -> Appearance {
    let style = unsafe { user_default_string("AppleInterfaceStyle") };
    Appearance::from_interface_style(style.as_deref())
}

/// Maps a notification to the bus event it stands for.
#[must_use]
pub fn to_bus_event(notification: SystemNotification, table: &MenuBarHeightTable) -> Option<BusEvent> {
    match notification {
        SystemNotification::ScreenUnlocked => Some(BusEvent::ScreenUnlocked),
        SystemNotification::ThemeChanged => Some(BusEvent::AppearanceChanged(current_appearance())),
        SystemNotification::ScreenParametersChanged => main_display(table).map(BusEvent::DisplayChanged),
        SystemNotification::WillTerminate => None,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Callback type for notification handlers.
pub type NotificationHandler = Arc<dyn Fn(SystemNotification) + Send + Sync>;

/// Global storage for notification handlers.
static NOTIFICATION_HANDLERS: OnceLock<Mutex<Vec<NotificationHandler>>> = OnceLock::new();

/// Registers a handler called, on the main thread, for every system notification.
pub fn register_notification_handler<F>(handler: F)
where F: Fn(SystemNotification) + Send + Sync + 'static {
    let handlers = NOTIFICATION_HANDLERS.get_or_init(|| Mutex::new(Vec::new()));
    handlers.lock().push(Arc::new(handler));
}

/// Registers a handler that publishes every notification onto `bus`.
pub fn forward_to_bus(bus: &'static ChangeEventBus, table: MenuBarHeightTable) {
    register_notification_handler(move |notification| {
        if let Some(event) = to_bus_event(notification, &table) {
            tracing::debug!(event = event.name(), "notifications: forwarding");
            bus.publish(event);
        }
    });
}

/// Removes every registered handler. Returns how many were removed.
pub fn clear_notification_handlers() -> usize {
    NOTIFICATION_HANDLERS.get().map_or(0, |handlers| handlers.lock().drain(..).count())
}

/// Calls the handlers on a snapshot, so a handler may clear the list.
fn dispatch(notification: SystemNotification) {
    let snapshot: Vec<NotificationHandler> =
        NOTIFICATION_HANDLERS.get().map(|handlers| handlers.lock().clone()).unwrap_or_default();
    for handler in snapshot {
        handler(notification);
    }
}

// ============================================================================
// Observer
// ============================================================================

thread_local! {
    /// The registered observer instance. Only touched on the main thread.
    static OBSERVER: Cell<Option<Id>> = const { Cell::new(None) };
}

/// Returns the distributed and the local notification centers.
unsafe fn centers() -> (Id, Id) {
    unsafe {
        let distributed: Id = msg_send![class!(NSDistributedNotificationCenter), defaultCenter];
        let local: Id = msg_send![class!(NSNotificationCenter), defaultCenter];
        (distributed, local)
    }
}

/// Starts observing all system notifications.
///
/// Must be called on the main thread, before the run loop starts. A running
/// observer is stopped first.
pub fn start_system_observers() {
    stop_observer();

    let Some(observer) = create_observer() else {
        tracing::warn!("notifications: failed to declare observer class");
        return;
    };

    unsafe {
        let (distributed, local) = centers();

        for notification in ALL {
            let center = if notification.is_distributed() { distributed } else { local };
            if center.is_null() {
                tracing::warn!(name = notification.name(), "notifications: center unavailable");
                continue;
            }

            let _: () = msg_send![
                center,
                addObserver: observer
                selector: sel!(handleNotification:)
                name: nsstring(notification.name())
                object: std::ptr::null::<Object>()
            ];
        }
    }

    OBSERVER.with(|cell| cell.set(Some(observer)));
    tracing::debug!("notifications: observing system notifications");
}

/// Detaches the observer from both centers and drops every handler.
///
/// Must be called on the main thread. Safe to call more than once.
pub fn stop_system_observers() {
    stop_observer();
    let removed = clear_notification_handlers();
    tracing::debug!(handlers = removed, "notifications: stopped observing");
}

fn stop_observer() {
    let Some(observer) = OBSERVER.with(Cell::take) else {
        return;
    };

    unsafe {
        let (distributed, local) = centers();
        for center in [distributed, local] {
            if !center.is_null() {
                let _: () = msg_send![center, removeObserver: observer];
            }
        }
        let _: () = msg_send![observer, release];
    }
}

fn create_observer() -> Option<Id> {
    let observer_class = match Class::get(OBSERVER_CLASS) {
        Some(existing) => existing,
        None => {
            let mut decl = ClassDecl::new(OBSERVER_CLASS, class!(NSObject))?;
            unsafe {
                decl.add_method(
                    sel!(handleNotification:),
                    handle_notification as extern "C" fn(&Object, Sel, Id),
                );
            }
            decl.register()
        }
    };

    unsafe {
        let instance: Id = msg_send![observer_class, alloc];
        let instance: Id = msg_send![instance, init];
        (!instance.is_null()).then_some(instance)
    }
}

extern "C" fn handle_notification(_self: &Object, _cmd: Sel, notification: Id) {
    if notification.is_null() {
        return;
    }

    let name = unsafe {
        let name: Id = msg_send![notification, name];
        nsstring_to_string(name)
    };

    if let Some(notification) = SystemNotification::from_name(&name) {
        tracing::debug!(?notification, "notifications: received");
        dispatch(notification);
    }
}

// ============================================================================
// Outgoing
// ============================================================================

/// Announces a newly applied wallpaper to other processes.
///
/// The notification carries the image URL under the `url` key.
pub fn post_wallpaper_changed(reference: &WallpaperReference) -> bool {
    unsafe {
        let center: Id = msg_send![class!(NSDistributedNotificationCenter), defaultCenter];
        if center.is_null() {
            tracing::warn!("notifications: failed to get NSDistributedNotificationCenter");
            return false;
        }

        let user_info: Id = msg_send![class!(NSMutableDictionary), new];
        let _: () = msg_send![
            user_info,
            setObject: nsstring(&reference.image_url)
            forKey: nsstring("url")
        ];

        let _: () = msg_send![
            center,
            postNotificationName: nsstring(WALLPAPER_CHANGED)
            object: std::ptr::null::<Object>()
            userInfo: user_info
            deliverImmediately: true
        ];
        let _: () = msg_send![user_info, release];
    }
    true
}
