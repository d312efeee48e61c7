//! The main scheduling context.
//!
//! Compositor state is only touched from the thread that owns the [`Runtime`].
//! Other threads (the bus forwarder, crop workers, config watcher) send work
//! through a [`MainHandle`]; the owner runs it in [`Runtime::drain`], either
//! when the platform main loop is woken or from a blocking loop in headless
//! mode.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::compositor::{Appearance, Compositor, CropOutcome, CropTicket, Effect, LayerHost};
use crate::display::Display;
use crate::events::{BusEvent, ChangeEventBus, SubscriptionId};
use crate::platform::thread::{spawn_joinable_thread, spawn_named_thread};
use crate::wallpaper::processing::crop_wallpaper;
use crate::wallpaper::{CroppedStrip, Locate, ProcessingError, WallpaperListener, WallpaperReference};

/// Work to run on the main context.
pub type MainTask<H> = Box<dyn FnOnce(&mut Runtime<H>) + Send>;

/// Called after a task is queued, to schedule a drain on the main loop.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Called with every wallpaper that became visible.
pub type AppliedHook = Box<dyn Fn(&WallpaperReference)>;

/// Cloneable, `Send` handle for posting work to the runtime.
pub struct MainHandle<H: LayerHost + 'static> {
    sender: UnboundedSender<MainTask<H>>,
    waker: Option<Waker>,
}

impl<H: LayerHost + 'static> Clone for MainHandle<H> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            waker: self.waker.clone(),
        }
    }
}

impl<H: LayerHost + 'static> MainHandle<H> {
    /// Queues `task`. Returns `false` if the runtime is gone.
    pub fn post<F>(&self, task: F) -> bool
    where F: FnOnce(&mut Runtime<H>) + Send + 'static {
        if self.sender.send(Box::new(task)).is_err() {
            return false;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
        true
    }

    /// Queues a bus event.
    pub fn post_event(&self, event: BusEvent) -> bool { self.post(move |runtime| runtime.handle_event(event)) }

    /// Queues an effect change.
    pub fn post_effect(&self, effect: Effect) -> bool {
        self.post(move |runtime| runtime.compositor_mut().set_effect(effect))
    }

    /// Asks the runtime to shut down.
    pub fn request_shutdown(&self) -> bool { self.post(Runtime::<H>::shutdown) }
}

/// Options fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Crop on worker threads instead of the main context.
    pub off_main_thread_crop: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self { Self { off_main_thread_crop: true } }
}

pub struct Runtime<H: LayerHost + 'static> {
    compositor: Compositor<H>,
    receiver: UnboundedReceiver<MainTask<H>>,
    handle: MainHandle<H>,
    options: RuntimeOptions,
    bus: &'static ChangeEventBus,
    subscription: Option<SubscriptionId>,
    forwarder: Option<JoinHandle<()>>,
    listener: Option<Arc<WallpaperListener>>,
    locator: Option<Arc<dyn Locate>>,
    on_applied: Option<AppliedHook>,
    stopped: bool,
}

impl<H: LayerHost + 'static> Runtime<H> {
    #[must_use]
    pub fn new(
        compositor: Compositor<H>,
        bus: &'static ChangeEventBus,
        options: RuntimeOptions,
        waker: Option<Waker>,
    ) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            compositor,
            receiver,
            handle: MainHandle { sender, waker },
            options,
            bus,
            subscription: None,
            forwarder: None,
            listener: None,
            locator: None,
            on_applied: None,
            stopped: false,
        }
    }

    #[must_use]
    pub fn handle(&self) -> MainHandle<H> { self.handle.clone() }

    #[must_use]
    pub const fn compositor(&self) -> &Compositor<H> { &self.compositor }

    pub const fn compositor_mut(&mut self) -> &mut Compositor<H> { &mut self.compositor }

    #[must_use]
    pub const fn is_stopped(&self) -> bool { self.stopped }

    /// Sets the wallpaper listener stopped on shutdown and the locator used after unlocks.
    pub fn set_wallpaper_sources(&mut self, listener: Arc<WallpaperListener>, locator: Arc<dyn Locate>) {
        self.listener = Some(listener);
        self.locator = Some(locator);
    }

    /// Registers a hook run after each applied strip.
    pub fn set_on_applied(&mut self, hook: AppliedHook) { self.on_applied = Some(hook); }

    /// Subscribes to the bus and forwards its events into the task queue.
    pub fn connect_bus(&mut self) {
        if self.subscription.is_some() {
            return;
        }

        let mut subscription = self.bus.subscribe();
        self.subscription = Some(subscription.id);

        let handle = self.handle.clone();
        self.forwarder = spawn_joinable_thread("event-forwarder", move || {
            while let Some(event) = subscription.receiver.blocking_recv() {
                if !handle.post_event(event) {
                    break;
                }
            }
            tracing::debug!("runtime: event forwarder finished");
        });
    }

    /// Runs queued tasks without blocking. Returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task(self);
            ran += 1;
        }
        ran
    }

    /// Runs tasks as they arrive until [`Runtime::shutdown`] is called.
    pub fn run_until_shutdown(&mut self) {
        while !self.stopped {
            match self.receiver.blocking_recv() {
                Some(task) => task(self),
                None => break,
            }
        }
    }

    /// Reacts to one bus event.
    pub fn handle_event(&mut self, event: BusEvent) {
        tracing::debug!(event = event.name(), "runtime: event");
        match event {
            BusEvent::WallpaperChanged(reference) => {
                if let Some(ticket) = self.compositor.request_wallpaper(reference) {
                    self.schedule_crop(ticket);
                }
            }
            BusEvent::AppearanceChanged(appearance) => self.compositor.on_appearance_changed(appearance),
            BusEvent::DisplayChanged(display) => {
                if let Some(ticket) = self.compositor.on_display_changed(display) {
                    self.schedule_crop(ticket);
                }
            }
            BusEvent::ScreenUnlocked => self.check_after_unlock(),
            BusEvent::BlendGroupReleased(token) => self.compositor.on_blend_group_released(token),
        }
    }

    /// Re-runs the locator off the main context; the listener publishes if it changed.
    fn check_after_unlock(&self) {
        let (Some(listener), Some(locator), Some(display)) =
            (self.listener.clone(), self.locator.clone(), self.compositor.display().copied())
        else {
            return;
        };

        spawn_named_thread("unlock-check", move || {
            listener.on_screen_unlocked(locator.as_ref(), &display);
        });
    }

    fn schedule_crop(&mut self, ticket: CropTicket) {
        if !self.options.off_main_thread_crop {
            let result = crop_wallpaper(&ticket.reference, &ticket.display);
            self.finish_crop(&ticket, result);
            return;
        }

        let handle = self.handle.clone();
        spawn_named_thread("crop", move || {
            let result = crop_wallpaper(&ticket.reference, &ticket.display);
            handle.post(move |runtime| runtime.finish_crop(&ticket, result));
        });
    }

    fn finish_crop(
        &mut self,
        ticket: &CropTicket,
        result: Result<CroppedStrip, ProcessingError>,
    ) {
        if let CropOutcome::Applied(reference) = self.compositor.complete_crop(ticket, result)
            && let Some(hook) = &self.on_applied
        {
            hook(&reference);
        }
    }

    /// Starts the effect for `display` and requests `initial` if given.
    pub fn start(
        &mut self,
        display: Display,
        appearance: Appearance,
        initial: Option<WallpaperReference>,
    ) {
        if let Some(ticket) = self.compositor.attach(display, appearance) {
            self.schedule_crop(ticket);
        }
        if let Some(reference) = self.compositor.applied_wallpaper()
            && let Some(hook) = &self.on_applied
        {
            hook(reference);
        }
        if let Some(ticket) = initial.and_then(|reference| self.compositor.request_wallpaper(reference)) {
            self.schedule_crop(ticket);
        }
    }

    /// Stops the listener, leaves the bus and joins the forwarder. Idempotent.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Some(listener) = self.listener.take() {
            listener.stop();
        }
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
        if let Some(forwarder) = self.forwarder.take() {
            let _ = forwarder.join();
        }
        self.locator = None;

        tracing::info!("runtime: shut down");
    }
}

impl<H: LayerHost + 'static> Drop for Runtime<H> {
    fn drop(&mut self) { self.shutdown(); }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;
    use crate::compositor::{CompositorSettings, HeadlessHost, HostCommand, Layer};

    fn leaked_bus() -> &'static ChangeEventBus { Box::leak(Box::new(ChangeEventBus::new())) }

    fn display() -> Display {
        Display {
            id: 1,
            width_px: 320,
            height_px: 180,
            menu_bar_height_px: 12,
            backing_scale: 1.0,
        }
    }

    fn write_wallpaper(dir: &std::path::Path, name: &str) -> WallpaperReference {
        let path = dir.join(name);
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(640, 360, Rgba([10, 20, 30, 255])))
            .save(&path)
            .unwrap();
        WallpaperReference::from_path(1, &path).unwrap()
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

    #[test]
    fn test_inline_crop_applies_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_wallpaper(dir.path(), "a.png");
        let mut runtime = runtime(leaked_bus(), false);
        runtime.start(display(), Appearance::Light, None);

        runtime.handle_event(BusEvent::WallpaperChanged(reference.clone()));

        assert_eq!(runtime.compositor().applied_wallpaper(), Some(&reference));
        assert_eq!(
            runtime.compositor().host().current_wallpaper(),
            Some(reference.image_url.as_str())
        );
    }

    #[test]
    fn test_worker_crop_is_posted_back() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_wallpaper(dir.path(), "a.png");
        let mut runtime = runtime(leaked_bus(), true);
        runtime.start(display(), Appearance::Dark, Some(reference.clone()));

        assert!(runtime.compositor().applied_wallpaper().is_none());
        pump_until(&mut runtime, |rt| rt.compositor().applied_wallpaper().is_some());

        assert_eq!(runtime.compositor().applied_wallpaper(), Some(&reference));
    }

    #[test]
    fn test_bus_events_reach_compositor() {
        let bus = leaked_bus();
        let mut runtime = runtime(bus, false);
        runtime.start(display(), Appearance::Light, None);
        runtime.connect_bus();

        bus.publish(BusEvent::AppearanceChanged(Appearance::Dark));
        pump_until(&mut runtime, |rt| rt.compositor().appearance() == Appearance::Dark);

        assert_eq!(runtime.compositor().appearance(), Appearance::Dark);
        runtime.shutdown();
    }

    #[test]
    fn test_applied_hook_runs() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_wallpaper(dir.path(), "a.png");
        let applied = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&applied);

        let mut runtime = runtime(leaked_bus(), false);
        runtime.set_on_applied(Box::new(move |r| sink.lock().push(r.image_url.clone())));
        runtime.start(display(), Appearance::Light, Some(reference.clone()));

        assert_eq!(*applied.lock(), vec![reference.image_url]);
    }

    #[test]
    fn test_wallpaper_before_start_is_shown_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_wallpaper(dir.path(), "a.png");
        let applied = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&applied);

        let mut runtime = runtime(leaked_bus(), false);
        runtime.set_on_applied(Box::new(move |r| sink.lock().push(r.image_url.clone())));
        runtime.handle_event(BusEvent::DisplayChanged(display()));
        runtime.handle_event(BusEvent::WallpaperChanged(reference.clone()));

        assert!(runtime.compositor().applied_wallpaper().is_none());
        assert!(applied.lock().is_empty());

        runtime.start(display(), Appearance::Light, Some(reference.clone()));

        assert_eq!(runtime.compositor().applied_wallpaper(), Some(&reference));
        assert_eq!(
            runtime.compositor().host().current_wallpaper(),
            Some(reference.image_url.as_str())
        );
        assert_eq!(*applied.lock(), vec![reference.image_url]);
    }

    #[test]
    fn test_shutdown_unsubscribes_and_is_idempotent() {
        let bus = leaked_bus();
        let mut runtime = runtime(bus, false);
        runtime.connect_bus();
        assert_eq!(bus.subscriber_count(), 1);

        runtime.shutdown();
        runtime.shutdown();

        assert!(runtime.is_stopped());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_request_shutdown_stops_blocking_loop() {
        let mut runtime = runtime(leaked_bus(), false);
        let handle = runtime.handle();

        let poster = std::thread::spawn(move || {
            handle.post_effect(Effect::clear());
            handle.request_shutdown();
        });
        runtime.run_until_shutdown();
        poster.join().unwrap();

        assert!(runtime.is_stopped());
    }

    #[test]
    fn test_display_event_updates_scale() {
        let mut runtime = runtime(leaked_bus(), false);
        runtime.start(display(), Appearance::Light, None);
        runtime.compositor_mut().host_mut().take_commands();

        runtime.handle_event(BusEvent::DisplayChanged(Display { backing_scale: 2.0, ..display() }));

        match runtime.compositor().host().commands() {
            [HostCommand::ContentsScale { layers, scale }] => {
                assert!(layers.contains(&Layer::Backdrop));
                assert!((scale - 2.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }
}
