//! The wallpaper-aware backdrop compositor.
//!
//! A [`Compositor`] owns the effect state and drives a [`LayerHost`]. It is
//! `Uninitialized` until [`Compositor::attach`] builds the layer stack, and
//! `Active` from then on.
//!
//! Wallpaper changes go through tickets: [`Compositor::request_wallpaper`]
//! hands out a [`CropTicket`] for the crop work, and
//! [`Compositor::complete_crop`] applies the result only if no newer ticket has
//! been issued since.

pub mod blend_group;
pub mod effect;
pub mod host;
pub mod layers;

use std::sync::{Arc, Weak};
use std::time::Duration;

use uuid::Uuid;

pub use blend_group::BlendGroup;
pub use effect::{Appearance, AppearanceTable, BackdropTuning, ColorProvider, Effect, EffectParameters};
pub use host::{HeadlessHost, HostCommand, LayerHost};
pub use layers::{BackdropFilter, CompositingFilter, Layer, LayerStack, SCALED_LAYERS, WallpaperFilter};

use crate::constants::effect::{EXPOSURE_BASELINE_EV, TRANSITION_DURATION_SECS};
use crate::display::Display;
use crate::wallpaper::{CroppedStrip, ProcessingError, StripGeometry, WallpaperReference};

/// Tunables that do not change while running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorSettings {
    pub appearance_table: AppearanceTable,
    /// Exposure (EV) reasserted on the wallpaper layer.
    pub exposure: f64,
    /// Cross-fade used when swapping strips.
    pub transition: Duration,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            appearance_table: AppearanceTable::default(),
            exposure: EXPOSURE_BASELINE_EV,
            transition: Duration::from_secs_f64(TRANSITION_DURATION_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorState {
    Uninitialized,
    Active,
}

/// Authorization to crop `reference` for `display`.
#[derive(Debug, Clone, PartialEq)]
pub struct CropTicket {
    pub generation: u64,
    pub reference: WallpaperReference,
    pub display: Display,
}

/// What happened to a completed crop.
#[derive(Debug, Clone, PartialEq)]
pub enum CropOutcome {
    /// The strip is now displayed.
    Applied(WallpaperReference),
    /// The compositor is not attached yet; the strip is shown on attach.
    Staged(WallpaperReference),
    /// A newer request was issued; the result was dropped.
    Superseded,
    /// The crop failed; the previous strip is kept.
    Failed,
}

pub struct Compositor<H: LayerHost> {
    host: H,
    settings: CompositorSettings,
    state: CompositorState,
    appearance: Appearance,
    effect: Effect,
    display: Option<Display>,
    blend_group: Option<Weak<BlendGroup>>,
    group_name: String,
    generation: u64,
    pending: Option<CropTicket>,
    applied: Option<WallpaperReference>,
    staged: Option<CroppedStrip>,
}

impl<H: LayerHost> Compositor<H> {
    #[must_use]
    pub fn new(host: H, settings: CompositorSettings) -> Self {
        Self {
            host,
            settings,
            state: CompositorState::Uninitialized,
            appearance: Appearance::default(),
            effect: Effect::clear(),
            display: None,
            blend_group: None,
            group_name: blend_group::private_group_name(),
            generation: 0,
            pending: None,
            applied: None,
            staged: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CompositorState { self.state }

    #[must_use]
    pub const fn appearance(&self) -> Appearance { self.appearance }

    #[must_use]
    pub const fn effect(&self) -> &Effect { &self.effect }

    #[must_use]
    pub const fn display(&self) -> Option<&Display> { self.display.as_ref() }

    #[must_use]
    pub fn group_name(&self) -> &str { &self.group_name }

    /// The wallpaper currently displayed.
    #[must_use]
    pub const fn applied_wallpaper(&self) -> Option<&WallpaperReference> { self.applied.as_ref() }

    /// The crop in flight, if any.
    #[must_use]
    pub const fn pending_crop(&self) -> Option<&CropTicket> { self.pending.as_ref() }

    #[must_use]
    pub const fn host(&self) -> &H { &self.host }

    pub const fn host_mut(&mut self) -> &mut H { &mut self.host }

    /// Parameters for the current appearance and effect.
    #[must_use]
    pub const fn parameters(&self) -> EffectParameters {
        EffectParameters::resolve(
            &self.effect,
            self.appearance,
            &self.settings.appearance_table,
            self.settings.exposure,
        )
    }

    /// Builds the layer stack and enters `Active`. Later calls are ignored.
    ///
    /// A strip cropped before attaching is pushed to the host here. When it
    /// was cut for other geometry, a ticket to re-crop its wallpaper is returned.
    pub fn attach(&mut self, display: Display, appearance: Appearance) -> Option<CropTicket> {
        if self.state == CompositorState::Active {
            tracing::debug!("compositor: already active");
            return None;
        }

        self.display = Some(display);
        self.appearance = appearance;

        let stack = LayerStack::new(&self.parameters(), self.group_name.clone(), display.backing_scale);
        self.host.build(&stack);
        self.state = CompositorState::Active;

        let (display_id, width_px, menu_bar_height_px) = (display.id, display.width_px, display.menu_bar_height_px);
        tracing::info!(
            display = display_id,
            width = width_px,
            menu_bar_height = menu_bar_height_px,
            ?appearance,
            "compositor: active"
        );

        let strip = self.staged.take()?;
        if strip.geometry != StripGeometry::from(&display) {
            tracing::debug!(url = %strip.source.image_url, "compositor: staged strip does not fit, re-cropping");
            return Some(self.issue_ticket(strip.source, display));
        }

        self.host.set_wallpaper_contents(&strip, self.settings.transition);
        self.applied = Some(strip.source.clone());
        None
    }

    /// Switches the filter parameters to `appearance`, without animation.
    ///
    /// The wallpaper exposure and screen blend are reasserted every time.
    pub fn on_appearance_changed(&mut self, appearance: Appearance) {
        self.appearance = appearance;
        if self.state != CompositorState::Active {
            return;
        }

        let params = self.parameters();
        self.host.set_backdrop_filters(&layers::backdrop_chain(&params));
        self.host
            .set_wallpaper_filters(&layers::wallpaper_chain(params.exposure), CompositingFilter::Screen);
        self.host.set_colors(params.background_color, params.tint_color, params.tint_filter);

        tracing::debug!(?appearance, "compositor: appearance applied");
    }

    /// Propagates a new backing scale to the bitmap layers.
    pub fn on_backing_scale_changed(&mut self, scale: f64) {
        if let Some(display) = self.display.as_mut() {
            display.backing_scale = scale;
        }
        if self.state == CompositorState::Active {
            self.host.set_contents_scale(scale);
        }
    }

    /// Records a new display snapshot.
    ///
    /// Returns a ticket to re-crop the current wallpaper when the pixel geometry
    /// changed.
    pub fn on_display_changed(&mut self, display: Display) -> Option<CropTicket> {
        let previous = self.display.replace(display);

        if previous.is_none_or(|p| (p.backing_scale - display.backing_scale).abs() > f64::EPSILON) {
            self.on_backing_scale_changed(display.backing_scale);
        }

        if previous.is_some_and(|p| p.same_geometry(&display)) {
            return None;
        }

        let reference = self
            .pending
            .as_ref()
            .map(|ticket| ticket.reference.clone())
            .or_else(|| self.staged.as_ref().map(|strip| strip.source.clone()))
            .or_else(|| self.applied.clone())?;

        let display_id = display.id;
        tracing::debug!(display = display_id, "compositor: geometry changed, re-cropping");
        Some(self.issue_ticket(reference, display))
    }

    /// Asks for `reference` to be displayed.
    ///
    /// Returns `None` when it is already displayed or already being cropped, or
    /// when no display is known yet.
    pub fn request_wallpaper(&mut self, reference: WallpaperReference) -> Option<CropTicket> {
        let in_flight = self.pending.as_ref().map(|ticket| &ticket.reference);
        let staged = self.staged.as_ref().map(|strip| &strip.source);
        if in_flight.or(staged).or(self.applied.as_ref()) == Some(&reference) {
            tracing::debug!(url = %reference.image_url, "compositor: wallpaper unchanged");
            return None;
        }

        let Some(display) = self.display else {
            tracing::debug!(url = %reference.image_url, "compositor: no display yet");
            return None;
        };

        Some(self.issue_ticket(reference, display))
    }

    fn issue_ticket(&mut self, reference: WallpaperReference, display: Display) -> CropTicket {
        self.generation += 1;
        let ticket = CropTicket {
            generation: self.generation,
            reference,
            display,
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Applies a finished crop if `ticket` is still the latest request.
    pub fn complete_crop(
        &mut self,
        ticket: &CropTicket,
        result: Result<CroppedStrip, ProcessingError>,
    ) -> CropOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                url = %ticket.reference.image_url,
                generation = ticket.generation,
                latest = self.generation,
                "compositor: discarding superseded crop"
            );
            return CropOutcome::Superseded;
        }

        self.pending = None;

        match result {
            Ok(strip) if self.state == CompositorState::Active => {
                self.host.set_wallpaper_contents(&strip, self.settings.transition);
                self.applied = Some(strip.source.clone());
                CropOutcome::Applied(strip.source)
            }
            Ok(strip) => {
                tracing::debug!(url = %strip.source.image_url, "compositor: not active, staging strip");
                let source = strip.source.clone();
                self.staged = Some(strip);
                CropOutcome::Staged(source)
            }
            Err(err) => {
                tracing::warn!(
                    url = %ticket.reference.image_url,
                    error = %err,
                    "compositor: keeping previous strip"
                );
                CropOutcome::Failed
            }
        }
    }

    /// Replaces the effect. Only the backdrop color, tint color and tint filter change.
    pub fn set_effect(&mut self, effect: Effect) {
        self.effect = effect;
        if self.state == CompositorState::Active {
            let params = self.parameters();
            self.host.set_colors(params.background_color, params.tint_color, params.tint_filter);
        }
    }

    /// Joins `group`, or a private group when `None`.
    pub fn set_blend_group(&mut self, group: Option<&Arc<BlendGroup>>) {
        self.blend_group = group.map(Arc::downgrade);
        self.group_name = group.map_or_else(blend_group::private_group_name, |g| g.group_name());
        if self.state == CompositorState::Active {
            self.host.set_group_name(&self.group_name);
        }
    }

    /// Moves to a private group if the released group is the current one.
    pub fn on_blend_group_released(&mut self, token: Uuid) {
        if self.group_name != token.to_string() {
            return;
        }

        let still_alive = self.blend_group.as_ref().and_then(Weak::upgrade).is_some();
        if still_alive {
            return;
        }

        tracing::debug!(%token, "compositor: blend group gone, using a private group");
        self.set_blend_group(None);
    }
}
