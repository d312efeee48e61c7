//! The seam between the compositor and whatever renders the layers.

use std::time::Duration;

use super::layers::{BackdropFilter, CompositingFilter, Layer, LayerStack, SCALED_LAYERS, WallpaperFilter};
use crate::config::color::Rgba;
use crate::wallpaper::CroppedStrip;

/// Renders the layer stack. All calls happen on the main scheduling context.
pub trait LayerHost {
    /// Creates the backdrop, tint and wallpaper layers.
    fn build(&mut self, stack: &LayerStack);

    /// Replaces the backdrop filter values, keeping their order.
    fn set_backdrop_filters(&mut self, filters: &[BackdropFilter]);

    /// Replaces the wallpaper filters and reasserts its compositing filter.
    fn set_wallpaper_filters(&mut self, filters: &[WallpaperFilter], blend: CompositingFilter);

    /// Applies the effect colors and the tint compositing filter.
    fn set_colors(&mut self, backdrop: Rgba, tint: Rgba, tint_filter: Option<CompositingFilter>);

    fn set_group_name(&mut self, name: &str);

    /// Sets the contents scale on every layer in [`SCALED_LAYERS`].
    fn set_contents_scale(&mut self, scale: f64);

    /// Swaps in a new wallpaper strip inside a timed cross-fade.
    fn set_wallpaper_contents(&mut self, strip: &CroppedStrip, transition: Duration);
}

/// One call received by a [`HeadlessHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Build(LayerStack),
    BackdropFilters(Vec<BackdropFilter>),
    WallpaperFilters {
        filters: Vec<WallpaperFilter>,
        blend: CompositingFilter,
    },
    Colors {
        backdrop: Rgba,
        tint: Rgba,
        tint_filter: Option<CompositingFilter>,
    },
    GroupName(String),
    ContentsScale {
        layers: Vec<Layer>,
        scale: f64,
    },
    WallpaperContents {
        url: String,
        width: u32,
        height: u32,
        transition: Duration,
    },
}

/// A host without a window server. Commits are logged and kept in order.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    commands: Vec<HostCommand>,
}

impl HeadlessHost {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn commands(&self) -> &[HostCommand] { &self.commands }

    /// Removes and returns everything recorded so far.
    pub fn take_commands(&mut self) -> Vec<HostCommand> { std::mem::take(&mut self.commands) }

    /// URL of the last wallpaper strip committed.
    #[must_use]
    pub fn current_wallpaper(&self) -> Option<&str> {
        self.commands.iter().rev().find_map(|command| match command {
            HostCommand::WallpaperContents { url, .. } => Some(url.as_str()),
            _ => None,
        })
    }

    fn record(&mut self, command: HostCommand) {
        tracing::debug!(?command, "compositor: headless commit");
        self.commands.push(command);
    }
}

impl LayerHost for HeadlessHost {
    fn build(&mut self, stack: &LayerStack) { self.record(HostCommand::Build(stack.clone())); }

    fn set_backdrop_filters(&mut self, filters: &[BackdropFilter]) {
        self.record(HostCommand::BackdropFilters(filters.to_vec()));
    }

    fn set_wallpaper_filters(&mut self, filters: &[WallpaperFilter], blend: CompositingFilter) {
        self.record(HostCommand::WallpaperFilters { filters: filters.to_vec(), blend });
    }

    fn set_colors(&mut self, backdrop: Rgba, tint: Rgba, tint_filter: Option<CompositingFilter>) {
        self.record(HostCommand::Colors { backdrop, tint, tint_filter });
    }

    fn set_group_name(&mut self, name: &str) { self.record(HostCommand::GroupName(name.to_string())); }

    fn set_contents_scale(&mut self, scale: f64) {
        self.record(HostCommand::ContentsScale { layers: SCALED_LAYERS.to_vec(), scale });
    }

    fn set_wallpaper_contents(&mut self, strip: &CroppedStrip, transition: Duration) {
        let (width, height) = strip.dimensions();
        tracing::info!(
            file = %strip.source.file_name(),
            width,
            height,
            "compositor: wallpaper strip applied"
        );
        self.record(HostCommand::WallpaperContents {
            url: strip.source.image_url.clone(),
            width,
            height,
            transition,
        });
    }
}
