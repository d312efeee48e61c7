//! The `run` command.
//!
//! Starts the effect over the menu bar, or, with `--headless`, drives the same
//! runtime against a recording host so the pipeline can be exercised without a
//! window server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;

use super::types::DisplaySpec;
use super::wallpaper::reference_for;
use crate::compositor::{Appearance, Compositor, HeadlessHost};
use crate::config::{self, ClearbarConfig};
use crate::constants::wallpaper_log::LOG_BINARY;
use crate::display::Display;
use crate::error::ClearbarError;
use crate::events;
use crate::runtime::{Runtime, RuntimeOptions};
use crate::wallpaper::WallpaperListener;

/// Arguments of `clearbar run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Record compositor commits instead of drawing over the menu bar.
    #[arg(long)]
    pub headless: bool,

    /// Wallpaper to show at startup (headless only).
    #[arg(long, value_name = "IMAGE", requires = "headless")]
    pub image: Option<PathBuf>,

    /// Display geometry as WIDTHxHEIGHT[@SCALE] (headless only).
    #[arg(long, value_name = "SIZE", requires = "headless")]
    pub display: Option<DisplaySpec>,

    /// Menu bar height in points for --display. Defaults to the standard height.
    #[arg(long, value_name = "POINTS", requires = "display")]
    pub menu_bar_height: Option<u32>,

    /// Start in the dark appearance (headless only).
    #[arg(long, requires = "headless")]
    pub dark: bool,

    /// Apply the startup wallpaper, print it and exit (headless only).
    #[arg(long, requires = "headless")]
    pub once: bool,
}

/// Executes `clearbar run`.
///
/// # Errors
///
/// Returns an error if the effect cannot be started.
pub fn execute(args: &RunArgs, config: &'static ClearbarConfig) -> Result<(), ClearbarError> {
    if args.headless {
        run_headless(args, config)
    } else {
        run_overlay(config)
    }
}

#[cfg(target_os = "macos")]
fn run_overlay(config: &'static ClearbarConfig) -> Result<(), ClearbarError> {
    crate::platform::macos::run(config)
}

#[cfg(not(target_os = "macos"))]
fn run_overlay(_config: &'static ClearbarConfig) -> Result<(), ClearbarError> {
    Err(ClearbarError::Unsupported("the menu bar overlay needs macOS; use --headless".to_string()))
}

fn headless_display(args: &RunArgs, config: &ClearbarConfig) -> Result<Display, ClearbarError> {
    match args.display {
        Some(spec) => {
            let points = args.menu_bar_height.unwrap_or(config.menu_bar_height.standard);
            Ok(spec.to_display(points))
        }
        None => host_display(config),
    }
}

#[cfg(target_os = "macos")]
fn host_display(config: &ClearbarConfig) -> Result<Display, ClearbarError> {
    crate::platform::macos::screen::main_display(&config.menu_bar_height)
        .ok_or_else(|| ClearbarError::InvalidArguments("no display attached; pass --display".to_string()))
}

#[cfg(not(target_os = "macos"))]
fn host_display(_config: &ClearbarConfig) -> Result<Display, ClearbarError> {
    Err(ClearbarError::InvalidArguments("--display is required off macOS".to_string()))
}

fn run_headless(args: &RunArgs, config: &ClearbarConfig) -> Result<(), ClearbarError> {
    let display = headless_display(args, config)?;
    let initial = args.image.as_deref().map(reference_for).transpose()?;
    let appearance = if args.dark { Appearance::Dark } else { Appearance::Light };

    let options = RuntimeOptions {
        off_main_thread_crop: config.off_main_thread_crop && !args.once,
    };
    let compositor = Compositor::new(HeadlessHost::new(), config.compositor_settings());
    let mut runtime = Runtime::new(compositor, events::bus(), options, None);

    if args.once {
        let had_initial = initial.is_some();
        runtime.start(display, appearance, initial);
        let applied = runtime.compositor().applied_wallpaper().cloned();
        runtime.shutdown();

        return match applied {
            Some(reference) => {
                println!("{}", reference.image_url);
                Ok(())
            }
            None if had_initial => Err(ClearbarError::ImageError("wallpaper could not be applied".to_string())),
            None => Ok(()),
        };
    }

    // Without an explicit image the wallpaper follows the system log.
    let listener = initial.is_none().then(|| Arc::new(WallpaperListener::new(events::bus(), display.id)));
    if let Some(listener) = &listener {
        if let Err(err) = listener.start_stream(Path::new(LOG_BINARY)) {
            tracing::warn!(error = %err, "run: wallpaper log stream unavailable");
        }
        attach_locator(&mut runtime, Arc::clone(listener), config);
    }

    if let Some(path) = config::get_config_path() {
        let handle = runtime.handle();
        config::watch_config_file(path, move |updated| {
            handle.post_effect(updated.effect());
        });
    }

    runtime.connect_bus();
    runtime.start(display, appearance, initial);
    let display_id = display.id;
    tracing::info!(display = display_id, "run: headless runtime started");
    runtime.run_until_shutdown();
    Ok(())
}

/// Lets the runtime re-check the wallpaper after unlocks.
#[cfg(target_os = "macos")]
fn attach_locator(runtime: &mut Runtime<HeadlessHost>, listener: Arc<WallpaperListener>, config: &ClearbarConfig) {
    use crate::wallpaper::macos::WorkspaceDesktopSource;
    use crate::wallpaper::{LogShow, WallpaperLocator};

    let locator = WallpaperLocator::new(WorkspaceDesktopSource::new(), LogShow::default(), config.recency);
    runtime.set_wallpaper_sources(listener, Arc::new(locator));
}

/// There is no desktop image source to re-check off macOS.
#[cfg(not(target_os = "macos"))]
fn attach_locator(
    _runtime: &mut Runtime<HeadlessHost>,
    _listener: Arc<WallpaperListener>,
    _config: &ClearbarConfig,
) {
}
