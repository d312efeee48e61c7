//! Wallpaper CLI commands.
//!
//! `locate`, `crop` and `watch` expose the wallpaper pipeline stages one at a time.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::config::ClearbarConfig;
use crate::constants::wallpaper_log::LOG_BINARY;
use crate::display::Display;
use crate::error::ClearbarError;
use crate::events::{self, BusEvent};
use crate::wallpaper::processing::crop_wallpaper;
use crate::wallpaper::{WallpaperListener, WallpaperReference};

/// Arguments of `clearbar crop`.
#[derive(Args, Debug)]
pub struct CropArgs {
    /// The wallpaper image to crop.
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Display width in pixels.
    #[arg(long)]
    pub width: u32,

    /// Display height in pixels.
    #[arg(long)]
    pub height: u32,

    /// Menu bar height in pixels.
    #[arg(long)]
    pub menu_bar_height: u32,

    /// Where to write the strip (PNG).
    #[arg(long, short, value_name = "PNG")]
    pub output: PathBuf,
}

/// Resolves and prints the wallpaper shown on the main display.
///
/// # Errors
///
/// Returns an error if no wallpaper can be resolved.
#[cfg(target_os = "macos")]
pub fn execute_locate(current: bool, config: &ClearbarConfig) -> Result<(), ClearbarError> {
    use crate::platform::macos::screen::main_display;
    use crate::wallpaper::macos::WorkspaceDesktopSource;
    use crate::wallpaper::{Locate, LogShow, Recency, WallpaperLocator};

    let display = main_display(&config.menu_bar_height)
        .ok_or_else(|| ClearbarError::WallpaperError("no display attached".to_string()))?;
    let locator =
        WallpaperLocator::new(WorkspaceDesktopSource::new(), LogShow::default(), config.recency);
    let recency = if current { Recency::Current } else { Recency::LastKnown };

    let reference = locator.locate(&display, recency)?;
    println!("{}", reference.image_url);
    Ok(())
}

/// Resolves and prints the wallpaper shown on the main display.
///
/// # Errors
///
/// Always fails: the desktop image query needs macOS.
#[cfg(not(target_os = "macos"))]
pub fn execute_locate(_current: bool, _config: &ClearbarConfig) -> Result<(), ClearbarError> {
    Err(ClearbarError::Unsupported("locate needs the macOS desktop".to_string()))
}

/// Crops the menu bar strip out of a wallpaper and writes it as a PNG.
///
/// # Errors
///
/// Returns an error if the image cannot be read, cropped or written.
pub fn execute_crop(args: &CropArgs) -> Result<(), ClearbarError> {
    if args.width == 0 || args.height == 0 || args.menu_bar_height == 0 {
        return Err(ClearbarError::InvalidArguments(
            "--width, --height and --menu-bar-height must be positive".to_string(),
        ));
    }

    let reference = reference_for(&args.image)?;
    let display = Display {
        id: 0,
        width_px: args.width,
        height_px: args.height,
        menu_bar_height_px: args.menu_bar_height,
        backing_scale: 1.0,
    };

    let strip = crop_wallpaper(&reference, &display)?;
    strip.save_png(&args.output)?;

    let (width, height) = strip.dimensions();
    println!("{} ({width}x{height})", args.output.display());
    Ok(())
}

/// Builds a reference for a local image path.
pub(super) fn reference_for(image: &Path) -> Result<WallpaperReference, ClearbarError> {
    let absolute = std::fs::canonicalize(image).map_err(|err| {
        ClearbarError::InvalidArguments(format!("Cannot read {}: {err}", image.display()))
    })?;
    WallpaperReference::from_path(0, &absolute).ok_or_else(|| {
        ClearbarError::InvalidArguments(format!("Not a file path: {}", absolute.display()))
    })
}

/// Streams wallpaper change events as JSON lines until interrupted.
///
/// # Errors
///
/// Returns an error if the log stream cannot be started.
pub fn execute_watch() -> Result<(), ClearbarError> {
    let bus = events::bus();
    let mut subscription = bus.subscribe();

    let listener = WallpaperListener::new(bus, main_display_id());
    listener.start_stream(Path::new(LOG_BINARY))?;
    tracing::info!("watch: waiting for wallpaper changes");

    let mut stdout = std::io::stdout().lock();
    while let Some(event) = subscription.receiver.blocking_recv() {
        if !matches!(event, BusEvent::WallpaperChanged(_)) {
            continue;
        }
        writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        stdout.flush()?;
    }

    listener.stop();
    Ok(())
}

#[cfg(target_os = "macos")]
fn main_display_id() -> u32 {
    core_graphics::display::CGDisplay::main().id
}

#[cfg(not(target_os = "macos"))]
const fn main_display_id() -> u32 { 0 }

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;

    fn write_image(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("wallpaper.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255])))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_crop_writes_strip() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path(), 400, 300);
        let output = dir.path().join("strip.png");

        execute_crop(&CropArgs {
            image,
            width: 200,
            height: 150,
            menu_bar_height: 12,
            output: output.clone(),
        })
        .unwrap();

        let strip = image::open(&output).unwrap();
        assert_eq!((strip.width(), strip.height()), (200, 12));
    }

    #[test]
    fn test_crop_rejects_zero_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path(), 40, 30);
        let result = execute_crop(&CropArgs {
            image,
            width: 0,
            height: 150,
            menu_bar_height: 12,
            output: dir.path().join("strip.png"),
        });
        assert!(matches!(result, Err(ClearbarError::InvalidArguments(_))));
    }

    #[test]
    fn test_reference_for_missing_file() {
        let result = reference_for(Path::new("/nonexistent/clearbar/wallpaper.png"));
        assert!(matches!(result, Err(ClearbarError::InvalidArguments(_))));
    }

    #[test]
    fn test_reference_for_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path(), 4, 4);
        let reference = reference_for(&image).unwrap();
        assert!(reference.image_url.starts_with("file://"));
        assert_eq!(reference.file_name(), "wallpaper.png");
    }
}
