//! Fit-and-crop of wallpaper images to the menu bar band.
//!
//! The wallpaper renderer scales the image uniformly so that it covers the
//! screen and centers the overflowing axis. The strip shown behind the menu bar
//! is the top `menu_bar_height_px` rows of that screen-sized window.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, RgbaImage};
use thiserror::Error;

use super::WallpaperReference;
use crate::display::Display;
use crate::utils::command::resolve_binary;

/// Errors that can occur while producing a strip.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The source image could not be read or decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    /// The computed crop has a non-positive or out-of-range dimension.
    #[error("invalid strip geometry: {0}")]
    Geometry(String),
    /// The wallpaper reference is not a local file URL.
    #[error("not a local file URL: {0}")]
    InvalidUrl(String),
    /// The strip could not be written.
    #[error("failed to encode strip: {0}")]
    Encode(String),
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Target geometry of a strip, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripGeometry {
    pub screen_width: u32,
    pub screen_height: u32,
    pub menu_bar_height: u32,
}

impl From<&Display> for StripGeometry {
    fn from(display: &Display) -> Self {
        Self {
            screen_width: display.width_px,
            screen_height: display.height_px,
            menu_bar_height: display.menu_bar_height_px,
        }
    }
}

/// Resize target and crop window for one image/display pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Computes the resize and crop for an image of `image_width` x `image_height`.
///
/// Aspect ratios are compared with exact integer arithmetic, so an image with the
/// same aspect as the screen is scaled to the screen size with zero offsets.
///
/// # Errors
///
/// Returns [`ProcessingError::Geometry`] when any dimension is zero, the menu bar
/// is taller than the screen, or the scaled image does not fit in `u32`.
pub fn plan_crop(
    image_width: u32,
    image_height: u32,
    geometry: StripGeometry,
) -> Result<CropPlan, ProcessingError> {
    let StripGeometry { screen_width, screen_height, menu_bar_height } = geometry;

    if image_width == 0 || image_height == 0 {
        return Err(ProcessingError::Geometry(format!(
            "image is {image_width}x{image_height}"
        )));
    }
    if screen_width == 0 || screen_height == 0 || menu_bar_height == 0 {
        return Err(ProcessingError::Geometry(format!(
            "strip is {screen_width}x{menu_bar_height} on a {screen_width}x{screen_height} screen"
        )));
    }
    if menu_bar_height > screen_height {
        return Err(ProcessingError::Geometry(format!(
            "menu bar ({menu_bar_height}px) is taller than the screen ({screen_height}px)"
        )));
    }

    let (iw, ih) = (u64::from(image_width), u64::from(image_height));
    let (sw, sh) = (u64::from(screen_width), u64::from(screen_height));

    let to_u32 = |value: u64| {
        u32::try_from(value)
            .map_err(|_| ProcessingError::Geometry(format!("scaled dimension {value} overflows")))
    };

    // imageAspect >= screenAspect  <=>  iw * sh >= sw * ih
    if iw * sh >= sw * ih {
        let scaled_width = to_u32(sh * iw / ih)?;
        Ok(CropPlan {
            scaled_width,
            scaled_height: screen_height,
            x: (scaled_width - screen_width) / 2,
            y: 0,
            width: screen_width,
            height: menu_bar_height,
        })
    } else {
        let scaled_height = to_u32(sw * ih / iw)?;
        Ok(CropPlan {
            scaled_width: screen_width,
            scaled_height,
            x: 0,
            y: (scaled_height - screen_height) / 2,
            width: screen_width,
            height: menu_bar_height,
        })
    }
}

/// Scales `image` to cover the screen and crops the menu bar band.
///
/// # Errors
///
/// Returns [`ProcessingError::Geometry`] when the plan is invalid.
pub fn fit_and_crop(image: &DynamicImage, geometry: StripGeometry) -> Result<RgbaImage, ProcessingError> {
    let (image_width, image_height) = image.dimensions();
    let plan = plan_crop(image_width, image_height, geometry)?;

    let resized = image.resize_exact(plan.scaled_width, plan.scaled_height, FilterType::CatmullRom);

    Ok(resized.crop_imm(plan.x, plan.y, plan.width, plan.height).to_rgba8())
}

/// A wallpaper strip ready to be shown behind the menu bar.
#[derive(Debug, Clone)]
pub struct CroppedStrip {
    pub source: WallpaperReference,
    pub geometry: StripGeometry,
    pub image: RgbaImage,
}

impl CroppedStrip {
    /// Pixel dimensions of the strip.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) { self.image.dimensions() }

    /// Writes the strip as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_png(&self, path: &Path) -> Result<(), ProcessingError> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|err| ProcessingError::Encode(err.to_string()))
    }
}

/// Decodes the wallpaper and produces its strip for `display`.
///
/// # Errors
///
/// Returns an error when the reference is not a file URL, the image cannot be
/// decoded, or the geometry is invalid.
pub fn crop_wallpaper(
    reference: &WallpaperReference,
    display: &Display,
) -> Result<CroppedStrip, ProcessingError> {
    let path = reference
        .to_path()
        .ok_or_else(|| ProcessingError::InvalidUrl(reference.image_url.clone()))?;

    let image = load_image(&path)?;
    let geometry = StripGeometry::from(display);
    let strip = fit_and_crop(&image, geometry)?;

    tracing::debug!(
        file = %reference.file_name(),
        width = strip.width(),
        height = strip.height(),
        "wallpaper: strip cropped"
    );

    Ok(CroppedStrip { source: reference.clone(), geometry, image: strip })
}

/// Decodes an image from disk.
///
/// Formats the `image` crate cannot read (HEIC wallpapers) are converted to PNG
/// with `sips` when it is available.
///
/// # Errors
///
/// Returns [`ProcessingError::Decode`] if neither path succeeds.
pub fn load_image(path: &Path) -> Result<DynamicImage, ProcessingError> {
    match decode_with_image_crate(path) {
        Ok(image) => Ok(image),
        Err(reason) => match convert_with_sips(path) {
            Some(image) => Ok(image),
            None => Err(ProcessingError::Decode { path: path.display().to_string(), reason }),
        },
    }
}

fn decode_with_image_crate(path: &Path) -> Result<DynamicImage, String> {
    ImageReader::open(path)
        .map_err(|err| err.to_string())?
        .with_guessed_format()
        .map_err(|err| err.to_string())?
        .decode()
        .map_err(|err| err.to_string())
}

fn convert_with_sips(path: &Path) -> Option<DynamicImage> {
    let sips: PathBuf = resolve_binary("sips").ok()?;
    let output = tempfile::Builder::new().prefix("clearbar-").suffix(".png").tempfile().ok()?;

    let status = Command::new(sips)
        .args(["-s", "format", "png"])
        .arg(path)
        .arg("--out")
        .arg(output.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => {}
        Ok(status) => {
            tracing::warn!(path = %path.display(), %status, "wallpaper: sips conversion failed");
            return None;
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "wallpaper: failed to run sips");
            return None;
        }
    }

    tracing::debug!(path = %path.display(), "wallpaper: decoded via sips");
    decode_with_image_crate(output.path()).ok()
}
