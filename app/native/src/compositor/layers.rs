//! Typed description of the layer stack and its filter chains.
//!
//! The stack is, bottom to top: the backdrop (blur) layer, the tint layer and
//! the wallpaper strip layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use super::effect::EffectParameters;
use crate::config::color::Rgba;

/// A layer owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The view's own layer, parent of the stack.
    Root,
    Backdrop,
    Tint,
    Wallpaper,
}

/// Layers that render bitmap content and follow the backing scale.
pub const SCALED_LAYERS: [Layer; 4] = [Layer::Root, Layer::Backdrop, Layer::Tint, Layer::Wallpaper];

/// Sampling scale of the backdrop layer.
pub const BACKDROP_SCALE: f64 = 1.0;

/// Bleed of the backdrop blur past the layer bounds.
pub const BACKDROP_BLEED_AMOUNT: f64 = 0.1;

/// Compositing (blend) filters accepted for the tint and wallpaper layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum CompositingFilter {
    Screen,
    Multiply,
    Overlay,
    SoftLight,
    PlusLighter,
    PlusDarker,
    ColorDodge,
    ColorBurn,
}

impl CompositingFilter {
    /// Core Animation filter type name.
    #[must_use]
    pub const fn ca_name(self) -> &'static str {
        match self {
            Self::Screen => "screenBlendMode",
            Self::Multiply => "multiplyBlendMode",
            Self::Overlay => "overlayBlendMode",
            Self::SoftLight => "softLightBlendMode",
            Self::PlusLighter => "plusL",
            Self::PlusDarker => "plusD",
            Self::ColorDodge => "colorDodgeBlendMode",
            Self::ColorBurn => "colorBurnBlendMode",
        }
    }
}

/// A filter on the backdrop layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackdropFilter {
    Brightness { amount: f64 },
    Contrast { amount: f64 },
    Invert { enabled: bool },
    HueRotate { enabled: bool, angle: f64 },
}

impl BackdropFilter {
    /// Name of the filter within the layer's filter list.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Brightness { .. } => "brightness",
            Self::Contrast { .. } => "contrast",
            Self::Invert { .. } => "invert",
            Self::HueRotate { .. } => "hueRotate",
        }
    }

    /// Core Animation filter type.
    #[must_use]
    pub const fn ca_type(&self) -> &'static str {
        match self {
            Self::Brightness { .. } => "colorBrightness",
            Self::Contrast { .. } => "colorContrast",
            Self::Invert { .. } => "colorInvert",
            Self::HueRotate { .. } => "colorHueRotate",
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        match self {
            Self::Brightness { .. } | Self::Contrast { .. } => true,
            Self::Invert { enabled } | Self::HueRotate { enabled, .. } => *enabled,
        }
    }
}

pub type BackdropFilterChain = SmallVec<[BackdropFilter; 4]>;

/// Builds the backdrop chain. The order is always brightness, contrast, invert, hue rotate.
#[must_use]
pub fn backdrop_chain(params: &EffectParameters) -> BackdropFilterChain {
    smallvec![
        BackdropFilter::Brightness { amount: params.brightness },
        BackdropFilter::Contrast { amount: params.contrast },
        BackdropFilter::Invert { enabled: params.invert_enabled },
        BackdropFilter::HueRotate {
            enabled: params.hue_rotate_enabled,
            angle: params.hue_angle,
        },
    ]
}

/// A Core Image filter on the wallpaper layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WallpaperFilter {
    Vibrance { amount: f64 },
    ColorControls { saturation: f64, brightness: f64, contrast: f64 },
    ExposureAdjust { ev: f64 },
}

impl WallpaperFilter {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Vibrance { .. } => "vibrance",
            Self::ColorControls { .. } => "colorControls",
            Self::ExposureAdjust { .. } => "exposureAdjust",
        }
    }

    /// Core Image filter class name.
    #[must_use]
    pub const fn ci_name(&self) -> &'static str {
        match self {
            Self::Vibrance { .. } => "CIVibrance",
            Self::ColorControls { .. } => "CIColorControls",
            Self::ExposureAdjust { .. } => "CIExposureAdjust",
        }
    }
}

pub type WallpaperFilterChain = SmallVec<[WallpaperFilter; 3]>;

/// Vibrance and color controls at their neutral values, then exposure.
#[must_use]
pub fn wallpaper_chain(exposure: f64) -> WallpaperFilterChain {
    smallvec![
        WallpaperFilter::Vibrance { amount: 0.0 },
        WallpaperFilter::ColorControls { saturation: 1.0, brightness: 0.0, contrast: 1.0 },
        WallpaperFilter::ExposureAdjust { ev: exposure },
    ]
}

/// Full description of the stack, used to build it once.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    pub group_name: String,
    pub contents_scale: f64,
    pub backdrop_color: Rgba,
    pub backdrop_filters: BackdropFilterChain,
    pub tint_color: Rgba,
    pub tint_filter: Option<CompositingFilter>,
    pub wallpaper_filters: WallpaperFilterChain,
    pub wallpaper_blend: CompositingFilter,
}

impl LayerStack {
    #[must_use]
    pub fn new(params: &EffectParameters, group_name: String, contents_scale: f64) -> Self {
        Self {
            group_name,
            contents_scale,
            backdrop_color: params.background_color,
            backdrop_filters: backdrop_chain(params),
            tint_color: params.tint_color,
            tint_filter: params.tint_filter,
            wallpaper_filters: wallpaper_chain(params.exposure),
            wallpaper_blend: CompositingFilter::Screen,
        }
    }
}
