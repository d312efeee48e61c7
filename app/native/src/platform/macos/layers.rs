//! Core Animation implementation of [`LayerHost`].
//!
//! The backdrop is a private `CABackdropLayer` that samples and blurs what the
//! window server draws below the window. The tint and wallpaper layers are
//! plain `CALayer`s stacked above it. Backdrop filters are `CAFilter`s, the
//! wallpaper filters are `CIFilter`s.

use std::ffi::c_void;
use std::time::Duration;

use core_foundation::base::TCFType;
use core_foundation::data::CFData;
use core_graphics::color::CGColor;
use objc::runtime::{Class, Object};
use objc::{class, msg_send, sel, sel_impl};

use super::objc::{Id, nsstring};
use crate::compositor::LayerHost;
use crate::compositor::layers::{
    BACKDROP_BLEED_AMOUNT, BACKDROP_SCALE, BackdropFilter, CompositingFilter, Layer, LayerStack,
    SCALED_LAYERS, WallpaperFilter,
};
use crate::config::color::Rgba;
use crate::wallpaper::CroppedStrip;

type CGImageRef = *mut c_void;
type CGColorSpaceRef = *mut c_void;
type CGDataProviderRef = *mut c_void;

const K_CG_IMAGE_ALPHA_LAST: u32 = 3;
const K_CG_RENDERING_INTENT_DEFAULT: u32 = 0;

/// `kCALayerWidthSizable | kCALayerHeightSizable`.
const AUTORESIZE_FILL: u32 = 2 | 16;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGColorSpaceCreateDeviceRGB() -> CGColorSpaceRef;
    fn CGColorSpaceRelease(space: CGColorSpaceRef);
    fn CGDataProviderCreateWithCFData(data: *const c_void) -> CGDataProviderRef;
    fn CGDataProviderRelease(provider: CGDataProviderRef);
    fn CGImageCreate(
        width: usize,
        height: usize,
        bits_per_component: usize,
        bits_per_pixel: usize,
        bytes_per_row: usize,
        space: CGColorSpaceRef,
        bitmap_info: u32,
        provider: CGDataProviderRef,
        decode: *const f64,
        should_interpolate: bool,
        intent: u32,
    ) -> CGImageRef;
    fn CGImageRelease(image: CGImageRef);
}

#[link(name = "QuartzCore", kind = "framework")]
unsafe extern "C" {}

#[link(name = "CoreImage", kind = "framework")]
unsafe extern "C" {}

// ============================================================================
// Object helpers
// ============================================================================

unsafe fn number(value: f64) -> Id { msg_send![class!(NSNumber), numberWithDouble: value] }

unsafe fn array(items: &[Id]) -> Id {
    let array: Id = msg_send![class!(NSMutableArray), array];
    for &item in items {
        if !item.is_null() {
            let _: () = msg_send![array, addObject: item];
        }
    }
    array
}

unsafe fn set_value(object: Id, key: &str, value: Id) {
    let _: () = msg_send![object, setValue: value forKey: nsstring(key)];
}

/// Creates a `CAFilter` of the given type. `CAFilter` is private; `None` if missing.
unsafe fn ca_filter(filter_type: &str) -> Option<Id> {
    let class = Class::get("CAFilter")?;
    let filter: Id = msg_send![class, filterWithType: nsstring(filter_type)];
    (!filter.is_null()).then_some(filter)
}

unsafe fn backdrop_filter(filter: &BackdropFilter) -> Option<Id> {
    let object = unsafe { ca_filter(filter.ca_type())? };
    unsafe {
        let _: () = msg_send![object, setName: nsstring(filter.name())];
        let _: () = msg_send![object, setEnabled: filter.is_enabled()];
        match *filter {
            BackdropFilter::Brightness { amount } | BackdropFilter::Contrast { amount } => {
                set_value(object, "inputAmount", number(amount));
            }
            BackdropFilter::HueRotate { angle, .. } => set_value(object, "inputAngle", number(angle)),
            BackdropFilter::Invert { .. } => {}
        }
    }
    Some(object)
}

unsafe fn wallpaper_filter(filter: &WallpaperFilter) -> Option<Id> {
    let object: Id = unsafe { msg_send![class!(CIFilter), filterWithName: nsstring(filter.ci_name())] };
    if object.is_null() {
        return None;
    }

    unsafe {
        let _: () = msg_send![object, setName: nsstring(filter.name())];
        match *filter {
            WallpaperFilter::Vibrance { amount } => set_value(object, "inputAmount", number(amount)),
            WallpaperFilter::ColorControls { saturation, brightness, contrast } => {
                set_value(object, "inputSaturation", number(saturation));
                set_value(object, "inputBrightness", number(brightness));
                set_value(object, "inputContrast", number(contrast));
            }
            WallpaperFilter::ExposureAdjust { ev } => set_value(object, "inputEV", number(ev)),
        }
    }
    Some(object)
}

unsafe fn compositing_filter(filter: Option<CompositingFilter>) -> Id {
    filter
        .and_then(|filter| unsafe { ca_filter(filter.ca_name()) })
        .unwrap_or(std::ptr::null_mut())
}

/// Creates a non-premultiplied RGBA `CGImage`. The caller releases it.
fn cg_image(strip: &CroppedStrip) -> Option<CGImageRef> {
    let (width, height) = strip.dimensions();
    let (width, height) = (width as usize, height as usize);
    let data = CFData::from_buffer(strip.image.as_raw());

    unsafe {
        let color_space = CGColorSpaceCreateDeviceRGB();
        if color_space.is_null() {
            return None;
        }

        let provider = CGDataProviderCreateWithCFData(data.as_concrete_TypeRef().cast());
        if provider.is_null() {
            CGColorSpaceRelease(color_space);
            return None;
        }

        let image = CGImageCreate(
            width,
            height,
            8,
            32,
            width * 4,
            color_space,
            K_CG_IMAGE_ALPHA_LAST,
            provider,
            std::ptr::null(),
            false,
            K_CG_RENDERING_INTENT_DEFAULT,
        );

        CGDataProviderRelease(provider);
        CGColorSpaceRelease(color_space);

        (!image.is_null()).then_some(image)
    }
}

fn cg_color(color: Rgba) -> CGColor { CGColor::rgb(color.r, color.g, color.b, color.a) }

// ============================================================================
// Transactions
// ============================================================================

/// Runs `body` inside a `CATransaction` with implicit animations disabled.
fn without_animation(body: impl FnOnce()) {
    unsafe {
        let _: () = msg_send![class!(CATransaction), begin];
        let _: () = msg_send![class!(CATransaction), setDisableActions: true];
    }
    body();
    unsafe {
        let _: () = msg_send![class!(CATransaction), commit];
    }
}

// ============================================================================
// Host
// ============================================================================

/// Layer host rendering into the layer-backed content view of the overlay window.
pub struct CaLayerHost {
    root: Id,
    backdrop: Id,
    tint: Id,
    wallpaper: Id,
}

impl CaLayerHost {
    /// Wraps the root layer of a layer-backed view.
    ///
    /// # Safety
    ///
    /// `root` must be a valid `CALayer` that outlives the host. All calls must
    /// happen on the main thread.
    #[must_use]
    pub unsafe fn new(root: Id) -> Self {
        Self {
            root,
            backdrop: std::ptr::null_mut(),
            tint: std::ptr::null_mut(),
            wallpaper: std::ptr::null_mut(),
        }
    }

    const fn is_built(&self) -> bool { !self.wallpaper.is_null() }

    const fn layer(&self, layer: Layer) -> Id {
        match layer {
            Layer::Root => self.root,
            Layer::Backdrop => self.backdrop,
            Layer::Tint => self.tint,
            Layer::Wallpaper => self.wallpaper,
        }
    }

    /// Creates a sublayer filling the root.
    unsafe fn add_sublayer(&self, class: &Class) -> Id {
        unsafe {
            let layer: Id = msg_send![class, layer];
            let bounds: super::objc::NSRect = msg_send![self.root, bounds];
            let _: () = msg_send![layer, setFrame: bounds];
            let _: () = msg_send![layer, setAutoresizingMask: AUTORESIZE_FILL];
            let _: () = msg_send![self.root, addSublayer: layer];
            let _: Id = msg_send![layer, retain];
            layer
        }
    }
}

impl LayerHost for CaLayerHost {
    fn build(&mut self, stack: &LayerStack) {
        if self.is_built() || self.root.is_null() {
            return;
        }

        let backdrop_class = Class::get("CABackdropLayer").unwrap_or_else(|| {
            tracing::warn!("compositor: CABackdropLayer unavailable, backdrop will not blur");
            class!(CALayer)
        });

        without_animation(|| unsafe {
            self.backdrop = self.add_sublayer(backdrop_class);
            let _: () = msg_send![self.backdrop, setValue: number(BACKDROP_SCALE) forKey: nsstring("scale")];
            let _: () = msg_send![
                self.backdrop,
                setValue: number(BACKDROP_BLEED_AMOUNT)
                forKey: nsstring("bleedAmount")
            ];
            let yes: Id = msg_send![class!(NSNumber), numberWithBool: true];
            set_value(self.backdrop, "windowServerAware", yes);
            let _: () = msg_send![self.backdrop, setAllowsGroupOpacity: true];

            self.tint = self.add_sublayer(class!(CALayer));
            self.wallpaper = self.add_sublayer(class!(CALayer));
            let _: () = msg_send![self.wallpaper, setContentsGravity: nsstring("resize")];
        });

        self.set_group_name(&stack.group_name);
        self.set_contents_scale(stack.contents_scale);
        self.set_backdrop_filters(&stack.backdrop_filters);
        self.set_wallpaper_filters(&stack.wallpaper_filters, stack.wallpaper_blend);
        self.set_colors(stack.backdrop_color, stack.tint_color, stack.tint_filter);

        tracing::debug!(group = %stack.group_name, "compositor: layers built");
    }

    fn set_backdrop_filters(&mut self, filters: &[BackdropFilter]) {
        if self.backdrop.is_null() {
            return;
        }

        without_animation(|| unsafe {
            let objects: Vec<Id> = filters.iter().filter_map(|f| backdrop_filter(f)).collect();
            let _: () = msg_send![self.backdrop, setFilters: array(&objects)];
        });
    }

    fn set_wallpaper_filters(&mut self, filters: &[WallpaperFilter], blend: CompositingFilter) {
        if self.wallpaper.is_null() {
            return;
        }

        without_animation(|| unsafe {
            let objects: Vec<Id> = filters.iter().filter_map(|f| wallpaper_filter(f)).collect();
            let _: () = msg_send![self.wallpaper, setFilters: array(&objects)];
            let _: () = msg_send![self.wallpaper, setCompositingFilter: compositing_filter(Some(blend))];
        });
    }

    fn set_colors(&mut self, backdrop: Rgba, tint: Rgba, tint_filter: Option<CompositingFilter>) {
        if self.tint.is_null() {
            return;
        }

        let (backdrop, tint) = (cg_color(backdrop), cg_color(tint));
        without_animation(|| unsafe {
            let _: () = msg_send![self.backdrop, setBackgroundColor: backdrop.as_concrete_TypeRef()];
            let _: () = msg_send![self.tint, setBackgroundColor: tint.as_concrete_TypeRef()];
            let _: () = msg_send![self.tint, setCompositingFilter: compositing_filter(tint_filter)];
        });
    }

    fn set_group_name(&mut self, name: &str) {
        if self.backdrop.is_null() {
            return;
        }
        unsafe {
            set_value(self.backdrop, "groupName", nsstring(name));
        }
    }

    fn set_contents_scale(&mut self, scale: f64) {
        without_animation(|| unsafe {
            for layer in SCALED_LAYERS.map(|layer| self.layer(layer)) {
                if !layer.is_null() {
                    let _: () = msg_send![layer, setContentsScale: scale];
                }
            }
        });
    }

    fn set_wallpaper_contents(&mut self, strip: &CroppedStrip, transition: Duration) {
        if self.wallpaper.is_null() {
            return;
        }

        let Some(image) = cg_image(strip) else {
            tracing::warn!(file = %strip.source.file_name(), "compositor: failed to create CGImage");
            return;
        };

        unsafe {
            let _: () = msg_send![class!(CATransaction), begin];
            let _: () = msg_send![class!(CATransaction), setAnimationDuration: transition.as_secs_f64()];

            let fade: Id = msg_send![class!(CATransition), animation];
            let _: () = msg_send![fade, setType: nsstring("fade")];
            let _: () = msg_send![fade, setDuration: transition.as_secs_f64()];
            let _: () = msg_send![self.wallpaper, addAnimation: fade forKey: nsstring("contents")];
            let _: () = msg_send![self.wallpaper, setContents: image.cast::<Object>()];

            let _: () = msg_send![class!(CATransaction), commit];
            CGImageRelease(image);
        }

        let (width, height) = strip.dimensions();
        tracing::info!(
            file = %strip.source.file_name(),
            width,
            height,
            "compositor: wallpaper strip applied"
        );
    }
}

impl Drop for CaLayerHost {
    fn drop(&mut self) {
        unsafe {
            for layer in [self.wallpaper, self.tint, self.backdrop] {
                if !layer.is_null() {
                    let _: () = msg_send![layer, removeFromSuperlayer];
                    let _: () = msg_send![layer, release];
                }
            }
        }
    }
}
