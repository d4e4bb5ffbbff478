//! Render pipeline: geometry, then color adjustment.
//!
//! Each stage takes its input by value (or borrows the immutable source) and
//! returns a new buffer, so no surface is ever shared between stages:
//!
//! ```text
//! SourceImage ──apply_geometry──▶ RgbaImage ──apply_color_adjust──▶ RenderedBitmap
//! ```
//!
//! Geometry follows the drawing-surface model: translate to the center of the
//! output surface, rotate clockwise, mirror, then draw the source scaled to
//! exactly fill the surface. Pixels the rotated source does not cover stay
//! transparent.

use super::backend::{BackendError, Dimensions, RenderedBitmap, SourceImage};
use super::calculations::dimensions_in_range;
use super::params::{ColorAdjust, Geometry, ResizeSettings};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use tracing::debug;

/// Render `source` at `settings.width × settings.height` with all transforms
/// and filters applied.
pub fn render(
    source: &SourceImage,
    settings: &ResizeSettings,
) -> Result<RenderedBitmap, BackendError> {
    let target = Dimensions {
        width: settings.width,
        height: settings.height,
    };
    if !dimensions_in_range(target.width, target.height) {
        return Err(BackendError::InvalidDimensions {
            width: target.width,
            height: target.height,
        });
    }

    debug!(
        source = source.name(),
        from = %source.dimensions(),
        to = %target,
        rotation = settings.geometry.rotation,
        "rendering"
    );
    let placed = apply_geometry(source.pixels(), target, &settings.geometry);
    let adjusted = apply_color_adjust(placed, &settings.adjust);
    Ok(RenderedBitmap::new(adjusted))
}

/// Scale `source` to fill `target`, then rotate and mirror around the center.
pub fn apply_geometry(source: &RgbaImage, target: Dimensions, geometry: &Geometry) -> RgbaImage {
    let scaled = if source.dimensions() == (target.width, target.height) {
        source.clone()
    } else {
        imageops::resize(source, target.width, target.height, FilterType::Lanczos3)
    };

    if geometry.is_identity() {
        return scaled;
    }

    let (w, h) = (target.width as f64, target.height as f64);
    // Right angles sample nearest with exact trig: float residue would shift
    // samples that land on a pixel edge.
    let right_angle = geometry.rotation % 90.0 == 0.0;
    let (sin, cos) = if right_angle {
        quarter_turn_sin_cos(geometry.rotation)
    } else {
        geometry.radians().sin_cos()
    };
    let flip_x = if geometry.flip_horizontal { -1.0 } else { 1.0 };
    let flip_y = if geometry.flip_vertical { -1.0 } else { 1.0 };

    RgbaImage::from_fn(target.width, target.height, |x, y| {
        // Output pixel center, relative to the surface center.
        let dx = x as f64 + 0.5 - w / 2.0;
        let dy = y as f64 + 0.5 - h / 2.0;
        // Inverse rotation, then inverse mirror (a mirror is its own inverse).
        let rx = dx * cos + dy * sin;
        let ry = -dx * sin + dy * cos;
        let u = rx * flip_x + w / 2.0;
        let v = ry * flip_y + h / 2.0;

        if right_angle {
            sample_nearest(&scaled, u, v)
        } else {
            sample_bilinear(&scaled, u - 0.5, v - 0.5)
        }
    })
}

/// Exact `(sin, cos)` for a multiple of 90 degrees.
fn quarter_turn_sin_cos(degrees: f64) -> (f64, f64) {
    match (degrees / 90.0).round().rem_euclid(4.0) as u8 {
        0 => (0.0, 1.0),
        1 => (1.0, 0.0),
        2 => (0.0, -1.0),
        _ => (-1.0, 0.0),
    }
}

fn pixel_or_transparent(image: &RgbaImage, x: i64, y: i64) -> Rgba<u8> {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        Rgba([0, 0, 0, 0])
    } else {
        *image.get_pixel(x as u32, y as u32)
    }
}

fn sample_nearest(image: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    pixel_or_transparent(image, u.floor() as i64, v.floor() as i64)
}

fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let corners = [
        (pixel_or_transparent(image, x0, y0), (1.0 - fx) * (1.0 - fy)),
        (pixel_or_transparent(image, x0 + 1, y0), fx * (1.0 - fy)),
        (pixel_or_transparent(image, x0, y0 + 1), (1.0 - fx) * fy),
        (pixel_or_transparent(image, x0 + 1, y0 + 1), fx * fy),
    ];

    let mut out = [0.0f64; 4];
    for (pixel, weight) in corners {
        for (acc, channel) in out.iter_mut().zip(pixel.0) {
            *acc += channel as f64 * weight;
        }
    }
    Rgba(out.map(|c| c.round().clamp(0.0, 255.0) as u8))
}

/// Apply brightness, contrast and saturation to every pixel, in that order.
///
/// All three stages always run; each is a no-op at its neutral value. Alpha
/// is left untouched.
pub fn apply_color_adjust(mut pixels: RgbaImage, adjust: &ColorAdjust) -> RgbaImage {
    let raw: &mut [u8] = &mut pixels;
    raw.par_chunks_mut(4).for_each(|px| {
        let [r, g, b] = adjust_rgb([px[0], px[1], px[2]], adjust);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    });
    pixels
}

/// Adjust one RGB triple. Intermediate values stay fractional (clamped per
/// stage) and are rounded once at the end.
pub fn adjust_rgb(rgb: [u8; 3], adjust: &ColorAdjust) -> [u8; 3] {
    let mut c = rgb.map(f64::from);

    let offset = adjust.brightness as f64 * 2.55;
    for channel in &mut c {
        *channel = (*channel + offset).clamp(0.0, 255.0);
    }

    let contrast = (adjust.contrast as f64 + 100.0) / 100.0;
    for channel in &mut c {
        *channel = ((*channel - 128.0) * contrast + 128.0).clamp(0.0, 255.0);
    }

    let gray = 0.299 * c[0] + 0.587 * c[1] + 0.114 * c[2];
    let saturation = (adjust.saturation as f64 + 100.0) / 100.0;
    for channel in &mut c {
        *channel = (gray + (*channel - gray) * saturation).clamp(0.0, 255.0);
    }

    c.map(|channel| channel.round() as u8)
}
