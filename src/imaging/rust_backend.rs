//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format detection | `image::guess_format` (magic bytes), MIME type as fallback |
//! | Decode (JPEG, PNG, GIF, BMP, TIFF, WebP) | `image::load_from_memory_with_format` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha dropped) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, quality ignored) |
//! | Encode → WebP | `webp::Encoder` (libwebp, lossy) |

use super::backend::{BackendError, ImageBackend, RenderedBitmap, SourceImage};
use super::params::{OutputFormat, Quality};
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, ImageFormat, RgbImage};
use tracing::debug;

/// MIME types accepted as "unknown, sniff the bytes".
const GENERIC_MIME_TYPES: &[&str] = &["", "application/octet-stream"];

/// Whether a declared MIME type may carry image data.
pub fn is_image_mime(mime_type: &str) -> bool {
    let lower = mime_type.to_ascii_lowercase();
    lower.starts_with("image/") || GENERIC_MIME_TYPES.contains(&lower.as_str())
}

/// MIME type guessed from a file name's extension.
///
/// Unknown extensions map to `application/octet-stream`, leaving the decision
/// to the magic-byte sniffing in [`RustBackend::decode`](ImageBackend::decode).
pub fn mime_from_file_name(file_name: &str) -> &'static str {
    ImageFormat::from_path(file_name)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Codec backend using the `image` crate ecosystem and libwebp.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_format(bytes: &[u8], mime_type: &str) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .ok()
        .or_else(|| ImageFormat::from_mime_type(mime_type))
}

fn encode_jpeg(bitmap: &RenderedBitmap, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb: RgbImage = bitmap.pixels().convert();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.value() as u8)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::EncodeFailure {
            format: OutputFormat::Jpeg,
            reason: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_png(bitmap: &RenderedBitmap) -> Result<Vec<u8>, BackendError> {
    let pixels = bitmap.pixels();
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| BackendError::EncodeFailure {
            format: OutputFormat::Png,
            reason: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_webp(bitmap: &RenderedBitmap, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let pixels = bitmap.pixels();
    let encoder = webp::Encoder::from_rgba(pixels.as_raw(), pixels.width(), pixels.height());
    let memory = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| BackendError::EncodeFailure {
            format: OutputFormat::Webp,
            reason: format!("{e:?}"),
        })?;
    Ok(memory.to_vec())
}

impl ImageBackend for RustBackend {
    fn decode(
        &self,
        bytes: &[u8],
        mime_type: &str,
        file_name: &str,
    ) -> Result<SourceImage, BackendError> {
        if !is_image_mime(mime_type) {
            return Err(BackendError::UnsupportedFormat(format!(
                "{file_name} is {mime_type}, not an image"
            )));
        }
        let format = detect_format(bytes, mime_type).ok_or_else(|| {
            BackendError::UnsupportedFormat(format!("{file_name}: unrecognized image data"))
        })?;

        let decoded =
            image::load_from_memory_with_format(bytes, format).map_err(|e| match e {
                ImageError::Unsupported(_) => {
                    BackendError::UnsupportedFormat(format!("{file_name}: {e}"))
                }
                other => BackendError::DecodeFailure {
                    name: file_name.to_string(),
                    reason: other.to_string(),
                },
            })?;

        debug!(
            file = file_name,
            format = ?format,
            width = decoded.width(),
            height = decoded.height(),
            "decoded source"
        );
        Ok(SourceImage::new(
            file_name,
            format.to_mime_type(),
            decoded.to_rgba8(),
        ))
    }

    fn encode(
        &self,
        bitmap: &RenderedBitmap,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(bitmap, quality),
            OutputFormat::Png => encode_png(bitmap),
            OutputFormat::Webp => encode_webp(bitmap, quality),
        }
    }
}
