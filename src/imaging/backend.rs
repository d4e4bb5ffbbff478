//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two codec operations every backend
//! must support: decode (bytes → [`SourceImage`]) and encode
//! ([`RenderedBitmap`] → bytes). Geometry and color work is pure and lives in
//! [`transform`](super::transform); it never touches a backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::calculations::MAX_DIMENSION;
use super::params::{OutputFormat, Quality};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to decode {name}: {reason}")]
    DecodeFailure { name: String, reason: String },
    #[error("Invalid dimensions {width}x{height}: each side must be 1-{max}px", max = MAX_DIMENSION)]
    InvalidDimensions { width: u32, height: u32 },
    #[error("{format} encode failed: {reason}")]
    EncodeFailure { format: OutputFormat, reason: String },
}

/// Pixel size of an image or surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Opaque identity of a loaded source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decoded source image. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    id: SourceId,
    name: String,
    mime_type: String,
    pixels: RgbaImage,
}

impl SourceImage {
    /// Wrap decoded pixels, assigning a fresh [`SourceId`].
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            id: SourceId::next(),
            name: name.into(),
            mime_type: mime_type.into(),
            pixels,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn intrinsic_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn intrinsic_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.intrinsic_width(),
            height: self.intrinsic_height(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Raw RGBA pixels at the final output size, ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBitmap {
    pixels: RgbaImage,
}

impl RenderedBitmap {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }
}

/// Trait for codec backends.
///
/// Both operations must be deterministic for identical input so that repeated
/// encodes of the same bitmap produce the same bytes.
pub trait ImageBackend: Sync {
    /// Decode an uploaded or fetched file.
    ///
    /// Fails with [`BackendError::UnsupportedFormat`] for non-image input and
    /// [`BackendError::DecodeFailure`] for unreadable image data.
    fn decode(
        &self,
        bytes: &[u8],
        mime_type: &str,
        file_name: &str,
    ) -> Result<SourceImage, BackendError>;

    /// Encode a bitmap. `quality` is ignored by lossless formats.
    fn encode(
        &self,
        bitmap: &RenderedBitmap,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
