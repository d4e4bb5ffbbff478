//! Image processing: dimension math, rendering and encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Scale** | `image::imageops::resize` with `Lanczos3` |
//! | **Rotate / mirror** | inverse-mapped sampling in [`transform`] |
//! | **Color filters** | per-pixel pass, parallel over rayon |
//! | **Encode** | `image` JPEG/PNG encoders, `webp` for WebP |
//!
//! The module is split into:
//! - **Calculations**: the pure width / height / percentage sync (unit testable)
//! - **Parameters**: data structures describing what to produce
//! - **Transform**: pure render stages over owned pixel buffers
//! - **Seek**: the size-seeking quality search
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: high-level functions combining all of the above

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod seek;
pub mod transform;

pub use backend::{BackendError, Dimensions, ImageBackend, RenderedBitmap, SourceId, SourceImage};
pub use calculations::{
    DimensionChange, DimensionState, MAX_DIMENSION, MAX_PERCENTAGE, MIN_PERCENTAGE,
    dimensions_in_range, percentage_of, sync_dimensions,
};
pub use operations::{EncodeOutcome, encode_artifact, encode_bitmap, produce_artifact};
pub use params::{
    ColorAdjust, DimensionAnchor, Geometry, OutputFormat, Quality, QualityPreset, ResizeMode,
    ResizeSettings,
};
pub use rust_backend::{RustBackend, is_image_mime, mime_from_file_name};
pub use seek::{SeekOutcome, SeekStatus, seek_target_size};
pub use transform::render;
