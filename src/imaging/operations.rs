//! High-level image operations.
//!
//! These functions combine calculations, rendering and the backend: they take
//! the live settings, resolve them against one source, and produce the bytes.

use super::backend::{BackendError, ImageBackend, RenderedBitmap, SourceImage};
use super::params::{OutputFormat, Quality, QualityPreset, ResizeSettings};
use super::seek::{SeekOutcome, SeekStatus, seek_target_size};
use super::transform::render;
use crate::types::{EncodedArtifact, SeekReport, artifact_file_name};
use tracing::{debug, info};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Bytes from one encode pass plus how they were obtained.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub bytes: Vec<u8>,
    /// Quality used for lossy output; `None` for lossless formats.
    pub quality: Option<Quality>,
    /// Present when a size-seeking search ran.
    pub seek: Option<SeekReport>,
}

/// The target a lossy encode should seek, if any.
fn seek_target(format: OutputFormat, target_kb: Option<f64>) -> Option<f64> {
    target_kb.filter(|kb| format.is_lossy() && kb.is_finite() && *kb > 0.0)
}

/// Encode a rendered bitmap.
///
/// Lossy formats with a positive target run the size-seeking search; every
/// other combination is a single encode at the preset's quality. PNG ignores
/// both the preset and the target.
pub fn encode_bitmap(
    backend: &impl ImageBackend,
    bitmap: &RenderedBitmap,
    format: OutputFormat,
    preset: QualityPreset,
    target_kb: Option<f64>,
) -> Result<EncodeOutcome> {
    if let Some(target_kb) = seek_target(format, target_kb) {
        let SeekOutcome {
            bytes,
            quality,
            iterations,
            status,
        } = seek_target_size(|q| backend.encode(bitmap, format, q), target_kb)?;
        return Ok(EncodeOutcome {
            bytes,
            quality: Some(quality),
            seek: Some(SeekReport {
                target_kb,
                iterations,
                status,
            }),
        });
    }

    let quality = preset.quality();
    let bytes = backend.encode(bitmap, format, quality)?;
    Ok(EncodeOutcome {
        bytes,
        quality: format.is_lossy().then_some(quality),
        seek: None,
    })
}

/// Render and encode one source, re-deriving the size for it first.
///
/// Batch runs use this so the same resize intent applies to sources of
/// different sizes.
pub fn produce_artifact(
    backend: &impl ImageBackend,
    source: &SourceImage,
    settings: &ResizeSettings,
) -> Result<EncodedArtifact> {
    let resolved = settings.resolve_for(source.dimensions());
    encode_artifact(backend, source, &resolved)
}

/// Render and encode one source at exactly `settings.width × settings.height`.
pub fn encode_artifact(
    backend: &impl ImageBackend,
    source: &SourceImage,
    settings: &ResizeSettings,
) -> Result<EncodedArtifact> {
    let format = settings.format_for(source.mime_type());

    let bitmap = render(source, settings)?;
    let outcome = encode_bitmap(
        backend,
        &bitmap,
        format,
        settings.quality,
        settings.target_size_kb,
    )?;

    if let Some(seek) = outcome.seek.as_ref().filter(|s| s.status != SeekStatus::Converged) {
        debug!(
            source = source.name(),
            status = ?seek.status,
            "size target not reached"
        );
    }

    let artifact = EncodedArtifact {
        source_image_id: source.id(),
        file_name: artifact_file_name(source.name(), bitmap.width(), bitmap.height(), format),
        bytes: outcome.bytes,
        format,
        width: bitmap.width(),
        height: bitmap.height(),
        quality: outcome.quality,
        seek: outcome.seek,
    };
    info!(
        source = source.name(),
        output = %artifact.file_name,
        bytes = artifact.byte_size(),
        "encoded"
    );
    Ok(artifact)
}
