//! Shared types passed between the pipeline stages.
//!
//! [`EncodedArtifact`] is what the imaging operations produce and what the
//! [`export`](crate::export) collaborators consume. [`ArtifactInfo`] is its
//! byte-free summary, serialized into the JSON run report.

use crate::imaging::{OutputFormat, Quality, SeekStatus, SourceId};
use serde::Serialize;

/// How a size-seeking search went, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeekReport {
    pub target_kb: f64,
    pub iterations: u32,
    pub status: SeekStatus,
}

/// Encoded output for one source image, ready for export.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub source_image_id: SourceId,
    /// `<stem>-<width>x<height>.<ext>`
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Quality used for lossy formats.
    pub quality: Option<Quality>,
    pub seek: Option<SeekReport>,
}

impl EncodedArtifact {
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn size_kb(&self) -> f64 {
        self.byte_size() as f64 / 1024.0
    }

    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            source_image_id: self.source_image_id,
            file_name: self.file_name.clone(),
            byte_size: self.byte_size(),
            format: self.format,
            width: self.width,
            height: self.height,
            quality: self.quality.map(Quality::scalar),
            seek: self.seek,
        }
    }
}

/// Serializable summary of an [`EncodedArtifact`] without its bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub source_image_id: SourceId,
    pub file_name: String,
    pub byte_size: usize,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seek: Option<SeekReport>,
}

/// Output file name for a source: `<stem>-<width>x<height>.<ext>`.
///
/// The stem is everything before the last `.` of the source name; names
/// without an extension are used whole.
pub fn artifact_file_name(
    source_name: &str,
    width: u32,
    height: u32,
    format: OutputFormat,
) -> String {
    let stem = match source_name.rfind('.') {
        Some(dot) if dot > 0 => &source_name[..dot],
        _ => source_name,
    };
    format!("{stem}-{width}x{height}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_last_extension() {
        assert_eq!(
            artifact_file_name("trip.2024.png", 400, 300, OutputFormat::Jpeg),
            "trip.2024-400x300.jpeg"
        );
    }

    #[test]
    fn file_name_without_extension() {
        assert_eq!(
            artifact_file_name("scan", 10, 20, OutputFormat::Webp),
            "scan-10x20.webp"
        );
        assert_eq!(
            artifact_file_name(".hidden", 1, 1, OutputFormat::Png),
            ".hidden-1x1.png"
        );
    }

    #[test]
    fn info_drops_bytes() {
        let source =
            crate::imaging::SourceImage::new("a", "image/png", image::RgbaImage::new(1, 1));
        let artifact = EncodedArtifact {
            source_image_id: source.id(),
            file_name: "a-1x1.png".into(),
            bytes: vec![0; 2048],
            format: OutputFormat::Png,
            width: 1,
            height: 1,
            quality: None,
            seek: None,
        };
        let info = artifact.info();
        assert_eq!(info.byte_size, 2048);
        assert_eq!(artifact.size_kb(), 2.0);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["format"], "png");
        assert!(json.get("quality").is_none());
    }
}
