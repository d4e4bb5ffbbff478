//! Shared test utilities for the snapscale test suite.
//!
//! Provides synthetic images, encoded fixtures and in-memory exporters so
//! tests never need files on disk unless they are testing the disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let bytes = png_fixture(80, 60);
//! let exporter = CollectingExporter::default();
//! // ... run a batch ...
//! assert_eq!(exporter.names(), vec!["a-40x30.png"]);
//! ```

use std::sync::Mutex;

use image::{Rgba, RgbaImage};

use crate::export::{ExportError, ExportReceipt, Exporter};
use crate::imaging::{
    ImageBackend, OutputFormat, Quality, RenderedBitmap, RustBackend, SourceImage,
};
use crate::types::EncodedArtifact;

// =========================================================================
// Pixel fixtures
// =========================================================================

/// A deterministic gradient with an opaque alpha channel.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x ^ y) % 256) as u8, 255])
    })
}

/// PNG bytes of [`gradient`], produced by the real encoder.
pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    RustBackend::new()
        .encode(
            &RenderedBitmap::new(gradient(width, height)),
            OutputFormat::Png,
            Quality::default(),
        )
        .unwrap()
}

/// A decoded source wrapping [`gradient`].
pub fn gradient_source(name: &str, width: u32, height: u32) -> SourceImage {
    SourceImage::new(name, "image/png", gradient(width, height))
}

/// A bare artifact with the given name and bytes.
pub fn artifact_named(file_name: &str, bytes: Vec<u8>) -> EncodedArtifact {
    EncodedArtifact {
        source_image_id: gradient_source("fixture", 1, 1).id(),
        file_name: file_name.to_string(),
        bytes,
        format: OutputFormat::Png,
        width: 1,
        height: 1,
        quality: None,
        seek: None,
    }
}

// =========================================================================
// Exporters
// =========================================================================

/// Exporter that keeps every artifact in memory.
///
/// Names listed in `blocked` are refused with [`ExportError::Blocked`].
#[derive(Default)]
pub struct CollectingExporter {
    pub blocked: Vec<String>,
    exported: Mutex<Vec<EncodedArtifact>>,
}

impl CollectingExporter {
    pub fn blocking(names: &[&str]) -> Self {
        Self {
            blocked: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn exported(&self) -> Vec<EncodedArtifact> {
        self.exported.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.exported()
            .into_iter()
            .map(|a| a.file_name)
            .collect()
    }
}

impl Exporter for CollectingExporter {
    fn export(&self, artifact: &EncodedArtifact) -> Result<ExportReceipt, ExportError> {
        if self.blocked.contains(&artifact.file_name) {
            return Err(ExportError::Blocked(artifact.file_name.clone()));
        }
        self.exported.lock().unwrap().push(artifact.clone());
        Ok(ExportReceipt {
            destination: format!("memory://{}", artifact.file_name).into(),
        })
    }
}
