//! # SnapScale
//!
//! Resize, color-adjust, rotate and re-encode photos, either at a fixed
//! quality preset or by searching for the quality that lands closest to a
//! target file size.
//!
//! # Architecture: Decode, Render, Encode, Export
//!
//! Every image goes through the same four steps:
//!
//! ```text
//! 1. Decode   bytes + mime      →  SourceImage      (ImageBackend::decode)
//! 2. Render   SourceImage       →  RenderedBitmap   (resize, color, geometry)
//! 3. Encode   RenderedBitmap    →  EncodedArtifact  (preset or size seek)
//! 4. Export   EncodedArtifact   →  file             (Exporter)
//! ```
//!
//! Rendering is pure Rust over RGBA buffers. Codecs sit behind the
//! [`imaging::ImageBackend`] trait so the pipeline logic (dimension sync, the
//! size search, batch failure isolation) is tested against a recording mock
//! without encoding real images.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Settings, dimension sync, rendering, codecs and the size-seeking search |
//! | [`session`] | One active image with live settings and the displayed estimate |
//! | [`batch`] | Sequential processing of many sources with per-item failure isolation |
//! | [`estimate`] | Advisory size estimates, last-request-wins |
//! | [`export`] | Where encoded artifacts go |
//! | [`config`] | `config.toml` loading, validation and command-line overrides |
//! | [`types`] | Artifacts and their serializable summaries |
//! | [`output`] | CLI output formatting and the JSON run report |
//!
//! # Design Decisions
//!
//! ## Integer Dimensions Throughout
//!
//! Width, height and percentage are always whole numbers, and every edit
//! re-derives the other two from the intrinsic size with a single rounding.
//! Repeated edits never drift.
//!
//! ## Size Seeking Is Best-Effort
//!
//! A target size is a request, not a guarantee. The search steps quality in
//! hundredths and stops when within 10% of the target, when it runs out of
//! quality range, or after 20 encodes. Whatever it ends on is kept.
//!
//! ## One Item Never Fails the Batch
//!
//! Sources are decoded one at a time and exported before the next one is
//! read. A failed decode, encode or export is recorded against that item and
//! the batch moves on.

pub mod batch;
pub mod config;
pub mod estimate;
pub mod export;
pub mod imaging;
pub mod output;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
