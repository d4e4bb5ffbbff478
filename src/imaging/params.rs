//! Parameter types for the resize pipeline.
//!
//! These types describe *what* to produce, not *how*. They are the interface
//! between the user-facing layers ([`config`](crate::config), the CLI and the
//! [`session`](crate::session)) and the pixel work in
//! [`transform`](super::transform) and the [`backend`](super::backend).
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality in hundredths (1-100). Clamped on construction.
//! - [`QualityPreset`]: the `low` / `medium` / `high` presets and their scalars.
//! - [`OutputFormat`]: `jpeg`, `png` or `webp`, plus the source-matching default.
//! - [`ColorAdjust`] and [`Geometry`]: filter and transform settings.
//! - [`ResizeSettings`]: the full, live settings object for one editing session.

use super::backend::Dimensions;
use super::calculations::{DimensionChange, DimensionState, sync_dimensions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy encoding, stored in hundredths of the scalar (1-100).
///
/// Integer steps keep the size-seeking search free of floating point drift:
/// `0.8 - 0.1 * 7` is not `0.1` in `f32`, but `80 - 10 * 7` is `10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Build from a normalized scalar in `[0, 1]`.
    pub fn from_scalar(scalar: f32) -> Self {
        Self::new((scalar * 100.0).round().max(0.0) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn scalar(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        QualityPreset::default().quality()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.scalar())
    }
}

/// User-facing quality presets.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Encoder scalar for the preset: 0.50 / 0.75 / 0.92.
    pub fn scalar(self) -> f32 {
        match self {
            QualityPreset::Low => 0.50,
            QualityPreset::Medium => 0.75,
            QualityPreset::High => 0.92,
        }
    }

    pub fn quality(self) -> Quality {
        Quality::from_scalar(self.scalar())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityPreset::Low => "low",
            QualityPreset::Medium => "medium",
            QualityPreset::High => "high",
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// Whether the encoder honours a quality scalar.
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Webp)
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Format used when none is configured: PNG sources stay PNG, everything
    /// else is re-encoded as JPEG.
    pub fn for_source_mime(mime_type: &str) -> Self {
        if mime_type.eq_ignore_ascii_case("image/png") {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Webp => "WebP",
        })
    }
}

/// Which input drives the target size.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    Dimensions,
    #[default]
    Percentage,
}

/// The dimension a locked `dimensions`-mode resize was last driven by.
///
/// Batch runs replay this edit against every source so each output keeps its
/// own aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionAnchor {
    #[default]
    Width,
    Height,
}

/// Brightness, contrast and saturation, each in `-100..=100` (0 = neutral).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorAdjust {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
}

impl ColorAdjust {
    pub fn new(brightness: i32, contrast: i32, saturation: i32) -> Self {
        Self {
            brightness: brightness.clamp(-100, 100),
            contrast: contrast.clamp(-100, 100),
            saturation: saturation.clamp(-100, 100),
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Rotation and mirroring applied around the center of the output surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Geometry {
    /// Clockwise rotation in degrees, normalized to `[0, 360)`.
    pub rotation: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Geometry {
    pub fn new(rotation: f64, flip_horizontal: bool, flip_vertical: bool) -> Self {
        Self {
            rotation: rotation.rem_euclid(360.0),
            flip_horizontal,
            flip_vertical,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == 0.0 && !self.flip_horizontal && !self.flip_vertical
    }

    pub fn radians(&self) -> f64 {
        self.rotation * std::f64::consts::PI / 180.0
    }
}

/// Live settings for one editing session.
///
/// Invariants: `width >= 1`, `height >= 1`. Mutate dimensions through
/// [`ResizeSettings::apply`] so the triple stays consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSettings {
    pub mode: ResizeMode,
    pub width: u32,
    pub height: u32,
    /// Scale relative to the source, in percent.
    pub percentage: u32,
    pub aspect_ratio_locked: bool,
    pub anchor: DimensionAnchor,
    pub quality: QualityPreset,
    /// `None` picks a format from the source (see [`OutputFormat::for_source_mime`]).
    pub format: Option<OutputFormat>,
    pub adjust: ColorAdjust,
    pub geometry: Geometry,
    pub target_size_kb: Option<f64>,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            mode: ResizeMode::default(),
            width: 1,
            height: 1,
            percentage: 100,
            aspect_ratio_locked: true,
            anchor: DimensionAnchor::default(),
            quality: QualityPreset::default(),
            format: None,
            adjust: ColorAdjust::default(),
            geometry: Geometry::default(),
            target_size_kb: None,
        }
    }
}

impl ResizeSettings {
    pub fn dimensions(&self) -> DimensionState {
        DimensionState {
            width: self.width,
            height: self.height,
            percentage: self.percentage,
        }
    }

    fn set_dimensions(&mut self, state: DimensionState) {
        self.width = state.width;
        self.height = state.height;
        self.percentage = state.percentage;
    }

    /// Reset the dimension triple to the source's intrinsic size at 100%.
    pub fn reset_for(&mut self, intrinsic: Dimensions) {
        self.set_dimensions(DimensionState::intrinsic(intrinsic));
    }

    /// Apply one user edit through the dimension sync rules.
    pub fn apply(&mut self, change: DimensionChange, intrinsic: Dimensions) {
        match change {
            DimensionChange::Width(_) => self.anchor = DimensionAnchor::Width,
            DimensionChange::Height(_) => self.anchor = DimensionAnchor::Height,
            DimensionChange::Percentage(_) => {}
        }
        let next = sync_dimensions(
            self.dimensions(),
            change,
            self.mode,
            self.aspect_ratio_locked,
            intrinsic,
        );
        self.set_dimensions(next);
    }

    /// Settings with the dimension triple re-derived for a specific source.
    ///
    /// Percentage mode scales each source by the same factor; a locked
    /// `dimensions` resize replays the anchored edit so every source keeps its
    /// own ratio; an unlocked one uses the configured size as-is.
    pub fn resolve_for(&self, intrinsic: Dimensions) -> ResizeSettings {
        let mut resolved = self.clone();
        resolved.reset_for(intrinsic);
        let change = match (self.mode, self.aspect_ratio_locked, self.anchor) {
            (ResizeMode::Percentage, _, _) => DimensionChange::Percentage(self.percentage as i64),
            (ResizeMode::Dimensions, true, DimensionAnchor::Width) => {
                DimensionChange::Width(self.width as i64)
            }
            (ResizeMode::Dimensions, true, DimensionAnchor::Height) => {
                DimensionChange::Height(self.height as i64)
            }
            (ResizeMode::Dimensions, false, _) => {
                resolved.apply(DimensionChange::Width(self.width as i64), intrinsic);
                DimensionChange::Height(self.height as i64)
            }
        };
        resolved.apply(change, intrinsic);
        resolved
    }

    /// Output format for a source with the given MIME type.
    pub fn format_for(&self, source_mime: &str) -> OutputFormat {
        self.format
            .unwrap_or_else(|| OutputFormat::for_source_mime(source_mime))
    }
}
