//! Tool configuration.
//!
//! Handles loading and validating `config.toml`, and applying command-line
//! overrides on top of it. The result is turned into the live
//! [`ResizeSettings`] with [`ToolConfig::to_settings`].
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [resize]
//! mode = "percentage"         # "percentage" or "dimensions"
//! percentage = 100            # 1-200, used in percentage mode
//! # width = 1200              # used in dimensions mode
//! # height = 800
//! aspect_ratio_locked = true
//!
//! [output]
//! quality = "medium"          # "low", "medium" or "high"
//! # format = "jpeg"           # "jpeg", "png" or "webp"; omit to follow the source
//! # target_size_kb = 200.0    # lossy formats only
//!
//! [adjust]
//! brightness = 0              # -100..100
//! contrast = 0
//! saturation = 0
//!
//! [geometry]
//! rotation = 0.0              # degrees, clockwise
//! flip_horizontal = false
//! flip_vertical = false
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [output]
//! format = "webp"
//! target_size_kb = 150.0
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    ColorAdjust, DimensionAnchor, Geometry, MAX_DIMENSION, MAX_PERCENTAGE, MIN_PERCENTAGE,
    OutputFormat, QualityPreset, ResizeMode, ResizeSettings,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have defaults; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Output size.
    pub resize: ResizeConfig,
    /// Format, quality and size target.
    pub output: OutputConfig,
    /// Color filters.
    pub adjust: ColorAdjust,
    /// Rotation and mirroring.
    pub geometry: Geometry,
}

/// How the output size is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub mode: ResizeMode,
    /// Scale in percent (percentage mode).
    pub percentage: u32,
    /// Output width (dimensions mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Output height (dimensions mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// With the lock on, one of width / height is enough; the other follows
    /// each source's own aspect ratio.
    pub aspect_ratio_locked: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            mode: ResizeMode::Percentage,
            percentage: 100,
            width: None,
            height: None,
            aspect_ratio_locked: true,
        }
    }
}

/// Encoding settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub quality: QualityPreset,
    /// Omit to keep PNG sources as PNG and re-encode everything else as JPEG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    /// Seek this output size for lossy formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size_kb: Option<f64>,
}

/// Values given on the command line. `Some` replaces the file's value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub percentage: Option<u32>,
    pub unlock_aspect_ratio: bool,
    pub quality: Option<QualityPreset>,
    pub format: Option<OutputFormat>,
    pub target_size_kb: Option<f64>,
    pub brightness: Option<i32>,
    pub contrast: Option<i32>,
    pub saturation: Option<i32>,
    pub rotation: Option<f64>,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

fn check_adjust(name: &str, value: i32) -> Result<(), ConfigError> {
    if !(-100..=100).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "adjust.{name} must be -100..100, got {value}"
        )));
    }
    Ok(())
}

fn check_side(name: &str, value: Option<u32>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !(1..=MAX_DIMENSION).contains(&v) => Err(ConfigError::Validation(format!(
            "resize.{name} must be 1-{MAX_DIMENSION}, got {v}"
        ))),
        _ => Ok(()),
    }
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let resize = &self.resize;
        if !(MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&resize.percentage) {
            return Err(ConfigError::Validation(format!(
                "resize.percentage must be {MIN_PERCENTAGE}-{MAX_PERCENTAGE}, got {}",
                resize.percentage
            )));
        }
        check_side("width", resize.width)?;
        check_side("height", resize.height)?;
        if resize.mode == ResizeMode::Dimensions {
            match (resize.width, resize.height, resize.aspect_ratio_locked) {
                (None, None, _) => {
                    return Err(ConfigError::Validation(
                        "dimensions mode needs resize.width or resize.height".into(),
                    ));
                }
                (Some(_), Some(_), false) | (_, _, true) => {}
                _ => {
                    return Err(ConfigError::Validation(
                        "dimensions mode without the aspect-ratio lock needs both width and height"
                            .into(),
                    ));
                }
            }
        }

        if let Some(kb) = self.output.target_size_kb {
            if !(kb.is_finite() && kb > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "output.target_size_kb must be a positive number, got {kb}"
                )));
            }
        }

        check_adjust("brightness", self.adjust.brightness)?;
        check_adjust("contrast", self.adjust.contrast)?;
        check_adjust("saturation", self.adjust.saturation)?;

        if !self.geometry.rotation.is_finite() {
            return Err(ConfigError::Validation(
                "geometry.rotation must be a finite number of degrees".into(),
            ));
        }
        Ok(())
    }

    /// Replace file values with the ones given on the command line.
    ///
    /// Giving a width or height switches to dimensions mode; giving a
    /// percentage switches to percentage mode.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        let resize = &mut self.resize;
        if overrides.width.is_some() || overrides.height.is_some() {
            resize.mode = ResizeMode::Dimensions;
            resize.width = overrides.width;
            resize.height = overrides.height;
        }
        if let Some(percentage) = overrides.percentage {
            resize.mode = ResizeMode::Percentage;
            resize.percentage = percentage;
        }
        if overrides.unlock_aspect_ratio {
            resize.aspect_ratio_locked = false;
        }

        let output = &mut self.output;
        output.quality = overrides.quality.unwrap_or(output.quality);
        output.format = overrides.format.or(output.format);
        output.target_size_kb = overrides.target_size_kb.or(output.target_size_kb);

        let adjust = &mut self.adjust;
        adjust.brightness = overrides.brightness.unwrap_or(adjust.brightness);
        adjust.contrast = overrides.contrast.unwrap_or(adjust.contrast);
        adjust.saturation = overrides.saturation.unwrap_or(adjust.saturation);

        let geometry = &mut self.geometry;
        geometry.rotation = overrides.rotation.unwrap_or(geometry.rotation);
        geometry.flip_horizontal |= overrides.flip_horizontal;
        geometry.flip_vertical |= overrides.flip_vertical;
    }

    /// Live settings for this configuration.
    ///
    /// In dimensions mode with the lock on, width wins when both sides are
    /// given; the height then follows each source's ratio.
    pub fn to_settings(&self) -> ResizeSettings {
        let resize = &self.resize;
        let anchor = match (resize.width, resize.height) {
            (None, Some(_)) => DimensionAnchor::Height,
            _ => DimensionAnchor::Width,
        };
        ResizeSettings {
            mode: resize.mode,
            width: resize.width.unwrap_or(1).max(1),
            height: resize.height.unwrap_or(1).max(1),
            percentage: resize.percentage,
            aspect_ratio_locked: resize.aspect_ratio_locked,
            anchor,
            quality: self.output.quality,
            format: self.output.format,
            adjust: ColorAdjust::new(
                self.adjust.brightness,
                self.adjust.contrast,
                self.adjust.saturation,
            ),
            geometry: Geometry::new(
                self.geometry.rotation,
                self.geometry.flip_horizontal,
                self.geometry.flip_vertical,
            ),
            target_size_kb: self.output.target_size_kb,
        }
    }
}

/// Parse and validate a config from TOML text.
pub fn parse_config(text: &str) -> Result<ToolConfig, ConfigError> {
    let config: ToolConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `config.toml` file.
///
/// Unspecified values take their defaults; unknown keys are rejected and the
/// result is validated.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# SnapScale Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output size
# ---------------------------------------------------------------------------
[resize]
# "percentage" scales every image by the same factor.
# "dimensions" uses width / height below.
mode = "percentage"

# Scale in percent, 1-200.
percentage = 100

# Target size in pixels for dimensions mode (1-32767).
# With the aspect-ratio lock on, give one side and the other follows each
# image's own ratio. With it off, give both.
# width = 1200
# height = 800

aspect_ratio_locked = true

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[output]
# Quality preset: "low" (0.50), "medium" (0.75) or "high" (0.92).
quality = "medium"

# "jpeg", "png" or "webp". When omitted, PNG images stay PNG and everything
# else is written as JPEG.
# format = "jpeg"

# Aim for this output size in KB. Only lossy formats (jpeg, webp) honour it;
# the quality preset is then only a starting point.
# target_size_kb = 200.0

# ---------------------------------------------------------------------------
# Color filters, each -100..100 (0 = unchanged)
# ---------------------------------------------------------------------------
[adjust]
brightness = 0
contrast = 0
saturation = 0

# ---------------------------------------------------------------------------
# Rotation (degrees, clockwise) and mirroring
# ---------------------------------------------------------------------------
[geometry]
rotation = 0.0
flip_horizontal = false
flip_vertical = false
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_percentage_at_full_size() {
        let config = ToolConfig::default();
        assert_eq!(config.resize.mode, ResizeMode::Percentage);
        assert_eq!(config.resize.percentage, 100);
        assert!(config.resize.aspect_ratio_locked);
        assert_eq!(config.output.quality, QualityPreset::Medium);
        assert!(config.output.format.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
[output]
format = "webp"
target_size_kb = 150.0
"#,
        )
        .unwrap();
        assert_eq!(config.output.format, Some(OutputFormat::Webp));
        assert_eq!(config.output.target_size_kb, Some(150.0));
        // Defaults preserved
        assert_eq!(config.resize, ResizeConfig::default());
        assert!(config.adjust.is_neutral());
    }

    #[test]
    fn stock_config_matches_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[resize]
mode = "dimensions"
height = 300

[adjust]
contrast = 25

[geometry]
rotation = 90.0
flip_vertical = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.resize.mode, ResizeMode::Dimensions);
        assert_eq!(config.resize.height, Some(300));
        assert_eq!(config.adjust.contrast, 25);
        assert_eq!(config.geometry.rotation, 90.0);
        assert!(config.geometry.flip_vertical);
    }

    #[test]
    fn load_config_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(&tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    fn validation_error(text: &str) -> String {
        match parse_config(text) {
            Err(ConfigError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn percentage_out_of_range_rejected() {
        assert!(validation_error("[resize]\npercentage = 0").contains("percentage"));
        assert!(validation_error("[resize]\npercentage = 201").contains("percentage"));
    }

    #[test]
    fn dimensions_mode_needs_a_side() {
        let msg = validation_error("[resize]\nmode = \"dimensions\"");
        assert!(msg.contains("width or resize.height"));
    }

    #[test]
    fn unlocked_dimensions_need_both_sides() {
        let msg = validation_error(
            "[resize]\nmode = \"dimensions\"\nwidth = 100\naspect_ratio_locked = false",
        );
        assert!(msg.contains("both"));
    }

    #[test]
    fn oversized_side_rejected() {
        let msg = validation_error("[resize]\nmode = \"dimensions\"\nwidth = 40000");
        assert!(msg.contains("resize.width"));
    }

    #[test]
    fn adjust_out_of_range_rejected() {
        assert!(validation_error("[adjust]\nsaturation = -101").contains("saturation"));
    }

    #[test]
    fn non_positive_target_rejected() {
        assert!(validation_error("[output]\ntarget_size_kb = 0.0").contains("target_size_kb"));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str("[output]\nqualty = \"high\"");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str("[outptu]\nquality = \"high\"");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_enum_value_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str("[output]\nquality = \"ultra\"");
        assert!(result.is_err());
    }

    // =========================================================================
    // Overrides and settings
    // =========================================================================

    #[test]
    fn width_override_switches_to_dimensions() {
        let mut config = ToolConfig::default();
        config.apply_overrides(&ConfigOverrides {
            width: Some(640),
            quality: Some(QualityPreset::High),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.resize.mode, ResizeMode::Dimensions);
        assert_eq!(config.resize.width, Some(640));
        assert_eq!(config.output.quality, QualityPreset::High);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_keep_unset_file_values() {
        let mut config =
            parse_config("[adjust]\nbrightness = 10\n[output]\nformat = \"png\"").unwrap();
        config.apply_overrides(&ConfigOverrides {
            contrast: Some(-20),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.adjust, ColorAdjust::new(10, -20, 0));
        assert_eq!(config.output.format, Some(OutputFormat::Png));
    }

    #[test]
    fn height_only_anchors_on_height() {
        let config = parse_config("[resize]\nmode = \"dimensions\"\nheight = 300").unwrap();
        let settings = config.to_settings();
        assert_eq!(settings.anchor, DimensionAnchor::Height);

        let resolved = settings.resolve_for(crate::imaging::Dimensions {
            width: 800,
            height: 600,
        });
        assert_eq!((resolved.width, resolved.height), (400, 300));
    }

    #[test]
    fn settings_normalize_rotation() {
        let config = parse_config("[geometry]\nrotation = -90.0").unwrap();
        assert_eq!(config.to_settings().geometry.rotation, 270.0);
    }
}
