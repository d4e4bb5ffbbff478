//! Pure calculation functions for output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! The width / height / percentage triple is modelled as a state transition:
//! one user edit in, one consistent triple out. Nothing here writes back into
//! the triple while it is being derived, so there is no feedback loop to guard
//! against and applying the same edit twice is a no-op.

use super::backend::Dimensions;
use super::params::ResizeMode;
use serde::{Deserialize, Serialize};

/// Largest side length the render surface accepts.
pub const MAX_DIMENSION: u32 = 32767;

/// Percentage inputs are clamped to this range.
pub const MIN_PERCENTAGE: u32 = 1;
pub const MAX_PERCENTAGE: u32 = 200;

/// A resolved width / height / percentage triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionState {
    pub width: u32,
    pub height: u32,
    pub percentage: u32,
}

impl DimensionState {
    /// The triple for a freshly activated source: intrinsic size at 100%.
    pub fn intrinsic(dims: Dimensions) -> Self {
        Self {
            width: dims.width.max(1),
            height: dims.height.max(1),
            percentage: 100,
        }
    }
}

/// A single user edit to one field of the triple.
///
/// Values are signed so that out-of-range input (zero, negative) can be
/// represented and clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionChange {
    Width(i64),
    Height(i64),
    Percentage(i64),
}

/// Clamp a width or height input to at least one pixel.
fn clamp_side(value: i64) -> u32 {
    value.clamp(1, u32::MAX as i64) as u32
}

fn clamp_percentage(value: i64) -> u32 {
    value.clamp(MIN_PERCENTAGE as i64, MAX_PERCENTAGE as i64) as u32
}

/// `width / height` of the source.
fn intrinsic_ratio(intrinsic: Dimensions) -> f64 {
    intrinsic.width.max(1) as f64 / intrinsic.height.max(1) as f64
}

/// Percentage of the source width that `width` represents.
///
/// Reported as-is (not clamped to the input range) so it always reflects the
/// actual scale of the output.
pub fn percentage_of(width: u32, intrinsic: Dimensions) -> u32 {
    (100.0 * width as f64 / intrinsic.width.max(1) as f64).round() as u32
}

/// Scale one intrinsic side by a percentage, never below one pixel.
pub fn scale_side(side: u32, percentage: u32) -> u32 {
    ((side as f64 * percentage as f64 / 100.0).round() as u32).max(1)
}

/// Derive the next consistent triple from one edit.
///
/// Rules, by mode:
/// - `dimensions` + width edit: height follows the intrinsic ratio when locked;
///   percentage is recomputed from the width.
/// - `dimensions` + height edit: width follows the intrinsic ratio when locked;
///   percentage is recomputed from the (possibly derived) width.
/// - `percentage` + percentage edit: both sides are scaled from the intrinsic size.
///
/// An edit to a field that does not drive the current mode is recorded
/// (clamped) without deriving the other fields.
///
/// # Examples
/// ```
/// # use snapscale::imaging::{DimensionChange, DimensionState, Dimensions, ResizeMode, sync_dimensions};
/// let intrinsic = Dimensions { width: 800, height: 600 };
/// let next = sync_dimensions(
///     DimensionState::intrinsic(intrinsic),
///     DimensionChange::Percentage(50),
///     ResizeMode::Percentage,
///     true,
///     intrinsic,
/// );
/// assert_eq!((next.width, next.height, next.percentage), (400, 300, 50));
/// ```
pub fn sync_dimensions(
    previous: DimensionState,
    change: DimensionChange,
    mode: ResizeMode,
    locked: bool,
    intrinsic: Dimensions,
) -> DimensionState {
    let ratio = intrinsic_ratio(intrinsic);
    let mut next = previous;

    match (mode, change) {
        (ResizeMode::Dimensions, DimensionChange::Width(value)) => {
            next.width = clamp_side(value);
            if locked {
                next.height = clamp_side((next.width as f64 / ratio).round() as i64);
            }
            next.percentage = percentage_of(next.width, intrinsic);
        }
        (ResizeMode::Dimensions, DimensionChange::Height(value)) => {
            next.height = clamp_side(value);
            if locked {
                next.width = clamp_side((next.height as f64 * ratio).round() as i64);
            }
            next.percentage = percentage_of(next.width, intrinsic);
        }
        (ResizeMode::Percentage, DimensionChange::Percentage(value)) => {
            next.percentage = clamp_percentage(value);
            next.width = scale_side(intrinsic.width, next.percentage);
            next.height = scale_side(intrinsic.height, next.percentage);
        }
        (_, DimensionChange::Width(value)) => next.width = clamp_side(value),
        (_, DimensionChange::Height(value)) => next.height = clamp_side(value),
        (_, DimensionChange::Percentage(value)) => next.percentage = clamp_percentage(value),
    }

    next
}

/// Whether a surface of this size can be rendered.
pub fn dimensions_in_range(width: u32, height: u32) -> bool {
    (1..=MAX_DIMENSION).contains(&width) && (1..=MAX_DIMENSION).contains(&height)
}
