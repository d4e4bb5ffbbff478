//! Size-seeking search over the encoder quality.
//!
//! Starting at quality 0.80 the search encodes, compares the output size with
//! the target, and steps the quality down by 0.10 (too big) or up by 0.05 (too
//! small) until the size is within 10% of the target or the quality hits its
//! floor (0.10) or ceiling (0.95).
//!
//! The asymmetric steps can make the search cycle near a threshold
//! (0.75 → 0.65 → 0.70 → 0.75 ...). The iteration cap ends such runs; the last
//! encode is returned and the outcome is marked [`SeekStatus::CapExceeded`].

use super::backend::BackendError;
use super::params::Quality;
use serde::Serialize;
use tracing::{debug, warn};

/// First quality tried, in hundredths.
pub const INITIAL_QUALITY: u32 = 80;
/// Quality floor and ceiling, in hundredths.
pub const MIN_QUALITY: u32 = 10;
pub const MAX_QUALITY: u32 = 95;
/// Step down when the output is too large, step up when too small.
pub const STEP_DOWN: u32 = 10;
pub const STEP_UP: u32 = 5;
/// Relative size deviation accepted as a match.
pub const TOLERANCE: f64 = 0.10;
/// Hard bound on encode attempts.
pub const MAX_ITERATIONS: u32 = 20;

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekStatus {
    /// Within tolerance of the target.
    Converged,
    /// Quality reached the floor or ceiling before the target.
    Saturated,
    /// The iteration cap was hit; the bytes are the last attempt.
    CapExceeded,
}

/// Result of a size-seeking search.
#[derive(Debug, Clone)]
pub struct SeekOutcome {
    pub bytes: Vec<u8>,
    pub quality: Quality,
    pub iterations: u32,
    pub status: SeekStatus,
}

fn size_kb(bytes: &[u8]) -> f64 {
    bytes.len() as f64 / 1024.0
}

/// Search for a quality whose output lands within [`TOLERANCE`] of `target_kb`.
///
/// `encode` is called once per iteration with the quality to try. Encoder
/// errors abort the search; running out of iterations does not.
pub fn seek_target_size<F>(mut encode: F, target_kb: f64) -> Result<SeekOutcome, BackendError>
where
    F: FnMut(Quality) -> Result<Vec<u8>, BackendError>,
{
    let mut quality = INITIAL_QUALITY;
    let mut iteration = 0;

    loop {
        iteration += 1;
        let current = quality;
        let bytes = encode(Quality::new(current))?;
        let actual_kb = size_kb(&bytes);
        let deviation = (actual_kb - target_kb).abs() / target_kb;
        debug!(
            iteration,
            quality = current,
            actual_kb,
            target_kb,
            deviation,
            "size seek attempt"
        );

        let status = if deviation < TOLERANCE {
            SeekStatus::Converged
        } else if actual_kb > target_kb && current > MIN_QUALITY {
            quality = current.saturating_sub(STEP_DOWN).max(MIN_QUALITY);
            if iteration < MAX_ITERATIONS {
                continue;
            }
            SeekStatus::CapExceeded
        } else if actual_kb < target_kb && current < MAX_QUALITY {
            quality = (current + STEP_UP).min(MAX_QUALITY);
            if iteration < MAX_ITERATIONS {
                continue;
            }
            SeekStatus::CapExceeded
        } else {
            debug!(quality = current, actual_kb, target_kb, "quality saturated");
            SeekStatus::Saturated
        };

        if status == SeekStatus::CapExceeded {
            warn!(
                target_kb,
                actual_kb,
                iterations = MAX_ITERATIONS,
                "size seek did not settle, keeping last attempt"
            );
        }

        return Ok(SeekOutcome {
            bytes,
            quality: Quality::new(current),
            iterations: iteration,
            status,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Encoder whose output is `kib(quality)` KiB, recording every quality tried.
    fn synthetic<'a>(
        kib: impl Fn(u32) -> f64 + 'a,
        tried: &'a RefCell<Vec<u32>>,
    ) -> impl FnMut(Quality) -> Result<Vec<u8>, BackendError> + 'a {
        move |q| {
            tried.borrow_mut().push(q.value());
            Ok(vec![0u8; (kib(q.value()) * 1024.0) as usize])
        }
    }

    #[test]
    fn converges_on_monotonic_encoder() {
        // 1 KiB per quality point: 80 → 70 → 60 → 50 KiB.
        let tried = RefCell::new(Vec::new());
        let outcome = seek_target_size(synthetic(|q| q as f64, &tried), 50.0).unwrap();

        assert_eq!(outcome.status, SeekStatus::Converged);
        assert!(outcome.iterations <= MAX_ITERATIONS);
        let actual = size_kb(&outcome.bytes);
        assert!((actual - 50.0).abs() / 50.0 < TOLERANCE);
        assert_eq!(*tried.borrow(), vec![80, 70, 60, 50]);
    }

    #[test]
    fn accepts_first_attempt_within_tolerance() {
        let tried = RefCell::new(Vec::new());
        let outcome = seek_target_size(synthetic(|_| 100.0, &tried), 95.0).unwrap();
        assert_eq!(outcome.status, SeekStatus::Converged);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.quality.value(), 80);
    }

    #[test]
    fn unreachable_small_target_stops_at_floor() {
        let tried = RefCell::new(Vec::new());
        let outcome = seek_target_size(synthetic(|q| q as f64, &tried), 0.001).unwrap();

        assert_eq!(outcome.status, SeekStatus::Saturated);
        assert_eq!(outcome.quality.value(), MIN_QUALITY);
        assert_eq!(*tried.borrow(), vec![80, 70, 60, 50, 40, 30, 20, 10]);
    }

    #[test]
    fn unreachable_large_target_stops_at_ceiling() {
        let tried = RefCell::new(Vec::new());
        let outcome = seek_target_size(synthetic(|q| q as f64, &tried), 10_000.0).unwrap();

        assert_eq!(outcome.status, SeekStatus::Saturated);
        assert_eq!(outcome.quality.value(), MAX_QUALITY);
        assert_eq!(*tried.borrow(), vec![80, 85, 90, 95]);
    }

    #[test]
    fn oscillation_is_cut_off_by_the_cap() {
        // A cliff at 0.75: the search bounces 75 → 65 → 70 → 75 forever.
        let tried = RefCell::new(Vec::new());
        let cliff = |q: u32| if q >= 75 { 100.0 } else { 10.0 };
        let outcome = seek_target_size(synthetic(cliff, &tried), 50.0).unwrap();

        assert_eq!(outcome.status, SeekStatus::CapExceeded);
        assert_eq!(outcome.iterations, MAX_ITERATIONS);
        assert_eq!(tried.borrow().len(), MAX_ITERATIONS as usize);
        // The returned bytes are the last attempt's.
        let last = *tried.borrow().last().unwrap();
        assert_eq!(size_kb(&outcome.bytes), cliff(last));
    }

    #[test]
    fn step_down_never_goes_below_floor() {
        // Too large at every quality; 15 would otherwise step to 5.
        let tried = RefCell::new(Vec::new());
        let sizes = |q: u32| if q == 80 { 1.0 } else { 1000.0 };
        let outcome = seek_target_size(synthetic(sizes, &tried), 100.0).unwrap();
        assert_eq!(outcome.status, SeekStatus::Saturated);
        assert!(tried.borrow().iter().all(|&q| q >= MIN_QUALITY));
        assert_eq!(outcome.quality.value(), MIN_QUALITY);
    }

    #[test]
    fn encoder_error_aborts() {
        let result = seek_target_size(
            |_| {
                Err(BackendError::EncodeFailure {
                    format: crate::imaging::OutputFormat::Jpeg,
                    reason: "boom".into(),
                })
            },
            10.0,
        );
        assert!(matches!(result, Err(BackendError::EncodeFailure { .. })));
    }
}
