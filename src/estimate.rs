//! Display-only output size estimates.
//!
//! The estimate shown next to the settings is advisory: it never drives an
//! encode. Any [`SizeEstimator`] may be plugged in; when it fails the
//! deterministic [`FormulaEstimator`] answers instead, and the failure is only
//! logged.
//!
//! Estimates are requested on every settings change and may complete out of
//! order. [`EstimateTracker`] keeps the display on the most recent request:
//! each request takes a sequence number, and a completion is shown only if no
//! newer request was issued in the meantime.

use crate::imaging::QualityPreset;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("Estimator unavailable: {0}")]
    Unavailable(String),
    #[error("Estimator returned an unusable value: {0}")]
    InvalidValue(f64),
}

/// An advisory output size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub estimated_kb: f64,
    /// Where the number came from, for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Source of display estimates.
///
/// Dimensions are signed so callers can pass raw input through; non-positive
/// sizes estimate to zero.
pub trait SizeEstimator {
    fn estimate(
        &self,
        width: i64,
        height: i64,
        preset: QualityPreset,
    ) -> Result<Estimate, EstimateError>;
}

/// Rough bytes per pixel of photographic JPEG output at each preset.
fn bytes_per_pixel(preset: QualityPreset) -> f64 {
    match preset {
        QualityPreset::Low => 0.08,
        QualityPreset::Medium => 0.15,
        QualityPreset::High => 0.32,
    }
}

/// Deterministic local estimate: `width × height × bytes_per_pixel(preset)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaEstimator;

impl FormulaEstimator {
    pub fn estimate_kb(width: i64, height: i64, preset: QualityPreset) -> f64 {
        if width <= 0 || height <= 0 {
            return 0.0;
        }
        width as f64 * height as f64 * bytes_per_pixel(preset) / 1024.0
    }
}

impl SizeEstimator for FormulaEstimator {
    fn estimate(
        &self,
        width: i64,
        height: i64,
        preset: QualityPreset,
    ) -> Result<Estimate, EstimateError> {
        Ok(Estimate {
            estimated_kb: Self::estimate_kb(width, height, preset),
            note: Some(format!("{preset} quality, formula")),
        })
    }
}

/// Ask `estimator`, falling back to [`FormulaEstimator`] on any failure.
pub fn estimate_or_fallback(
    estimator: &dyn SizeEstimator,
    width: i64,
    height: i64,
    preset: QualityPreset,
) -> Estimate {
    if width <= 0 || height <= 0 {
        return Estimate {
            estimated_kb: 0.0,
            note: None,
        };
    }
    let checked = estimator
        .estimate(width, height, preset)
        .and_then(|estimate| {
            let kb = estimate.estimated_kb;
            if kb.is_finite() && kb >= 0.0 {
                Ok(estimate)
            } else {
                Err(EstimateError::InvalidValue(kb))
            }
        });
    match checked {
        Ok(estimate) => estimate,
        Err(e) => {
            warn!(error = %e, width, height, "estimator failed, using formula");
            Estimate {
                estimated_kb: FormulaEstimator::estimate_kb(width, height, preset),
                note: Some(format!("{preset} quality, formula")),
            }
        }
    }
}

/// Handle for one estimate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EstimateTicket(u64);

/// Last-request-wins holder for the displayed estimate.
#[derive(Debug, Default)]
pub struct EstimateTracker {
    latest: AtomicU64,
    displayed: Mutex<Option<Estimate>>,
}

impl EstimateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request. Any earlier ticket becomes stale.
    pub fn begin(&self) -> EstimateTicket {
        EstimateTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Deliver a result. Returns `false` (and discards it) when a newer
    /// request was started after `ticket`.
    pub fn complete(&self, ticket: EstimateTicket, estimate: Estimate) -> bool {
        let mut displayed = self.displayed.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket.0 != self.latest.load(Ordering::SeqCst) {
            debug!(ticket = ticket.0, "discarding stale estimate");
            return false;
        }
        *displayed = Some(estimate);
        true
    }

    /// Clear the display and make every outstanding ticket stale.
    pub fn reset(&self) {
        let mut displayed = self.displayed.lock().unwrap_or_else(PoisonError::into_inner);
        self.latest.fetch_add(1, Ordering::SeqCst);
        *displayed = None;
    }

    pub fn current(&self) -> Option<Estimate> {
        self.displayed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl SizeEstimator for Broken {
        fn estimate(&self, _: i64, _: i64, _: QualityPreset) -> Result<Estimate, EstimateError> {
            Err(EstimateError::Unavailable("offline".into()))
        }
    }

    struct Fixed(f64);

    impl SizeEstimator for Fixed {
        fn estimate(&self, _: i64, _: i64, _: QualityPreset) -> Result<Estimate, EstimateError> {
            Ok(Estimate {
                estimated_kb: self.0,
                note: None,
            })
        }
    }

    fn kb(value: f64) -> Estimate {
        Estimate {
            estimated_kb: value,
            note: None,
        }
    }

    // =========================================================================
    // formula
    // =========================================================================

    #[test]
    fn formula_is_zero_for_non_positive_sizes() {
        assert_eq!(FormulaEstimator::estimate_kb(0, 600, QualityPreset::High), 0.0);
        assert_eq!(FormulaEstimator::estimate_kb(800, -1, QualityPreset::High), 0.0);
    }

    #[test]
    fn formula_grows_with_quality_and_area() {
        let low = FormulaEstimator::estimate_kb(800, 600, QualityPreset::Low);
        let medium = FormulaEstimator::estimate_kb(800, 600, QualityPreset::Medium);
        let high = FormulaEstimator::estimate_kb(800, 600, QualityPreset::High);
        assert!(low < medium && medium < high);
        assert_eq!(
            FormulaEstimator::estimate_kb(1600, 1200, QualityPreset::Medium),
            medium * 4.0
        );
    }

    // =========================================================================
    // fallback
    // =========================================================================

    #[test]
    fn failing_estimator_falls_back_to_formula() {
        let estimate = estimate_or_fallback(&Broken, 800, 600, QualityPreset::Low);
        assert_eq!(
            estimate.estimated_kb,
            FormulaEstimator::estimate_kb(800, 600, QualityPreset::Low)
        );
    }

    #[test]
    fn unusable_values_fall_back() {
        for bad in [f64::NAN, -3.0, f64::INFINITY] {
            let estimate = estimate_or_fallback(&Fixed(bad), 10, 10, QualityPreset::High);
            assert!(estimate.estimated_kb.is_finite() && estimate.estimated_kb >= 0.0);
        }
    }

    #[test]
    fn good_values_pass_through() {
        let estimate = estimate_or_fallback(&Fixed(42.5), 10, 10, QualityPreset::High);
        assert_eq!(estimate, kb(42.5));
    }

    #[test]
    fn non_positive_size_skips_the_estimator() {
        let estimate = estimate_or_fallback(&Broken, 0, 10, QualityPreset::High);
        assert_eq!(estimate.estimated_kb, 0.0);
    }

    // =========================================================================
    // tracker
    // =========================================================================

    #[test]
    fn latest_request_wins_regardless_of_arrival_order() {
        let tracker = EstimateTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();

        // The newer request completes first, then the stale one arrives.
        assert!(tracker.complete(second, kb(20.0)));
        assert!(!tracker.complete(first, kb(10.0)));
        assert_eq!(tracker.current(), Some(kb(20.0)));
    }

    #[test]
    fn stale_result_is_dropped_even_when_nothing_is_displayed() {
        let tracker = EstimateTracker::new();
        let first = tracker.begin();
        let _second = tracker.begin();
        assert!(!tracker.complete(first, kb(10.0)));
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn reset_clears_and_invalidates() {
        let tracker = EstimateTracker::new();
        let ticket = tracker.begin();
        assert!(tracker.complete(ticket, kb(5.0)));

        let pending = tracker.begin();
        tracker.reset();
        assert_eq!(tracker.current(), None);
        assert!(!tracker.complete(pending, kb(6.0)));
    }

    #[test]
    fn tickets_increase() {
        let tracker = EstimateTracker::new();
        let a = tracker.begin();
        let b = tracker.begin();
        assert!(b > a);
    }
}
