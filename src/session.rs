//! Single-image editing session.
//!
//! Holds the active source, the live [`ResizeSettings`] and the displayed size
//! estimate. Every dimension edit goes through
//! [`sync_dimensions`](crate::imaging::sync_dimensions), so the triple is
//! consistent after each call.
//!
//! ```text
//! set_active ──▶ (intrinsic_w, intrinsic_h, 100%)
//!     │
//!     ▼
//! apply(edit) ──▶ sync ──▶ request_estimate ──▶ complete_estimate
//!     │
//!     ▼
//! produce(backend) ──▶ EncodedArtifact
//! ```

use crate::estimate::{
    Estimate, EstimateTicket, EstimateTracker, SizeEstimator, estimate_or_fallback,
};
use crate::imaging::{
    BackendError, ColorAdjust, DimensionChange, DimensionState, Geometry, ImageBackend,
    OutputFormat, QualityPreset, ResizeMode, ResizeSettings, SourceImage, encode_artifact,
};
use crate::types::EncodedArtifact;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No image loaded")]
    NoActiveSource,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// What an estimator should be asked, tagged with the request's ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateRequest {
    pub ticket: EstimateTicket,
    pub width: i64,
    pub height: i64,
    pub preset: QualityPreset,
}

#[derive(Debug, Default)]
pub struct EditingSession {
    active: Option<SourceImage>,
    settings: ResizeSettings,
    estimates: EstimateTracker,
}

impl EditingSession {
    /// A session starting from `settings`. Dimensions are re-derived as soon
    /// as a source is activated.
    pub fn new(settings: ResizeSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn active(&self) -> Option<&SourceImage> {
        self.active.as_ref()
    }

    pub fn settings(&self) -> &ResizeSettings {
        &self.settings
    }

    pub fn dimensions(&self) -> DimensionState {
        self.settings.dimensions()
    }

    /// Make `source` the active image: width and height reset to its
    /// intrinsic size, percentage to 100, and the displayed estimate clears.
    ///
    /// Returns the previously active source.
    pub fn set_active(&mut self, source: SourceImage) -> Option<SourceImage> {
        debug!(source = source.name(), size = %source.dimensions(), "activating source");
        self.settings.reset_for(source.dimensions());
        self.estimates.reset();
        self.active.replace(source)
    }

    /// Drop the active source and return every setting to its default.
    pub fn clear(&mut self) -> Option<SourceImage> {
        self.settings = ResizeSettings::default();
        self.estimates.reset();
        self.active.take()
    }

    /// Route one width / height / percentage edit through the sync rules.
    pub fn apply(&mut self, change: DimensionChange) -> Result<DimensionState, SessionError> {
        let intrinsic = self
            .active
            .as_ref()
            .ok_or(SessionError::NoActiveSource)?
            .dimensions();
        self.settings.apply(change, intrinsic);
        Ok(self.settings.dimensions())
    }

    /// Switch the driving input. Values are kept; the next edit derives from them.
    pub fn set_mode(&mut self, mode: ResizeMode) {
        self.settings.mode = mode;
    }

    /// Toggle the aspect-ratio lock. Takes effect on the next edit.
    pub fn set_locked(&mut self, locked: bool) {
        self.settings.aspect_ratio_locked = locked;
    }

    pub fn set_quality(&mut self, quality: QualityPreset) {
        self.settings.quality = quality;
    }

    pub fn set_format(&mut self, format: Option<OutputFormat>) {
        self.settings.format = format;
    }

    pub fn set_adjust(&mut self, adjust: ColorAdjust) {
        self.settings.adjust = adjust;
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.settings.geometry = geometry;
    }

    /// `None` (or a non-positive value) encodes at the preset's quality.
    pub fn set_target_size_kb(&mut self, target_kb: Option<f64>) {
        self.settings.target_size_kb = target_kb.filter(|kb| *kb > 0.0);
    }

    /// Start an estimate for the current size and preset. Any estimate still
    /// in flight becomes stale.
    pub fn request_estimate(&self) -> Option<EstimateRequest> {
        self.active.as_ref()?;
        Some(EstimateRequest {
            ticket: self.estimates.begin(),
            width: self.settings.width as i64,
            height: self.settings.height as i64,
            preset: self.settings.quality,
        })
    }

    /// Deliver an estimate. Returns whether it is now displayed.
    pub fn complete_estimate(&self, ticket: EstimateTicket, estimate: Estimate) -> bool {
        self.estimates.complete(ticket, estimate)
    }

    /// Request, compute and deliver an estimate in one step.
    pub fn refresh_estimate(&self, estimator: &dyn SizeEstimator) -> Option<Estimate> {
        let request = self.request_estimate()?;
        let estimate =
            estimate_or_fallback(estimator, request.width, request.height, request.preset);
        self.complete_estimate(request.ticket, estimate);
        self.displayed_estimate()
    }

    pub fn displayed_estimate(&self) -> Option<Estimate> {
        self.estimates.current()
    }

    /// Render and encode the active source at the displayed size.
    pub fn produce(&self, backend: &impl ImageBackend) -> Result<EncodedArtifact, SessionError> {
        let source = self.active.as_ref().ok_or(SessionError::NoActiveSource)?;
        Ok(encode_artifact(backend, source, &self.settings)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::FormulaEstimator;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::{Dimensions, SeekStatus};
    use crate::test_helpers::gradient_source;

    fn session_with(width: u32, height: u32, mode: ResizeMode) -> EditingSession {
        let mut session = EditingSession::new(ResizeSettings {
            mode,
            ..ResizeSettings::default()
        });
        session.set_active(gradient_source("photo.png", width, height));
        session
    }

    fn triple(state: DimensionState) -> (u32, u32, u32) {
        (state.width, state.height, state.percentage)
    }

    // =========================================================================
    // activation
    // =========================================================================

    #[test]
    fn activation_resets_to_intrinsic() {
        let mut session = session_with(800, 600, ResizeMode::Percentage);
        session.apply(DimensionChange::Percentage(25)).unwrap();

        let previous = session.set_active(gradient_source("b.png", 300, 200));
        assert_eq!(previous.unwrap().name(), "photo.png");
        assert_eq!(triple(session.dimensions()), (300, 200, 100));
    }

    #[test]
    fn edits_need_an_active_source() {
        let mut session = EditingSession::default();
        assert!(matches!(
            session.apply(DimensionChange::Width(10)),
            Err(SessionError::NoActiveSource)
        ));
        assert!(session.request_estimate().is_none());
        assert!(matches!(
            session.produce(&MockBackend::new()),
            Err(SessionError::NoActiveSource)
        ));
    }

    #[test]
    fn clear_restores_defaults() {
        let mut session = session_with(800, 600, ResizeMode::Dimensions);
        session.set_quality(QualityPreset::High);
        assert!(session.clear().is_some());
        assert!(session.active().is_none());
        assert_eq!(session.settings(), &ResizeSettings::default());
    }

    // =========================================================================
    // dimension edits
    // =========================================================================

    #[test]
    fn percentage_edit_scales_the_active_source() {
        let mut session = session_with(800, 600, ResizeMode::Percentage);
        let state = session.apply(DimensionChange::Percentage(50)).unwrap();
        assert_eq!(triple(state), (400, 300, 50));
    }

    #[test]
    fn unlocking_lets_sides_move_independently() {
        let mut session = session_with(800, 600, ResizeMode::Dimensions);
        session.apply(DimensionChange::Width(400)).unwrap();
        assert_eq!(triple(session.dimensions()), (400, 300, 50));

        session.set_locked(false);
        let state = session.apply(DimensionChange::Height(100)).unwrap();
        assert_eq!(triple(state), (400, 100, 50));
    }

    #[test]
    fn mode_switch_keeps_values() {
        let mut session = session_with(800, 600, ResizeMode::Dimensions);
        session.apply(DimensionChange::Width(200)).unwrap();
        session.set_mode(ResizeMode::Percentage);
        assert_eq!(triple(session.dimensions()), (200, 150, 25));

        let state = session.apply(DimensionChange::Percentage(10)).unwrap();
        assert_eq!(triple(state), (80, 60, 10));
    }

    // =========================================================================
    // estimates
    // =========================================================================

    #[test]
    fn estimate_for_current_size() {
        let mut session = session_with(800, 600, ResizeMode::Percentage);
        session.apply(DimensionChange::Percentage(50)).unwrap();

        let request = session.request_estimate().unwrap();
        assert_eq!((request.width, request.height), (400, 300));
        assert_eq!(request.preset, QualityPreset::Medium);

        let shown = session.refresh_estimate(&FormulaEstimator).unwrap();
        assert_eq!(
            shown.estimated_kb,
            FormulaEstimator::estimate_kb(400, 300, QualityPreset::Medium)
        );
    }

    #[test]
    fn stale_estimate_is_not_displayed() {
        let session = session_with(800, 600, ResizeMode::Percentage);
        let old = session.request_estimate().unwrap();
        let new = session.request_estimate().unwrap();

        let value = |kb| Estimate {
            estimated_kb: kb,
            note: None,
        };
        assert!(session.complete_estimate(new.ticket, value(2.0)));
        assert!(!session.complete_estimate(old.ticket, value(1.0)));
        assert_eq!(session.displayed_estimate().unwrap().estimated_kb, 2.0);
    }

    #[test]
    fn switching_source_clears_the_estimate() {
        let mut session = session_with(800, 600, ResizeMode::Percentage);
        let pending = session.request_estimate().unwrap();
        session.set_active(gradient_source("next.png", 10, 10));

        let late = Estimate {
            estimated_kb: 9.0,
            note: None,
        };
        assert!(!session.complete_estimate(pending.ticket, late));
        assert!(session.displayed_estimate().is_none());
    }

    // =========================================================================
    // produce
    // =========================================================================

    #[test]
    fn produce_uses_live_settings() {
        let mut session = session_with(64, 48, ResizeMode::Percentage);
        session.apply(DimensionChange::Percentage(50)).unwrap();
        session.set_format(Some(OutputFormat::Jpeg));
        session.set_target_size_kb(Some(70.0));

        let artifact = session.produce(&MockBackend::new()).unwrap();
        assert_eq!(
            Dimensions {
                width: artifact.width,
                height: artifact.height
            },
            Dimensions {
                width: 32,
                height: 24
            }
        );
        assert_eq!(artifact.file_name, "photo-32x24.jpeg");
        assert_eq!(artifact.seek.unwrap().status, SeekStatus::Converged);
    }

    #[test]
    fn produce_keeps_displayed_size_after_relocking() {
        let mut session = session_with(800, 600, ResizeMode::Dimensions);
        session.apply(DimensionChange::Width(400)).unwrap();
        session.set_locked(false);
        session.apply(DimensionChange::Height(100)).unwrap();
        session.set_locked(true);

        let shown = session.dimensions();
        assert_eq!((shown.width, shown.height), (400, 100));

        let artifact = session.produce(&MockBackend::new()).unwrap();
        assert_eq!((artifact.width, artifact.height), (shown.width, shown.height));
        assert_eq!(artifact.file_name, "photo-400x100.png");
    }

    #[test]
    fn non_positive_target_is_cleared() {
        let mut session = EditingSession::default();
        session.set_target_size_kb(Some(0.0));
        assert_eq!(session.settings().target_size_kb, None);
    }
}
