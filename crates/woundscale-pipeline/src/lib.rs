#![deny(missing_docs)]
//! # Woundscale Pipeline
//!
//! Runs a captured frame through calibration, the quality gate, the external
//! segmentation model and the measurement engine, and hands the finished assessment to a
//! store.

use log::{debug, info, warn};
use rayon::prelude::*;
use woundscale_calib::{manual_calibration, CalibrationDetector, CalibrationResult};
use woundscale_measure::{calculate_measurements, validate_measurement, MeasurementConfig};
use woundscale_quality::QualityAssessor;

/// Error types for the pipeline.
pub mod errors;

/// Pipeline configuration.
pub mod config;

/// Segmentation and storage collaborators.
pub mod collaborators;

/// Assessment requests and records.
pub mod record;

/// Live calibration preview.
pub mod preview;

pub use crate::collaborators::{AssessmentStore, InMemoryStore, Segmenter};
pub use crate::config::{PipelineConfig, PreviewConfig};
pub use crate::errors::PipelineError;
pub use crate::preview::{preview_frame, CalibrationPreview, FrameSource};
pub use crate::record::{
    healing_report, AssessmentRequest, HealingReport, ManualReference, WoundAssessment,
};

/// Sequential assessment of captured frames.
///
/// Each stage runs only if the previous one succeeded: calibration, quality gate,
/// segmentation, measurement, optional depth, plausibility checks and storage.
pub struct AssessmentPipeline<S, T> {
    detector: CalibrationDetector,
    assessor: QualityAssessor,
    measurement: MeasurementConfig,
    segmenter: S,
    store: T,
}

impl<S: Segmenter, T: AssessmentStore> AssessmentPipeline<S, T> {
    /// Creates a pipeline from a configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Detector, quality and measurement configuration.
    /// * `segmenter` - The wound segmentation model.
    /// * `store` - Receives every finished assessment.
    pub fn new(config: PipelineConfig, segmenter: S, store: T) -> Self {
        let PipelineConfig {
            detector,
            quality,
            measurement,
            ..
        } = config;
        Self::with_components(
            CalibrationDetector::new(detector),
            QualityAssessor::new(quality),
            measurement,
            segmenter,
            store,
        )
    }

    /// Creates a pipeline from already built stages.
    pub fn with_components(
        detector: CalibrationDetector,
        assessor: QualityAssessor,
        measurement: MeasurementConfig,
        segmenter: S,
        store: T,
    ) -> Self {
        Self {
            detector,
            assessor,
            measurement,
            segmenter,
            store,
        }
    }

    /// The store the pipeline writes to.
    pub fn store(&self) -> &T {
        &self.store
    }

    /// The quality assessor, e.g. to turn a rejected report into advice.
    pub fn assessor(&self) -> &QualityAssessor {
        &self.assessor
    }

    /// Finds the scale of a frame, from the manual reference if there is one.
    pub fn calibrate(
        &self,
        request: &AssessmentRequest,
    ) -> Result<CalibrationResult, PipelineError> {
        let calibration = match request.manual_reference {
            Some(r) => manual_calibration(r.from, r.to, r.distance_cm)?,
            None => self.detector.detect(&request.image)?,
        };
        if !calibration.is_valid() {
            return Err(PipelineError::CalibrationUnavailable);
        }
        Ok(calibration)
    }

    /// Assesses one captured frame.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::CalibrationUnavailable`] if no scale could be found.
    /// * [`PipelineError::QualityRejected`] if the quality checks failed and the request
    ///   does not override them.
    /// * [`PipelineError::SegmentationSizeMismatch`] if the mask does not match the frame.
    /// * Any error of the segmenter, the measurement or the store.
    pub fn assess(&self, request: &AssessmentRequest) -> Result<WoundAssessment, PipelineError> {
        let wound_id = request.wound_id.as_str();

        let calibration = self.calibrate(request)?;
        debug!(
            "{wound_id}: calibrated by {:?} at {:.3}px/cm",
            calibration.marker_kind(),
            calibration.pixels_per_cm
        );

        let quality = self.assessor.assess(&request.image, &calibration)?;
        let quality_overridden = !quality.passed && request.override_quality;
        if !quality.passed {
            if !request.override_quality {
                warn!("{wound_id}: frame rejected by the quality checks");
                return Err(PipelineError::QualityRejected(Box::new(quality)));
            }
            warn!("{wound_id}: failed quality checks overridden");
        }

        let segmentation = self.segmenter.segment(&request.image)?;
        if segmentation.size() != request.image.size() {
            return Err(PipelineError::SegmentationSizeMismatch {
                image: request.image.size(),
                mask: segmentation.size(),
            });
        }

        let mut measurement = calculate_measurements(&segmentation, &calibration, &self.measurement)?;
        if let Some(depth) = request.depth_cm {
            measurement = measurement.with_depth(depth, self.measurement.volume_coefficient)?;
        }

        let warnings = validate_measurement(&measurement, &self.measurement.limits);
        for warning in &warnings {
            warn!("{wound_id}: {warning}");
        }

        let assessment = WoundAssessment {
            wound_id: request.wound_id.clone(),
            captured_at: request.captured_at,
            calibration,
            quality,
            quality_overridden,
            measurement,
            warnings,
            contour: segmentation.contour,
            segmentation_confidence: segmentation.confidence,
        };
        self.store.save(assessment.clone())?;

        info!(
            "{wound_id}: {:.2}cm² ({:.2} x {:.2}cm) captured at {}",
            assessment.measurement.area_cm2,
            assessment.measurement.length_cm,
            assessment.measurement.width_cm,
            assessment.captured_at
        );
        Ok(assessment)
    }

    /// Assesses several frames in parallel.
    ///
    /// Every job owns its frame, the results are in the order of the requests.
    pub fn assess_batch(
        &self,
        requests: &[AssessmentRequest],
    ) -> Vec<Result<WoundAssessment, PipelineError>> {
        requests.par_iter().map(|r| self.assess(r)).collect()
    }
}
