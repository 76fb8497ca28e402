use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use woundscale_calib::CalibrationResult;
use woundscale_image::{Point, RasterImage};
use woundscale_measure::{
    healing_progress, wound_analytics, AreaObservation, HealingProgressPoint, MeasurementWarning,
    WoundAnalytics, WoundMeasurement,
};
use woundscale_quality::QualityReport;

use crate::collaborators::AssessmentStore;
use crate::errors::PipelineError;

/// Two points of known physical distance picked by the operator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManualReference {
    /// First point.
    pub from: Point,
    /// Second point.
    pub to: Point,
    /// Distance between the points in centimeters.
    pub distance_cm: f64,
}

/// A captured frame to assess.
#[derive(Clone, Debug)]
pub struct AssessmentRequest {
    /// The wound the frame shows.
    pub wound_id: String,
    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
    /// The captured frame.
    pub image: RasterImage,
    /// Replaces marker detection when set.
    pub manual_reference: Option<ManualReference>,
    /// Manually measured depth in centimeters.
    pub depth_cm: Option<f64>,
    /// Continue even if the quality checks fail.
    pub override_quality: bool,
}

impl AssessmentRequest {
    /// Creates a request with marker detection, no depth and the quality gate enabled.
    pub fn new(wound_id: impl Into<String>, captured_at: DateTime<Utc>, image: RasterImage) -> Self {
        Self {
            wound_id: wound_id.into(),
            captured_at,
            image,
            manual_reference: None,
            depth_cm: None,
            override_quality: false,
        }
    }

    /// Uses a manual reference instead of marker detection.
    pub fn with_manual_reference(mut self, reference: ManualReference) -> Self {
        self.manual_reference = Some(reference);
        self
    }

    /// Appends a manually measured depth.
    pub fn with_depth(mut self, depth_cm: f64) -> Self {
        self.depth_cm = Some(depth_cm);
        self
    }

    /// Continues past failed quality checks.
    pub fn with_quality_override(mut self) -> Self {
        self.override_quality = true;
        self
    }
}

/// A finished assessment, as handed to the [`AssessmentStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WoundAssessment {
    /// The wound the frame shows.
    pub wound_id: String,
    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
    /// The scale used for the measurement.
    pub calibration: CalibrationResult,
    /// The quality checks of the frame.
    pub quality: QualityReport,
    /// Whether the operator overrode failed quality checks.
    pub quality_overridden: bool,
    /// The measurement.
    pub measurement: WoundMeasurement,
    /// Plausibility warnings of the measurement.
    pub warnings: Vec<MeasurementWarning>,
    /// Wound boundary from the segmentation.
    pub contour: Vec<Point>,
    /// Confidence of the segmentation.
    pub segmentation_confidence: f64,
}

/// Healing progress and analytics of one wound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealingReport {
    /// The wound.
    pub wound_id: String,
    /// Progress per assessment in chronological order.
    pub progress: Vec<HealingProgressPoint>,
    /// Aggregate figures, `None` without assessments.
    pub analytics: Option<WoundAnalytics>,
}

/// Builds the healing report of a wound from its stored assessments.
///
/// # Arguments
///
/// * `store` - The assessment store.
/// * `wound_id` - The wound.
/// * `onset` - When the wound appeared.
/// * `now` - The reference time for the days since onset.
pub fn healing_report<S: AssessmentStore + ?Sized>(
    store: &S,
    wound_id: &str,
    onset: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<HealingReport, PipelineError> {
    let observations: Vec<AreaObservation> = store
        .assessments(wound_id)?
        .iter()
        .map(|a| AreaObservation::new(a.captured_at, a.measurement.area_cm2))
        .collect();
    let progress = healing_progress(&observations);
    let analytics = wound_analytics(&progress, onset, now);
    Ok(HealingReport {
        wound_id: wound_id.to_string(),
        progress,
        analytics,
    })
}
