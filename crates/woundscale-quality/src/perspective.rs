use serde::{Deserialize, Serialize};
use woundscale_calib::{CalibrationResult, Marker};

/// Degrees of distortion per unit coefficient of variation of the tick spacing.
pub const DEGREES_PER_CV: f64 = 45.0;

/// Outcome of the perspective check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCheck {
    /// Estimated distortion in degrees.
    pub distortion_degrees: f64,
    /// Whether the distortion is within the tolerated maximum.
    pub corrected: bool,
}

/// Estimates the perspective distortion from the regularity of the ruler ticks.
///
/// Evenly spaced ticks mean the ruler is parallel to the sensor. Only a ruler with at
/// least three reference points can be assessed; any other calibration reports no
/// distortion and `corrected = false`.
///
/// # Arguments
///
/// * `calibration` - The calibration of the frame.
/// * `max_distortion` - The maximum tolerated distortion in degrees.
pub fn check_perspective(calibration: &CalibrationResult, max_distortion: f64) -> PerspectiveCheck {
    let is_ruler = matches!(calibration.marker, Some(Marker::Ruler { .. }));
    let points = &calibration.reference_points;
    if !is_ruler || points.len() < 3 {
        return PerspectiveCheck {
            distortion_degrees: 0.0,
            corrected: false,
        };
    }

    let spacings: Vec<f64> = points.windows(2).map(|w| w[0].distance(&w[1])).collect();
    let n = spacings.len() as f64;
    let mean = spacings.iter().sum::<f64>() / n;
    let cv = if mean > 0.0 {
        let var = spacings.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        var.sqrt() / mean
    } else {
        0.0
    };
    let distortion_degrees = cv * DEGREES_PER_CV;

    PerspectiveCheck {
        distortion_degrees,
        corrected: distortion_degrees <= max_distortion,
    }
}
