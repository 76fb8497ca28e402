use log::debug;
use serde::{Deserialize, Serialize};
use woundscale_calib::CalibrationResult;

use crate::errors::MeasurementError;
use crate::geometry::{closed_perimeter, convex_hull, min_area_rect};
use crate::segmentation::SegmentationResult;
use crate::MeasurementConfig;

/// Rounds to a fixed number of decimals.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Physical dimensions of a wound.
///
/// Depth is entered by the clinician and can be appended once with
/// [`WoundMeasurement::with_depth`], which also derives the volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WoundMeasurement {
    /// Area in cm².
    pub area_cm2: f64,
    /// Long side of the minimum area bounding rectangle in cm.
    pub length_cm: f64,
    /// Short side of the minimum area bounding rectangle in cm.
    pub width_cm: f64,
    /// Length of the closed boundary in cm.
    pub perimeter_cm: f64,
    /// Depth in cm.
    pub depth_cm: Option<f64>,
    /// Volume in cm³.
    pub volume_cm3: Option<f64>,
}

impl WoundMeasurement {
    /// Appends a manually measured depth and the volume derived from it.
    ///
    /// `volume = coefficient * area * depth`, rounded to two decimals. The depth is
    /// kept as given.
    ///
    /// # Errors
    ///
    /// [`MeasurementError::DepthAlreadySet`] if a depth was appended before and
    /// [`MeasurementError::InvalidDepth`] if the depth is not positive and finite.
    pub fn with_depth(self, depth_cm: f64, coefficient: f64) -> Result<Self, MeasurementError> {
        if self.depth_cm.is_some() {
            return Err(MeasurementError::DepthAlreadySet);
        }
        if !(depth_cm.is_finite() && depth_cm > 0.0) {
            return Err(MeasurementError::InvalidDepth(depth_cm));
        }
        let volume = round_to(coefficient * self.area_cm2 * depth_cm, 2);
        Ok(Self {
            depth_cm: Some(depth_cm),
            volume_cm3: Some(volume),
            ..self
        })
    }
}

/// Converts a segmentation into physical measurements.
///
/// The area counts the mask pixels above the foreground threshold, the perimeter walks
/// the closed contour, and length and width are the sides of the minimum area rectangle
/// around the convex hull of the contour. Everything is rounded to two decimals.
///
/// # Arguments
///
/// * `segmentation` - The wound mask and contour.
/// * `calibration` - The scale of the frame.
/// * `config` - The measurement configuration.
///
/// # Errors
///
/// [`MeasurementError::InvalidCalibration`] unless the calibration was detected with a
/// positive finite scale.
pub fn calculate_measurements(
    segmentation: &SegmentationResult,
    calibration: &CalibrationResult,
    config: &MeasurementConfig,
) -> Result<WoundMeasurement, MeasurementError> {
    let ppcm = calibration.pixels_per_cm;
    if !calibration.detected || !(ppcm.is_finite() && ppcm > 0.0) {
        return Err(MeasurementError::InvalidCalibration {
            detected: calibration.detected,
            pixels_per_cm: ppcm,
        });
    }

    let pixels = segmentation.foreground_pixels(config.foreground_threshold);
    let perimeter_px = closed_perimeter(&segmentation.contour);
    let hull = convex_hull(&segmentation.contour);
    let rect = min_area_rect(&hull);
    debug!(
        "{pixels} foreground pixels, hull of {} points, rect {:.1}x{:.1}px",
        hull.len(),
        rect.long_side(),
        rect.short_side()
    );

    Ok(WoundMeasurement {
        area_cm2: round_to(pixels as f64 / (ppcm * ppcm), 2),
        length_cm: round_to(rect.long_side() / ppcm, 2),
        width_cm: round_to(rect.short_side() / ppcm, 2),
        perimeter_cm: round_to(perimeter_px / ppcm, 2),
        depth_cm: None,
        volume_cm3: None,
    })
}
