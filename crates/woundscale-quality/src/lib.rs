#![deny(missing_docs)]
//! # Woundscale Quality
//!
//! Scores blur, lighting and perspective of a frame and decides whether a measurement
//! taken from it can be trusted.

use log::debug;
use serde::{Deserialize, Serialize};
use woundscale_calib::CalibrationResult;
use woundscale_image::{GrayscaleField, RasterImage};
use woundscale_imgproc::color::to_grayscale;

/// Error types for the quality checks.
pub mod errors;

/// Sharpness check.
pub mod blur;

/// Exposure check.
pub mod lighting;

/// Perspective check.
pub mod perspective;

pub use crate::blur::{check_blur, BlurCheck};
pub use crate::errors::QualityError;
pub use crate::lighting::{check_lighting, LightingCheck, LightingIssue};
pub use crate::perspective::{check_perspective, PerspectiveCheck};

/// Pass thresholds of the quality checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum sharpness score.
    pub min_blur_score: f64,
    /// Minimum lighting score.
    pub min_lighting_score: f64,
    /// Minimum calibration confidence.
    pub min_calibration_confidence: f64,
    /// Maximum perspective distortion in degrees.
    pub max_perspective_distortion: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_blur_score: 0.7,
            min_lighting_score: 0.6,
            min_calibration_confidence: 0.8,
            max_perspective_distortion: 15.0,
        }
    }
}

/// Calibration as seen by the quality report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCheck {
    /// Whether a marker was detected.
    pub detected: bool,
    /// Confidence of the calibration.
    pub confidence: f64,
}

/// The combined outcome of all quality checks of a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Whether every check passed.
    pub passed: bool,
    /// Sharpness.
    pub blur: BlurCheck,
    /// Exposure.
    pub lighting: LightingCheck,
    /// Calibration.
    pub calibration: CalibrationCheck,
    /// Perspective.
    pub perspective: PerspectiveCheck,
}

/// Runs the quality checks of a frame against fixed thresholds.
#[derive(Clone, Debug, Default)]
pub struct QualityAssessor {
    thresholds: QualityThresholds,
}

impl QualityAssessor {
    /// Creates an assessor with the given thresholds.
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Returns the thresholds of the assessor.
    #[inline]
    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Runs all checks on an RGBA frame.
    ///
    /// # Arguments
    ///
    /// * `image` - The captured frame.
    /// * `calibration` - The calibration detected on the same frame.
    pub fn assess(
        &self,
        image: &RasterImage,
        calibration: &CalibrationResult,
    ) -> Result<QualityReport, QualityError> {
        let gray = to_grayscale(image)?;
        self.assess_gray(&gray, calibration)
    }

    /// Runs all checks on the luma of a frame.
    pub fn assess_gray(
        &self,
        gray: &GrayscaleField,
        calibration: &CalibrationResult,
    ) -> Result<QualityReport, QualityError> {
        let t = &self.thresholds;

        let blur = check_blur(gray, t.min_blur_score)?;
        debug!("blur: score {:.3} passed {}", blur.score, blur.passed);

        let lighting = check_lighting(gray, t.min_lighting_score)?;
        debug!(
            "lighting: score {:.3} issues {:?} passed {}",
            lighting.score, lighting.issues, lighting.passed
        );

        let perspective = check_perspective(calibration, t.max_perspective_distortion);
        debug!(
            "perspective: {:.2} degrees corrected {}",
            perspective.distortion_degrees, perspective.corrected
        );

        let calibration = CalibrationCheck {
            detected: calibration.detected,
            confidence: calibration.confidence,
        };

        let passed = blur.passed
            && lighting.passed
            && calibration.detected
            && calibration.confidence >= t.min_calibration_confidence
            && perspective.corrected;

        Ok(QualityReport {
            passed,
            blur,
            lighting,
            calibration,
            perspective,
        })
    }

    /// Advice for every failing check of a report.
    pub fn recommendations(&self, report: &QualityReport) -> Vec<String> {
        let mut advice: Vec<&str> = Vec::new();

        if !report.blur.passed {
            advice.push("Hold the camera steady and tap to focus before capturing");
        }

        if !report.lighting.passed {
            advice.extend(report.lighting.issues.iter().map(LightingIssue::advice));
            if report.lighting.issues.is_empty() {
                advice.push("Improve the lighting so the wound is evenly lit");
            }
        }

        if !report.calibration.detected {
            advice.push("Place a ruler, circle or grid marker next to the wound");
        } else if report.calibration.confidence < self.thresholds.min_calibration_confidence {
            advice.push("Make sure the whole calibration marker is visible and in focus");
        }

        if !report.perspective.corrected {
            advice.push(
                "Hold the camera parallel to the wound and place the ruler on the same plane as the wound",
            );
        }

        advice.into_iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use woundscale_calib::Marker;
    use woundscale_image::Point;

    fn checker(size: usize, dark: u8, light: u8) -> Result<RasterImage, QualityError> {
        let mut image = RasterImage::from_size_val([size, size].into(), 255)?;
        for y in 0..size {
            for x in 0..size {
                let v = if (x + y) % 2 == 0 { dark } else { light };
                for ch in 0..3 {
                    image.set_pixel(x, y, ch, v)?;
                }
            }
        }
        Ok(image)
    }

    fn even_ruler(confidence: f64) -> CalibrationResult {
        let points = (0..5).map(|i| Point::new(20.0 * i as f64, 10.0)).collect();
        let marker = Marker::Ruler {
            angle: 0.0,
            tick_spacing_px: 20.0,
            tick_count: 5,
        };
        CalibrationResult::new(20.0, confidence, marker, points)
    }

    #[test]
    fn test_good_frame_passes() -> Result<(), QualityError> {
        let assessor = QualityAssessor::default();
        let report = assessor.assess(&checker(32, 60, 200)?, &even_ruler(0.95))?;
        assert!(report.blur.passed);
        assert!(report.lighting.passed);
        assert!(report.perspective.corrected);
        assert!(report.passed);
        assert!(assessor.recommendations(&report).is_empty());
        Ok(())
    }

    #[test]
    fn test_dark_frame_fails() -> Result<(), QualityError> {
        // average brightness 30 but sharp and well calibrated
        let assessor = QualityAssessor::default();
        let report = assessor.assess(&checker(32, 0, 60)?, &even_ruler(0.95))?;
        assert!(report.blur.passed);
        assert!(report.calibration.detected);
        assert!((report.lighting.average - 30.0).abs() < 1e-9);
        assert!(report.lighting.issues.contains(&LightingIssue::TooDark));
        assert!(!report.passed);

        let advice = assessor.recommendations(&report);
        assert!(advice
            .iter()
            .any(|a| a == "Increase ambient lighting or move to a brighter area"));
        Ok(())
    }

    #[test]
    fn test_low_calibration_confidence_fails() -> Result<(), QualityError> {
        let assessor = QualityAssessor::default();
        let report = assessor.assess(&checker(32, 60, 200)?, &even_ruler(0.5))?;
        assert!(!report.passed);
        assert_eq!(
            assessor.recommendations(&report),
            vec!["Make sure the whole calibration marker is visible and in focus".to_string()]
        );
        Ok(())
    }

    #[test]
    fn test_undetected_calibration_fails() -> Result<(), QualityError> {
        let assessor = QualityAssessor::new(QualityThresholds::default());
        let report = assessor.assess(&checker(16, 60, 200)?, &CalibrationResult::undetected())?;
        assert!(!report.calibration.detected);
        assert!(!report.perspective.corrected);
        assert!(!report.passed);
        assert_eq!(assessor.recommendations(&report).len(), 2);
        Ok(())
    }
}
