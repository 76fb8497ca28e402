#![deny(missing_docs)]
//! # Woundscale Measure
//!
//! Turns a wound segmentation and a calibrated scale into physical measurements, flags
//! implausible results and derives healing analytics from a series of measurements.

use serde::{Deserialize, Serialize};

/// Error types for the measurement module.
pub mod errors;

/// Convex hull, rotating calipers and polygon helpers.
pub mod geometry;

/// The segmentation model output.
pub mod segmentation;

/// Area, length, width, perimeter and volume.
pub mod measurement;

/// Plausibility checks.
pub mod validation;

/// Healing progress and trend analytics.
pub mod analytics;

pub use crate::analytics::{
    classify_trend, healing_progress, wound_analytics, AreaObservation, HealingProgressPoint,
    HealingTrend, WoundAnalytics,
};
pub use crate::errors::MeasurementError;
pub use crate::geometry::{closed_perimeter, convex_hull, min_area_rect, polygon_area, RotatedRect};
pub use crate::measurement::{calculate_measurements, WoundMeasurement};
pub use crate::segmentation::SegmentationResult;
pub use crate::validation::{validate_measurement, MeasurementWarning, PlausibilityLimits};

/// Configuration of the measurement step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Mask values above this threshold belong to the wound.
    pub foreground_threshold: f32,
    /// Factor relating area times depth to volume.
    pub volume_coefficient: f64,
    /// Plausibility bounds.
    pub limits: PlausibilityLimits,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            foreground_threshold: 0.5,
            volume_coefficient: 0.327,
            limits: PlausibilityLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_partial_json() -> Result<(), serde_json::Error> {
        let json = r#"{"volume_coefficient": 0.3, "limits": {"max_area_cm2": 500}}"#;
        let config: MeasurementConfig = serde_json::from_str(json)?;
        assert_eq!(config.volume_coefficient, 0.3);
        assert_eq!(config.foreground_threshold, 0.5);
        assert_eq!(config.limits.max_area_cm2, 500.0);
        assert_eq!(config.limits.max_aspect_ratio, 10.0);
        Ok(())
    }
}
