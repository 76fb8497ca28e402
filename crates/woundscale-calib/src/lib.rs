#![deny(missing_docs)]
//! # Woundscale Calibration
//!
//! Detects a physical scale marker in a frame and derives its pixels per centimeter.

use log::debug;
use serde::{Deserialize, Serialize};
use woundscale_image::RasterImage;

/// Error types for calibration.
pub mod errors;

/// Preprocessing shared by the marker hypotheses.
pub mod frame;

/// Marker and calibration result types.
pub mod marker;

/// Ruler hypothesis.
pub mod ruler;

/// Circle hypothesis.
pub mod circle;

/// Grid hypothesis.
pub mod grid;

mod manual;

pub use crate::circle::{CircleConfig, CircleDetector};
pub use crate::errors::CalibrationError;
pub use crate::frame::EdgeFrame;
pub use crate::grid::{GridConfig, GridDetector};
pub use crate::manual::manual_calibration;
pub use crate::marker::{CalibrationResult, Marker, MarkerKind};
pub use crate::ruler::{RulerConfig, RulerDetector};

/// Physical dimensions of the supported markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSpecs {
    /// Distance between consecutive ruler ticks in centimeters.
    pub ruler_tick_spacing_cm: f64,
    /// Minimum number of ticks for a ruler to be accepted.
    pub ruler_min_ticks: usize,
    /// Diameter of the circle marker in centimeters.
    pub circle_diameter_cm: f64,
    /// Side of a grid cell in centimeters.
    pub grid_cell_size_cm: f64,
    /// Minimum number of grid cells, four corners are expected per cell.
    pub grid_min_cells: usize,
}

impl Default for MarkerSpecs {
    fn default() -> Self {
        Self {
            ruler_tick_spacing_cm: 1.0,
            ruler_min_ticks: 5,
            circle_diameter_cm: 2.5,
            grid_cell_size_cm: 1.0,
            grid_min_cells: 4,
        }
    }
}

/// Configuration of the calibration detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Physical marker dimensions.
    pub markers: MarkerSpecs,
    /// A hypothesis whose confidence exceeds this value is accepted immediately.
    pub accept_confidence: f64,
    /// Ruler hypothesis parameters.
    pub ruler: RulerConfig,
    /// Circle hypothesis parameters.
    pub circle: CircleConfig,
    /// Grid hypothesis parameters.
    pub grid: GridConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            markers: MarkerSpecs::default(),
            accept_confidence: 0.8,
            ruler: RulerConfig::default(),
            circle: CircleConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

/// A single marker hypothesis.
pub trait MarkerDetector: Send + Sync {
    /// The kind of marker this hypothesis looks for.
    fn kind(&self) -> MarkerKind;

    /// Fits the marker to a preprocessed frame.
    ///
    /// A missing marker is reported as [`CalibrationResult::undetected`], not as an error.
    fn detect(&self, frame: &EdgeFrame) -> Result<CalibrationResult, CalibrationError>;
}

/// Tries marker hypotheses in priority order.
///
/// The first hypothesis whose confidence exceeds the accept confidence wins. Otherwise
/// the most confident candidate is returned, and an undetected result if every
/// hypothesis has zero confidence.
pub struct CalibrationDetector {
    detectors: Vec<Box<dyn MarkerDetector>>,
    accept_confidence: f64,
}

impl CalibrationDetector {
    /// Creates a detector trying a ruler, a circle and a grid, in that order.
    pub fn new(config: DetectorConfig) -> Self {
        let DetectorConfig {
            markers,
            accept_confidence,
            ruler,
            circle,
            grid,
        } = config;
        let detectors: Vec<Box<dyn MarkerDetector>> = vec![
            Box::new(RulerDetector::new(ruler, &markers)),
            Box::new(CircleDetector::new(circle, &markers)),
            Box::new(GridDetector::new(grid, &markers)),
        ];
        Self::with_detectors(detectors, accept_confidence)
    }

    /// Creates a detector from custom hypotheses, highest priority first.
    pub fn with_detectors(
        detectors: Vec<Box<dyn MarkerDetector>>,
        accept_confidence: f64,
    ) -> Self {
        Self {
            detectors,
            accept_confidence,
        }
    }

    /// The marker kinds tried, in priority order.
    pub fn priority(&self) -> Vec<MarkerKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    /// Detects the scale marker of a frame.
    ///
    /// # Arguments
    ///
    /// * `image` - The captured RGBA frame.
    ///
    /// # Returns
    ///
    /// The calibration, with `detected = false` if no marker was found.
    pub fn detect(&self, image: &RasterImage) -> Result<CalibrationResult, CalibrationError> {
        let frame = EdgeFrame::new(image)?;
        self.detect_frame(&frame)
    }

    /// Detects the scale marker of an already preprocessed frame.
    pub fn detect_frame(&self, frame: &EdgeFrame) -> Result<CalibrationResult, CalibrationError> {
        let mut best: Option<CalibrationResult> = None;

        for detector in &self.detectors {
            let candidate = detector.detect(frame)?;
            debug!(
                "{}: detected {} confidence {:.3} scale {:.3}px/cm",
                detector.kind(),
                candidate.detected,
                candidate.confidence,
                candidate.pixels_per_cm
            );
            if !candidate.is_valid() {
                continue;
            }
            if candidate.confidence > self.accept_confidence {
                return Ok(candidate);
            }
            let improves = best
                .as_ref()
                .map_or(true, |b| candidate.confidence > b.confidence);
            if candidate.confidence > 0.0 && improves {
                best = Some(candidate);
            }
        }

        Ok(best.unwrap_or_else(CalibrationResult::undetected))
    }
}

impl Default for CalibrationDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
