use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use woundscale_calib::DetectorConfig;
use woundscale_measure::MeasurementConfig;
use woundscale_quality::QualityThresholds;

use crate::errors::PipelineError;

/// Configuration of the live calibration preview.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Time between two polls of the frame source in milliseconds.
    pub interval_ms: u64,
    /// Integer factor the preview frames are downsampled by.
    pub downsample_factor: usize,
}

impl PreviewConfig {
    /// The polling interval.
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            downsample_factor: 4,
        }
    }
}

/// Configuration of every stage of the assessment pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Calibration detection.
    pub detector: DetectorConfig,
    /// Quality gate.
    pub quality: QualityThresholds,
    /// Measurement and plausibility checks.
    pub measurement: MeasurementConfig,
    /// Live preview.
    pub preview: PreviewConfig,
}

impl PipelineConfig {
    /// Parses a configuration from JSON, missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
