use log::debug;
use serde::{Deserialize, Serialize};
use woundscale_imgproc::features::harris_corners;

use crate::{
    errors::CalibrationError, frame::EdgeFrame, CalibrationResult, Marker, MarkerDetector,
    MarkerKind, MarkerSpecs,
};

/// Configuration of the grid hypothesis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Harris sensitivity factor.
    pub harris_k: f32,
    /// Corner responses at or below this percentile are discarded.
    pub response_percentile: f32,
    /// Corners whose coordinates differ by at most this many pixels share a grid line.
    pub cluster_tolerance: f64,
    /// Number of corners at which the confidence saturates.
    pub full_confidence_corners: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            harris_k: 0.04,
            response_percentile: 0.99,
            cluster_tolerance: 3.0,
            full_confidence_corners: 20,
        }
    }
}

/// Detects a square grid from the spacing of its Harris corners.
pub struct GridDetector {
    config: GridConfig,
    cell_size_cm: f64,
    min_cells: usize,
}

impl GridDetector {
    /// Creates a grid detector for the given physical grid.
    pub fn new(config: GridConfig, specs: &MarkerSpecs) -> Self {
        Self {
            config,
            cell_size_cm: specs.grid_cell_size_cm,
            min_cells: specs.grid_min_cells,
        }
    }
}

impl MarkerDetector for GridDetector {
    fn kind(&self) -> MarkerKind {
        MarkerKind::Grid
    }

    fn detect(&self, frame: &EdgeFrame) -> Result<CalibrationResult, CalibrationError> {
        let mut corners = harris_corners(
            &frame.gray,
            self.config.harris_k,
            self.config.response_percentile,
        )?;
        let min_points = self.min_cells * 4;
        if corners.len() < min_points {
            debug!("grid: {} corners, need {}", corners.len(), min_points);
            return Ok(CalibrationResult::undetected());
        }
        corners.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

        let tolerance = self.config.cluster_tolerance;
        let xs: Vec<f64> = corners.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = corners.iter().map(|p| p.y).collect();
        let mut spacings = axis_spacings(&xs, tolerance);
        spacings.extend(axis_spacings(&ys, tolerance));

        let Some(cell_size_px) = median(&mut spacings) else {
            debug!("grid: corners do not span more than one grid line");
            return Ok(CalibrationResult::undetected());
        };

        let confidence =
            (corners.len() as f64 / self.config.full_confidence_corners.max(1) as f64).min(1.0);
        debug!(
            "grid: {} corners, cell {:.1}px, confidence {:.2}",
            corners.len(),
            cell_size_px,
            confidence
        );

        let marker = Marker::Grid {
            cell_size_px,
            corner_count: corners.len(),
        };
        Ok(CalibrationResult::new(
            cell_size_px / self.cell_size_cm,
            confidence,
            marker,
            corners,
        ))
    }
}

/// Groups coordinates into grid lines and returns the distances between
/// consecutive line positions.
///
/// Consecutive sorted values closer than `tolerance` belong to the same line, whose
/// position is the mean of its values. Distances below `tolerance` are ignored.
pub fn axis_spacings(values: &[f64], tolerance: f64) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut centers: Vec<f64> = Vec::new();
    let mut group: Vec<f64> = Vec::new();
    for v in sorted {
        if let Some(&last) = group.last() {
            if v - last > tolerance {
                centers.push(group.iter().sum::<f64>() / group.len() as f64);
                group.clear();
            }
        }
        group.push(v);
    }
    if !group.is_empty() {
        centers.push(group.iter().sum::<f64>() / group.len() as f64);
    }

    centers
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d >= tolerance)
        .collect()
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(0.5 * (values[mid - 1] + values[mid]))
    } else {
        Some(values[mid])
    }
}
