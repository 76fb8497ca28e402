use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use woundscale_image::Image;

/// Parameters of the straight line Hough transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Number of angle buckets covering `[0, pi)`.
    pub theta_bins: usize,
    /// Minimum votes as a fraction of `max(width, height)`.
    pub vote_ratio: f64,
    /// Maximum number of lines returned.
    pub max_lines: usize,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            theta_bins: 180,
            vote_ratio: 0.2,
            max_lines: 20,
        }
    }
}

/// A line in normal form `x * cos(theta) + y * sin(theta) = rho`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoughLine {
    /// Signed distance of the line to the origin in pixels.
    pub rho: f64,
    /// Angle of the line normal in radians, in `[0, pi)`.
    pub theta: f64,
    /// Number of edge pixels voting for the line.
    pub votes: u32,
}

/// Detect straight lines in a binary edge map.
///
/// Every non-zero pixel votes once per angle bucket into a `rho`-`theta`
/// accumulator spanning `rho` in `[-diagonal, diagonal]` with unit resolution.
/// Cells with at least `vote_ratio * max(width, height)` votes are returned,
/// strongest first, truncated to `max_lines`.
///
/// # Arguments
///
/// * `edges` - The binary edge map, non-zero pixels are edges.
/// * `config` - The transform parameters.
pub fn hough_lines(edges: &Image<u8, 1>, config: &HoughConfig) -> Vec<HoughLine> {
    let (cols, rows) = (edges.cols(), edges.rows());
    if cols == 0 || rows == 0 || config.theta_bins == 0 {
        return Vec::new();
    }

    let edge_points: Vec<(f64, f64)> = edges
        .as_slice()
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > 0)
        .map(|(idx, _)| ((idx % cols) as f64, (idx / cols) as f64))
        .collect();

    let max_rho = ((cols * cols + rows * rows) as f64).sqrt();
    let rho_bins = (2.0 * max_rho).ceil() as usize + 1;
    let vote_threshold = (config.vote_ratio * cols.max(rows) as f64).ceil().max(1.0) as u32;

    // each angle bucket owns its own rho column
    let mut lines: Vec<HoughLine> = (0..config.theta_bins)
        .into_par_iter()
        .flat_map_iter(|theta_idx| {
            let theta = theta_idx as f64 * std::f64::consts::PI / config.theta_bins as f64;
            let (sin_t, cos_t) = theta.sin_cos();
            let mut column = vec![0u32; rho_bins];
            for &(x, y) in &edge_points {
                let rho = x * cos_t + y * sin_t;
                let rho_idx = (rho + max_rho).round() as usize;
                if let Some(cell) = column.get_mut(rho_idx) {
                    *cell += 1;
                }
            }
            column
                .into_iter()
                .enumerate()
                .filter(move |(_, votes)| *votes >= vote_threshold)
                .map(move |(rho_idx, votes)| HoughLine {
                    rho: rho_idx as f64 - max_rho,
                    theta,
                    votes,
                })
        })
        .collect();

    lines.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then(a.theta.total_cmp(&b.theta))
            .then(a.rho.total_cmp(&b.rho))
    });
    lines.truncate(config.max_lines);
    lines
}

/// Smallest angle between two line normals, treating `theta` and `theta + pi` as equal.
pub fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(std::f64::consts::PI);
    d.min(std::f64::consts::PI - d)
}
