use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use woundscale_image::{GrayscaleField, Point};
use woundscale_imgproc::hough::{angle_between, hough_lines, HoughConfig, HoughLine};

use crate::{
    errors::CalibrationError, frame::EdgeFrame, CalibrationResult, Marker, MarkerDetector,
    MarkerKind, MarkerSpecs,
};

/// Configuration of the ruler hypothesis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerConfig {
    /// Line detection parameters.
    pub hough: HoughConfig,
    /// Maximum angle between two lines of the same parallel cluster, in radians.
    pub angle_tolerance: f64,
    /// Width of the local minimum window along the intensity profile, in samples.
    pub tick_window: usize,
    /// Margin added on both sides of the ruler band, in pixels.
    pub band_margin: f64,
    /// Minimum half width of the ruler band around its center line, in pixels.
    pub min_band_half_width: f64,
}

impl Default for RulerConfig {
    fn default() -> Self {
        Self {
            hough: HoughConfig::default(),
            angle_tolerance: 0.1,
            tick_window: 5,
            band_margin: 2.0,
            min_band_half_width: 10.0,
        }
    }
}

/// Detects a ruler from the periodic dark ticks along its dominant edge direction.
pub struct RulerDetector {
    config: RulerConfig,
    tick_spacing_cm: f64,
    min_ticks: usize,
}

impl RulerDetector {
    /// Creates a ruler detector for the given physical ruler.
    pub fn new(config: RulerConfig, specs: &MarkerSpecs) -> Self {
        Self {
            config,
            tick_spacing_cm: specs.ruler_tick_spacing_cm,
            min_ticks: specs.ruler_min_ticks,
        }
    }
}

impl MarkerDetector for RulerDetector {
    fn kind(&self) -> MarkerKind {
        MarkerKind::Ruler
    }

    fn detect(&self, frame: &EdgeFrame) -> Result<CalibrationResult, CalibrationError> {
        let lines = hough_lines(&frame.edges, &self.config.hough);
        let clusters = cluster_parallel_lines(&lines, self.config.angle_tolerance);
        let Some(cluster) = clusters.iter().fold(None, |best: Option<&Vec<HoughLine>>, c| {
            match best {
                Some(b) if b.len() >= c.len() => Some(b),
                _ => Some(c),
            }
        }) else {
            debug!("ruler: no line above the vote threshold");
            return Ok(CalibrationResult::undetected());
        };

        // the strongest line of the cluster fixes the ruler frame
        let theta = cluster[0].theta;
        let (mut rho_lo, mut rho_hi) = cluster
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), l| {
                (lo.min(l.rho), hi.max(l.rho))
            });
        rho_lo -= self.config.band_margin;
        rho_hi += self.config.band_margin;
        if rho_hi - rho_lo < 2.0 * self.config.min_band_half_width {
            let center = 0.5 * (rho_lo + rho_hi);
            rho_lo = center - self.config.min_band_half_width;
            rho_hi = center + self.config.min_band_half_width;
        }

        let profile = IntensityProfile::along_band(&frame.gray, theta, rho_lo, rho_hi);
        let ticks = profile.local_minima(self.config.tick_window);
        debug!(
            "ruler: {} lines, cluster of {}, {} ticks",
            lines.len(),
            cluster.len(),
            ticks.len()
        );
        if ticks.len() < self.min_ticks.max(2) {
            return Ok(CalibrationResult::undetected());
        }

        let spacings: Vec<f64> = ticks.windows(2).map(|w| w[1] - w[0]).collect();
        let (mean, std) = mean_std(&spacings);
        if mean <= 0.0 {
            return Ok(CalibrationResult::undetected());
        }
        let cv = std / mean;
        let confidence = (1.0 - 2.0 * cv).max(0.0);

        let rho_center = 0.5 * (rho_lo + rho_hi);
        let (sin_t, cos_t) = theta.sin_cos();
        let reference_points = ticks
            .iter()
            .map(|&s| Point::new(rho_center * cos_t - s * sin_t, rho_center * sin_t + s * cos_t))
            .collect();

        let marker = Marker::Ruler {
            angle: (theta + std::f64::consts::FRAC_PI_2).rem_euclid(std::f64::consts::PI),
            tick_spacing_px: mean,
            tick_count: ticks.len(),
        };

        Ok(CalibrationResult::new(
            mean / self.tick_spacing_cm,
            confidence,
            marker,
            reference_points,
        ))
    }
}

/// Groups lines whose normals differ by at most `tolerance` radians.
///
/// Lines are visited in the given order and join the first cluster whose leading
/// line is within tolerance, so the leading line of a cluster is its strongest when
/// the input is sorted by votes.
pub fn cluster_parallel_lines(lines: &[HoughLine], tolerance: f64) -> Vec<Vec<HoughLine>> {
    let mut clusters: Vec<Vec<HoughLine>> = Vec::new();
    for line in lines {
        match clusters
            .iter_mut()
            .find(|c| angle_between(c[0].theta, line.theta) <= tolerance)
        {
            Some(cluster) => cluster.push(*line),
            None => clusters.push(vec![*line]),
        }
    }
    clusters
}

/// Mean gray value of a band of pixels, binned along the band direction.
#[derive(Debug, Default)]
pub struct IntensityProfile {
    /// Position of each sample along the band, in pixels.
    pub positions: Vec<f64>,
    /// Mean intensity of each sample.
    pub values: Vec<f64>,
}

impl IntensityProfile {
    /// Projects the pixels with `rho_lo <= x cos(theta) + y sin(theta) <= rho_hi` onto
    /// the axis `s = -x sin(theta) + y cos(theta)` with unit bins.
    ///
    /// Empty bins are left out of the profile.
    pub fn along_band(gray: &GrayscaleField, theta: f64, rho_lo: f64, rho_hi: f64) -> Self {
        let (cols, rows) = (gray.cols(), gray.rows());
        if cols == 0 || rows == 0 {
            return Self::default();
        }
        let (sin_t, cos_t) = theta.sin_cos();
        let along = |x: f64, y: f64| -x * sin_t + y * cos_t;
        let corners = [
            along(0.0, 0.0),
            along((cols - 1) as f64, 0.0),
            along(0.0, (rows - 1) as f64),
            along((cols - 1) as f64, (rows - 1) as f64),
        ];
        let s_min = corners.iter().copied().fold(f64::INFINITY, f64::min);
        let s_max = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let num_bins = (s_max - s_min).round() as usize + 1;

        let (sums, counts) = gray
            .as_slice()
            .par_chunks_exact(cols)
            .enumerate()
            .fold(
                || (vec![0.0f64; num_bins], vec![0usize; num_bins]),
                |(mut sums, mut counts), (y, row)| {
                    for (x, &v) in row.iter().enumerate() {
                        let (xf, yf) = (x as f64, y as f64);
                        let rho = xf * cos_t + yf * sin_t;
                        if rho < rho_lo || rho > rho_hi {
                            continue;
                        }
                        let bin = (along(xf, yf) - s_min).round() as usize;
                        if bin < num_bins {
                            sums[bin] += v as f64;
                            counts[bin] += 1;
                        }
                    }
                    (sums, counts)
                },
            )
            .reduce(
                || (vec![0.0f64; num_bins], vec![0usize; num_bins]),
                |(mut sa, mut ca), (sb, cb)| {
                    sa.iter_mut().zip(sb).for_each(|(a, b)| *a += b);
                    ca.iter_mut().zip(cb).for_each(|(a, b)| *a += b);
                    (sa, ca)
                },
            );

        let mut profile = Self::default();
        for (bin, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
            if count > 0 {
                profile.positions.push(s_min + bin as f64);
                profile.values.push(sum / count as f64);
            }
        }
        profile
    }

    /// Positions of the tick-like local minima of the profile.
    ///
    /// A minimum is a run of equal samples shorter than `window`, strictly lower than
    /// both neighbours, not higher than any sample within `window / 2` of the run, and
    /// darker than the profile mean. Its position is the center of the run.
    pub fn local_minima(&self, window: usize) -> Vec<f64> {
        const EPS: f64 = 1e-6;
        let values = &self.values;
        let n = values.len();
        if n < 3 {
            return Vec::new();
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let half = window / 2;

        let mut minima = Vec::new();
        let mut i = 0;
        while i < n {
            let v = values[i];
            let mut j = i;
            while j + 1 < n && (values[j + 1] - v).abs() < EPS {
                j += 1;
            }

            let run_len = j - i + 1;
            let is_minimum = run_len < window.max(2)
                && i > 0
                && j + 1 < n
                && values[i - 1] > v + EPS
                && values[j + 1] > v + EPS
                && v < mean
                && (i.saturating_sub(half)..=(j + half).min(n - 1))
                    .all(|k| values[k] >= v - EPS);
            if is_minimum {
                minima.push(0.5 * (self.positions[i] + self.positions[j]));
            }
            i = j + 1;
        }
        minima
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
