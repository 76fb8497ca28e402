use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use woundscale_image::Point;

use crate::{
    errors::CalibrationError, frame::EdgeFrame, CalibrationResult, Marker, MarkerDetector,
    MarkerKind, MarkerSpecs,
};

/// Configuration of the circle hypothesis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    /// Only every n-th edge pixel votes.
    pub edge_stride: usize,
    /// Number of candidate radii.
    pub radius_steps: usize,
    /// Smallest candidate radius as a fraction of `min(width, height)`.
    pub min_radius_ratio: f64,
    /// Largest candidate radius as a fraction of `min(width, height)`.
    pub max_radius_ratio: f64,
    /// Number of back-projection directions per edge sample.
    pub angle_steps: usize,
    /// Minimum votes of a center as a fraction of the number of samples.
    pub min_vote_ratio: f64,
    /// Distance to the circle, relative to the radius, for an edge pixel to count.
    pub ring_tolerance: f64,
    /// Minimum circularity of an accepted circle.
    pub min_circularity: f64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            edge_stride: 10,
            radius_steps: 20,
            min_radius_ratio: 0.05,
            max_radius_ratio: 0.3,
            angle_steps: 36,
            min_vote_ratio: 0.1,
            ring_tolerance: 0.1,
            min_circularity: 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct CircleCandidate {
    center: Point,
    radius: f64,
    votes: u32,
}

/// Detects a circle of known diameter with a sampled circular Hough transform.
pub struct CircleDetector {
    config: CircleConfig,
    diameter_cm: f64,
}

impl CircleDetector {
    /// Creates a circle detector for the given physical circle.
    pub fn new(config: CircleConfig, specs: &MarkerSpecs) -> Self {
        Self {
            config,
            diameter_cm: specs.circle_diameter_cm,
        }
    }

    fn candidate_radii(&self, frame: &EdgeFrame) -> Vec<f64> {
        let min_dim = frame.width().min(frame.height()) as f64;
        let lo = self.config.min_radius_ratio * min_dim;
        let hi = self.config.max_radius_ratio * min_dim;
        match self.config.radius_steps {
            0 => Vec::new(),
            1 => vec![lo],
            n => (0..n)
                .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
                .collect(),
        }
    }

    // Votes for circle centers at a single radius.
    fn accumulate(
        &self,
        samples: &[Point],
        radius: f64,
        directions: &[(f64, f64)],
    ) -> Vec<CircleCandidate> {
        let step = std::f64::consts::TAU / directions.len() as f64;
        let bin_size = (radius * step / 2.0).max(1.0);
        let min_votes = self.config.min_vote_ratio * samples.len() as f64;

        let mut accumulator: HashMap<(i64, i64), (u32, f64, f64)> = HashMap::new();
        for p in samples {
            for &(cos_a, sin_a) in directions {
                let cx = p.x - radius * cos_a;
                let cy = p.y - radius * sin_a;
                let key = ((cx / bin_size).floor() as i64, (cy / bin_size).floor() as i64);
                let cell = accumulator.entry(key).or_insert((0, 0.0, 0.0));
                cell.0 += 1;
                cell.1 += cx;
                cell.2 += cy;
            }
        }

        accumulator
            .into_values()
            .filter(|(votes, _, _)| *votes as f64 > min_votes)
            .map(|(votes, sx, sy)| CircleCandidate {
                center: Point::new(sx / votes as f64, sy / votes as f64),
                radius,
                votes,
            })
            .collect()
    }

    // Every (center, radius) cell above the vote threshold, strongest first.
    fn vote(&self, frame: &EdgeFrame) -> Vec<CircleCandidate> {
        let samples: Vec<Point> = frame
            .edge_points
            .iter()
            .step_by(self.config.edge_stride.max(1))
            .copied()
            .collect();
        if samples.is_empty() || self.config.angle_steps == 0 {
            return Vec::new();
        }

        let directions: Vec<(f64, f64)> = (0..self.config.angle_steps)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / self.config.angle_steps as f64;
                (a.cos(), a.sin())
            })
            .collect();

        let mut candidates: Vec<CircleCandidate> = self
            .candidate_radii(frame)
            .par_iter()
            .flat_map_iter(|&r| self.accumulate(&samples, r, &directions))
            .collect();

        // hash map order is arbitrary, make the ranking total
        candidates.sort_by(|a, b| {
            b.votes
                .cmp(&a.votes)
                .then(a.radius.total_cmp(&b.radius))
                .then(a.center.y.total_cmp(&b.center.y))
                .then(a.center.x.total_cmp(&b.center.x))
        });
        candidates
    }
}

impl MarkerDetector for CircleDetector {
    fn kind(&self) -> MarkerKind {
        MarkerKind::Circle
    }

    fn detect(&self, frame: &EdgeFrame) -> Result<CalibrationResult, CalibrationError> {
        let candidates = self.vote(frame);
        if candidates.is_empty() {
            debug!("circle: no center above the vote threshold");
            return Ok(CalibrationResult::undetected());
        }

        let scored: Vec<(CircleCandidate, f64, f64)> = candidates
            .par_iter()
            .map(|c| {
                let tolerance = self.config.ring_tolerance * c.radius;
                let on_ring = frame
                    .edge_points
                    .iter()
                    .filter(|p| (p.distance(&c.center) - c.radius).abs() < tolerance)
                    .count();
                let ratio = on_ring as f64 / (std::f64::consts::TAU * c.radius);
                (*c, ratio.min(1.0), ratio)
            })
            .filter(|(_, circularity, _)| *circularity > self.config.min_circularity)
            .collect();

        let best = scored.into_iter().reduce(|best, next| {
            let better = next
                .1
                .total_cmp(&best.1)
                .then(next.2.total_cmp(&best.2))
                .then(next.0.votes.cmp(&best.0.votes));
            if better.is_gt() {
                next
            } else {
                best
            }
        });

        let Some((circle, circularity, _)) = best else {
            debug!("circle: {} candidates, none circular enough", candidates.len());
            return Ok(CalibrationResult::undetected());
        };
        debug!(
            "circle: center ({:.1}, {:.1}) radius {:.1} circularity {:.2}",
            circle.center.x, circle.center.y, circle.radius, circularity
        );

        let reference_points = vec![
            circle.center,
            Point::new(circle.center.x + circle.radius, circle.center.y),
        ];
        Ok(CalibrationResult::new(
            2.0 * circle.radius / self.diameter_cm,
            circularity,
            Marker::Circle {
                center: circle.center,
                radius_px: circle.radius,
            },
            reference_points,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use woundscale_image::RasterImage;

    fn disk_image(
        size: usize,
        center: (f64, f64),
        radius: f64,
    ) -> Result<RasterImage, woundscale_image::ImageError> {
        let mut image = RasterImage::from_size_val([size, size].into(), 255)?;
        for y in 0..size {
            for x in 0..size {
                let d = Point::new(x as f64, y as f64).distance(&Point::new(center.0, center.1));
                if d <= radius {
                    for ch in 0..3 {
                        image.set_pixel(x, y, ch, 0)?;
                    }
                }
            }
        }
        Ok(image)
    }

    #[test]
    fn test_candidate_radii() -> Result<(), CalibrationError> {
        let frame = EdgeFrame::new(&RasterImage::from_size_val([200, 100].into(), 0)?)?;
        let detector = CircleDetector::new(CircleConfig::default(), &MarkerSpecs::default());
        let radii = detector.candidate_radii(&frame);
        assert_eq!(radii.len(), 20);
        assert_relative_eq!(radii[0], 5.0);
        assert_relative_eq!(radii[19], 30.0);
        Ok(())
    }

    #[test]
    fn test_detect_disk() -> Result<(), CalibrationError> {
        // 31 px is close to the ninth candidate radius 10 + 8 * 50 / 19
        let frame = EdgeFrame::new(&disk_image(200, (100.0, 100.0), 31.0)?)?;
        let detector = CircleDetector::new(CircleConfig::default(), &MarkerSpecs::default());
        let result = detector.detect(&frame)?;

        assert!(result.detected);
        let expected_radius = 10.0 + 8.0 * 50.0 / 19.0;
        assert_relative_eq!(result.pixels_per_cm, 2.0 * expected_radius / 2.5, epsilon = 1e-9);
        assert!(result.confidence > 0.7);
        match result.marker {
            Some(Marker::Circle { center, radius_px }) => {
                assert!(center.distance(&Point::new(100.0, 100.0)) < 3.0);
                assert_relative_eq!(radius_px, expected_radius, epsilon = 1e-9);
            }
            other => panic!("unexpected marker {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_flat_frame_has_no_circle() -> Result<(), CalibrationError> {
        let frame = EdgeFrame::new(&RasterImage::from_size_val([50, 50].into(), 10)?)?;
        let detector = CircleDetector::new(CircleConfig::default(), &MarkerSpecs::default());
        assert!(!detector.detect(&frame)?.detected);
        Ok(())
    }

    #[test]
    fn test_straight_edge_is_not_circular() -> Result<(), CalibrationError> {
        // a vertical step: centers collect votes, but no ring is circular enough
        let mut image = RasterImage::from_size_val([200, 200].into(), 255)?;
        for y in 0..200 {
            for x in 0..100 {
                for ch in 0..3 {
                    image.set_pixel(x, y, ch, 0)?;
                }
            }
        }
        let frame = EdgeFrame::new(&image)?;
        let detector = CircleDetector::new(CircleConfig::default(), &MarkerSpecs::default());
        assert!(!detector.vote(&frame).is_empty());
        assert!(!detector.detect(&frame)?.detected);
        Ok(())
    }
}
