use serde::{Deserialize, Serialize};
use woundscale_image::Point;

/// The kind of physical scale marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// A ruler with evenly spaced tick marks.
    Ruler,
    /// A circle of known diameter.
    Circle,
    /// A grid of square cells.
    Grid,
    /// Two points of known distance picked by the operator.
    Manual,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MarkerKind::Ruler => "ruler",
            MarkerKind::Circle => "circle",
            MarkerKind::Grid => "grid",
            MarkerKind::Manual => "manual",
        };
        write!(f, "{name}")
    }
}

/// A detected scale marker together with the geometry it was fitted from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Marker {
    /// A ruler.
    Ruler {
        /// Orientation of the ruler axis in radians, in `[0, pi)`.
        angle: f64,
        /// Mean distance between consecutive ticks in pixels.
        tick_spacing_px: f64,
        /// Number of detected ticks.
        tick_count: usize,
    },
    /// A circle.
    Circle {
        /// Center of the circle in pixels.
        center: Point,
        /// Radius of the circle in pixels.
        radius_px: f64,
    },
    /// A grid.
    Grid {
        /// Median cell size in pixels.
        cell_size_px: f64,
        /// Number of detected grid corners.
        corner_count: usize,
    },
    /// A manual two point reference.
    Manual {
        /// First reference point.
        from: Point,
        /// Second reference point.
        to: Point,
        /// Physical distance between the points in centimeters.
        distance_cm: f64,
    },
}

impl Marker {
    /// The kind of this marker.
    pub fn kind(&self) -> MarkerKind {
        match self {
            Marker::Ruler { .. } => MarkerKind::Ruler,
            Marker::Circle { .. } => MarkerKind::Circle,
            Marker::Grid { .. } => MarkerKind::Grid,
            Marker::Manual { .. } => MarkerKind::Manual,
        }
    }

    fn rescaled(&self, factor: f64) -> Self {
        let scale = |p: &Point| Point::new(p.x * factor, p.y * factor);
        match self {
            Marker::Ruler {
                angle,
                tick_spacing_px,
                tick_count,
            } => Marker::Ruler {
                angle: *angle,
                tick_spacing_px: tick_spacing_px * factor,
                tick_count: *tick_count,
            },
            Marker::Circle { center, radius_px } => Marker::Circle {
                center: scale(center),
                radius_px: radius_px * factor,
            },
            Marker::Grid {
                cell_size_px,
                corner_count,
            } => Marker::Grid {
                cell_size_px: cell_size_px * factor,
                corner_count: *corner_count,
            },
            Marker::Manual {
                from,
                to,
                distance_cm,
            } => Marker::Manual {
                from: scale(from),
                to: scale(to),
                distance_cm: *distance_cm,
            },
        }
    }
}

/// The pixel to centimeter scale derived from a frame.
///
/// `pixels_per_cm` is strictly positive whenever `detected` is `true`. An undetected
/// result carries a zero scale and no marker and must be treated as
/// "calibration unavailable".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Whether a marker was found.
    pub detected: bool,
    /// Scale factor in pixels per centimeter, `0.0` if undetected.
    pub pixels_per_cm: f64,
    /// Confidence of the fit in `[0, 1]`.
    pub confidence: f64,
    /// The marker the scale was derived from.
    pub marker: Option<Marker>,
    /// The points used for the fit, in fitting order.
    pub reference_points: Vec<Point>,
}

impl CalibrationResult {
    /// Creates a detected result, or an undetected one if the scale is not a positive
    /// finite number.
    pub fn new(
        pixels_per_cm: f64,
        confidence: f64,
        marker: Marker,
        reference_points: Vec<Point>,
    ) -> Self {
        if !(pixels_per_cm.is_finite() && pixels_per_cm > 0.0) {
            return Self::undetected();
        }
        Self {
            detected: true,
            pixels_per_cm,
            confidence: confidence.clamp(0.0, 1.0),
            marker: Some(marker),
            reference_points,
        }
    }

    /// A result signalling that no marker was found.
    pub fn undetected() -> Self {
        Self {
            detected: false,
            pixels_per_cm: 0.0,
            confidence: 0.0,
            marker: None,
            reference_points: Vec::new(),
        }
    }

    /// Whether the result carries a usable scale.
    pub fn is_valid(&self) -> bool {
        self.detected && self.pixels_per_cm.is_finite() && self.pixels_per_cm > 0.0
    }

    /// The kind of marker the scale was derived from, if any.
    pub fn marker_kind(&self) -> Option<MarkerKind> {
        self.marker.as_ref().map(Marker::kind)
    }

    /// Maps a result computed on a frame downsampled by `factor` back to full resolution.
    ///
    /// Pixel quantities are multiplied by `factor`, the confidence is unchanged.
    pub fn rescaled(&self, factor: f64) -> Self {
        if !self.detected {
            return self.clone();
        }
        Self {
            detected: self.detected,
            pixels_per_cm: self.pixels_per_cm * factor,
            confidence: self.confidence,
            marker: self.marker.as_ref().map(|m| m.rescaled(factor)),
            reference_points: self
                .reference_points
                .iter()
                .map(|p| Point::new(p.x * factor, p.y * factor))
                .collect(),
        }
    }
}
