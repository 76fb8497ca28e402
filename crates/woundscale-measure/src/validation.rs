use serde::{Deserialize, Serialize};

use crate::measurement::WoundMeasurement;

/// Bounds beyond which a measurement is considered physically implausible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlausibilityLimits {
    /// Largest plausible area in cm².
    pub max_area_cm2: f64,
    /// Largest plausible length or width in cm.
    pub max_dimension_cm: f64,
    /// Largest plausible length to width ratio.
    pub max_aspect_ratio: f64,
    /// Smallest plausible ratio of the measured area to the inscribed ellipse area.
    pub min_ellipse_ratio: f64,
    /// Largest plausible ratio of the measured area to the inscribed ellipse area.
    pub max_ellipse_ratio: f64,
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            max_area_cm2: 1000.0,
            max_dimension_cm: 50.0,
            max_aspect_ratio: 10.0,
            min_ellipse_ratio: 0.3,
            max_ellipse_ratio: 1.5,
        }
    }
}

/// A non fatal finding attached to a measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurementWarning {
    /// The area exceeds the plausible maximum.
    AreaTooLarge {
        /// Measured area in cm².
        area_cm2: f64,
        /// The limit.
        limit: f64,
    },
    /// The length exceeds the plausible maximum.
    DimensionTooLarge {
        /// Measured length in cm.
        dimension_cm: f64,
        /// The limit.
        limit: f64,
    },
    /// The wound is implausibly elongated.
    AspectRatio {
        /// Length divided by width.
        ratio: f64,
        /// The limit.
        limit: f64,
    },
    /// The area does not match the ellipse spanned by length and width.
    EllipseMismatch {
        /// Measured area divided by the ellipse area.
        ratio: f64,
    },
}

impl std::fmt::Display for MeasurementWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementWarning::AreaTooLarge { area_cm2, limit } => {
                write!(f, "area of {area_cm2} cm² exceeds {limit} cm²")
            }
            MeasurementWarning::DimensionTooLarge {
                dimension_cm,
                limit,
            } => write!(f, "dimension of {dimension_cm} cm exceeds {limit} cm"),
            MeasurementWarning::AspectRatio { ratio, limit } => {
                write!(f, "aspect ratio {ratio:.2} exceeds {limit}")
            }
            MeasurementWarning::EllipseMismatch { ratio } => {
                write!(f, "area is {ratio:.2} times the elliptical estimate")
            }
        }
    }
}

/// Flags physically implausible measurements.
///
/// The measurement is never rejected, an empty list means nothing looks suspicious.
///
/// # Arguments
///
/// * `measurement` - The measurement to check.
/// * `limits` - The plausibility bounds.
pub fn validate_measurement(
    measurement: &WoundMeasurement,
    limits: &PlausibilityLimits,
) -> Vec<MeasurementWarning> {
    let mut warnings = Vec::new();
    let (area, length, width) = (
        measurement.area_cm2,
        measurement.length_cm,
        measurement.width_cm,
    );

    if area > limits.max_area_cm2 {
        warnings.push(MeasurementWarning::AreaTooLarge {
            area_cm2: area,
            limit: limits.max_area_cm2,
        });
    }

    if length > limits.max_dimension_cm {
        warnings.push(MeasurementWarning::DimensionTooLarge {
            dimension_cm: length,
            limit: limits.max_dimension_cm,
        });
    }

    if width > 0.0 && length / width > limits.max_aspect_ratio {
        warnings.push(MeasurementWarning::AspectRatio {
            ratio: length / width,
            limit: limits.max_aspect_ratio,
        });
    }

    let ellipse = std::f64::consts::FRAC_PI_4 * length * width;
    if ellipse > 0.0 {
        let ratio = area / ellipse;
        if ratio < limits.min_ellipse_ratio || ratio > limits.max_ellipse_ratio {
            warnings.push(MeasurementWarning::EllipseMismatch { ratio });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(area_cm2: f64, length_cm: f64, width_cm: f64) -> WoundMeasurement {
        WoundMeasurement {
            area_cm2,
            length_cm,
            width_cm,
            perimeter_cm: 2.0 * (length_cm + width_cm),
            depth_cm: None,
            volume_cm3: None,
        }
    }

    #[test]
    fn test_plausible_wound() {
        // an ellipse of 4 x 2 cm
        let m = measurement(6.28, 4.0, 2.0);
        assert!(validate_measurement(&m, &PlausibilityLimits::default()).is_empty());
    }

    #[test]
    fn test_huge_elongated_wound() {
        let m = measurement(1200.0, 120.0, 10.0);
        let warnings = validate_measurement(&m, &PlausibilityLimits::default());
        assert_eq!(
            warnings,
            vec![
                MeasurementWarning::AreaTooLarge {
                    area_cm2: 1200.0,
                    limit: 1000.0
                },
                MeasurementWarning::DimensionTooLarge {
                    dimension_cm: 120.0,
                    limit: 50.0
                },
                MeasurementWarning::AspectRatio {
                    ratio: 12.0,
                    limit: 10.0
                },
            ]
        );
    }

    #[test]
    fn test_ellipse_mismatch() {
        let m = measurement(1.0, 4.0, 2.0);
        let warnings = validate_measurement(&m, &PlausibilityLimits::default());
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], MeasurementWarning::EllipseMismatch { .. }));
        assert!(warnings[0].to_string().starts_with("area is 0.16 times"));
    }

    #[test]
    fn test_zero_width_skips_ratios() {
        let m = measurement(0.0, 3.0, 0.0);
        assert!(validate_measurement(&m, &PlausibilityLimits::default()).is_empty());
    }
}
