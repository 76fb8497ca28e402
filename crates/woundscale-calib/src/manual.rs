use woundscale_image::Point;

use crate::{errors::CalibrationError, CalibrationResult, Marker};

/// Derives the scale from two points of known physical distance.
///
/// Bypasses marker detection entirely; the result always has confidence `1.0`.
///
/// # Arguments
///
/// * `from` - The first reference point in pixels.
/// * `to` - The second reference point in pixels.
/// * `distance_cm` - The physical distance between the points.
///
/// # Errors
///
/// Returns an error if the distance is not positive and finite or the points coincide.
///
/// # Examples
///
/// ```
/// use woundscale_calib::manual_calibration;
/// use woundscale_image::Point;
///
/// let result = manual_calibration(Point::new(0.0, 0.0), Point::new(30.0, 40.0), 2.0).unwrap();
///
/// assert!(result.detected);
/// assert_eq!(result.pixels_per_cm, 25.0);
/// assert_eq!(result.confidence, 1.0);
/// ```
pub fn manual_calibration(
    from: Point,
    to: Point,
    distance_cm: f64,
) -> Result<CalibrationResult, CalibrationError> {
    if !(distance_cm.is_finite() && distance_cm > 0.0) {
        return Err(CalibrationError::InvalidReferenceDistance(distance_cm));
    }
    let distance_px = from.distance(&to);
    if !(distance_px.is_finite() && distance_px > 0.0) {
        return Err(CalibrationError::CoincidentReferencePoints);
    }

    Ok(CalibrationResult::new(
        distance_px / distance_cm,
        1.0,
        Marker::Manual {
            from,
            to,
            distance_cm,
        },
        vec![from, to],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_manual_calibration() -> Result<(), CalibrationError> {
        let from = Point::new(12.5, 7.0);
        let to = Point::new(112.5, 7.0);
        let result = manual_calibration(from, to, 3.0)?;
        assert!(result.is_valid());
        assert_relative_eq!(result.pixels_per_cm, 100.0 / 3.0, epsilon = 1e-12);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.reference_points, vec![from, to]);
        Ok(())
    }

    #[test]
    fn test_manual_calibration_rejects_bad_input() {
        let p = Point::new(1.0, 1.0);
        assert!(matches!(
            manual_calibration(p, Point::new(2.0, 1.0), 0.0),
            Err(CalibrationError::InvalidReferenceDistance(_))
        ));
        assert!(matches!(
            manual_calibration(p, Point::new(2.0, 1.0), f64::INFINITY),
            Err(CalibrationError::InvalidReferenceDistance(_))
        ));
        assert!(matches!(
            manual_calibration(p, p, 1.0),
            Err(CalibrationError::CoincidentReferencePoints)
        ));
    }
}
