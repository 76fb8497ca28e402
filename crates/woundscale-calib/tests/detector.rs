use approx::assert_relative_eq;
use woundscale_calib::{
    manual_calibration, CalibrationDetector, CalibrationError, DetectorConfig, MarkerKind,
};
use woundscale_image::{ImageError, Point, RasterImage};

fn paint(image: &mut RasterImage, x: usize, y: usize, v: u8) -> Result<(), ImageError> {
    for ch in 0..3 {
        image.set_pixel(x, y, ch, v)?;
    }
    Ok(())
}

fn ruler_frame() -> Result<RasterImage, ImageError> {
    let mut image = RasterImage::from_size_val([200, 120].into(), 255)?;
    for y in 40..80 {
        for x in 0..200 {
            let is_tick = y < 60 && x >= 20 && x % 20 < 2;
            paint(&mut image, x, y, if is_tick { 0 } else { 200 })?;
        }
    }
    Ok(image)
}

fn disk_frame() -> Result<RasterImage, ImageError> {
    let mut image = RasterImage::from_size_val([200, 200].into(), 255)?;
    let center = Point::new(100.0, 100.0);
    for y in 0..200 {
        for x in 0..200 {
            if Point::new(x as f64, y as f64).distance(&center) <= 31.0 {
                paint(&mut image, x, y, 0)?;
            }
        }
    }
    Ok(image)
}

#[test]
fn detects_ruler_first() -> Result<(), CalibrationError> {
    let detector = CalibrationDetector::new(DetectorConfig::default());
    let result = detector.detect(&ruler_frame()?)?;
    assert!(result.detected);
    assert_eq!(result.marker_kind(), Some(MarkerKind::Ruler));
    assert_relative_eq!(result.pixels_per_cm, 20.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn falls_back_to_circle() -> Result<(), CalibrationError> {
    let detector = CalibrationDetector::default();
    let result = detector.detect(&disk_frame()?)?;
    assert!(result.detected);
    assert_eq!(result.marker_kind(), Some(MarkerKind::Circle));
    // diameter of the closest candidate radius over 2.5 cm
    assert_relative_eq!(result.pixels_per_cm, 2.0 * (10.0 + 400.0 / 19.0) / 2.5, epsilon = 1e-9);
    Ok(())
}

#[test]
fn blank_frame_is_undetected() -> Result<(), CalibrationError> {
    let detector = CalibrationDetector::default();
    let result = detector.detect(&RasterImage::from_size_val([120, 90].into(), 128)?)?;
    assert!(!result.detected);
    assert_eq!(result.pixels_per_cm, 0.0);
    assert!(result.marker.is_none());
    Ok(())
}

#[test]
fn manual_reference_matches_distance() -> Result<(), CalibrationError> {
    let result = manual_calibration(Point::new(3.0, 4.0), Point::new(63.0, 84.0), 4.0)?;
    assert_eq!(result.marker_kind(), Some(MarkerKind::Manual));
    assert_relative_eq!(result.pixels_per_cm, 25.0, epsilon = 1e-12);
    assert_eq!(result.confidence, 1.0);
    Ok(())
}
