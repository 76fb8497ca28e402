use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use woundscale::image::{ImageSize, Point, RasterImage};
use woundscale::measure::SegmentationResult;
use woundscale::pipeline::ManualReference;

/// Reads a photograph from disk as an RGBA frame.
pub fn read_raster(path: impl AsRef<Path>) -> Result<RasterImage, Box<dyn std::error::Error>> {
    let img = image::open(path.as_ref())?.to_rgba8();
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };
    Ok(RasterImage::new(size, img.into_raw())?)
}

/// Reads an 8-bit segmentation mask, white being wound.
pub fn read_mask(
    path: impl AsRef<Path>,
    confidence: f64,
    threshold: f32,
) -> Result<SegmentationResult, Box<dyn std::error::Error>> {
    let img = image::open(path.as_ref())?.to_luma8();
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };
    Ok(SegmentationResult::from_mask_bytes(
        size,
        img.as_raw(),
        confidence,
        threshold,
    )?)
}

/// Parses `x1,y1,x2,y2,cm` into a manual reference.
pub fn parse_reference(value: &str) -> Result<ManualReference, String> {
    let numbers = value
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid reference '{value}': {e}"))?;

    match numbers.as_slice() {
        &[x1, y1, x2, y2, distance_cm] => Ok(ManualReference {
            from: Point::new(x1, y1),
            to: Point::new(x2, y2),
            distance_cm,
        }),
        _ => Err(format!(
            "invalid reference '{value}': expected x1,y1,x2,y2,cm"
        )),
    }
}

/// Parses an RFC 3339 time stamp or a plain `YYYY-MM-DD` date at midnight UTC.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| format!("invalid date '{value}': expected YYYY-MM-DD or RFC 3339"))
}
