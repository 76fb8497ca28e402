use serde::{Deserialize, Serialize};
use woundscale_image::{GrayscaleField, Image, ImageError};
use woundscale_imgproc::filter::laplacian;

/// Laplacian variance at which the sharpness score saturates.
pub const FULL_SHARPNESS_VARIANCE: f64 = 1000.0;

/// Outcome of the blur check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlurCheck {
    /// Sharpness score in `[0, 1]`.
    pub score: f64,
    /// Variance of the non-zero Laplacian responses.
    pub variance: f64,
    /// Whether the score reaches the minimum blur score.
    pub passed: bool,
}

/// Variance of the non-zero Laplacian responses of the field interior.
pub fn laplacian_variance(gray: &GrayscaleField) -> Result<f64, ImageError> {
    let (cols, rows) = (gray.cols(), gray.rows());
    if cols < 3 || rows < 3 {
        return Ok(0.0);
    }

    let mut response = Image::from_size_val(gray.size(), 0.0f32)?;
    laplacian(gray, &mut response)?;

    let values: Vec<f64> = response
        .as_slice()
        .chunks_exact(cols)
        .skip(1)
        .take(rows - 2)
        .flat_map(|row| row[1..cols - 1].iter())
        .filter(|&&v| v != 0.0)
        .map(|&v| v as f64)
        .collect();

    if values.is_empty() {
        return Ok(0.0);
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(variance)
}

/// Scores the sharpness of a frame from its Laplacian variance.
///
/// # Arguments
///
/// * `gray` - The luma of the frame.
/// * `min_score` - The minimum score for the check to pass.
pub fn check_blur(gray: &GrayscaleField, min_score: f64) -> Result<BlurCheck, ImageError> {
    let variance = laplacian_variance(gray)?;
    let score = (variance / FULL_SHARPNESS_VARIANCE).min(1.0);
    Ok(BlurCheck {
        score,
        variance,
        passed: score >= min_score,
    })
}
