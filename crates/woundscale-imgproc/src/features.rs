use rayon::prelude::*;
use woundscale_image::{GrayscaleField, Image, ImageError, Point};

/// Default Harris sensitivity factor.
pub const HARRIS_K: f32 = 0.04;

/// Computes the Harris corner response of a grayscale field.
///
/// The structure tensor is built from forward first differences
/// `Ix = I(x+1, y) - I(x, y)` and `Iy = I(x, y+1) - I(x, y)` summed over a 3x3
/// window, and the response is `det(M) - k * trace(M)^2`. Pixels closer than two
/// pixels to the border are set to zero.
///
/// # Arguments
///
/// * `src` - The input grayscale field.
/// * `dst` - The output response field with the same size.
/// * `k` - The sensitivity factor, usually [`HARRIS_K`].
pub fn harris_response(
    src: &GrayscaleField,
    dst: &mut GrayscaleField,
    k: f32,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (cols, rows) = (src.cols(), src.rows());
    dst.as_slice_mut().iter_mut().for_each(|v| *v = 0.0);
    if cols < 5 || rows < 5 {
        return Ok(());
    }

    let src_data = src.as_slice();
    let mut dx2 = vec![0.0f32; src_data.len()];
    let mut dy2 = vec![0.0f32; src_data.len()];
    let mut dxy = vec![0.0f32; src_data.len()];

    dx2.par_chunks_exact_mut(cols)
        .zip(dy2.par_chunks_exact_mut(cols))
        .zip(dxy.par_chunks_exact_mut(cols))
        .enumerate()
        .for_each(|(row_idx, ((dx2_row, dy2_row), dxy_row))| {
            if row_idx + 1 >= rows {
                return;
            }
            let row_offset = row_idx * cols;
            for col_idx in 0..cols - 1 {
                let idx = row_offset + col_idx;
                let ix = src_data[idx + 1] - src_data[idx];
                let iy = src_data[idx + cols] - src_data[idx];
                dx2_row[col_idx] = ix * ix;
                dy2_row[col_idx] = iy * iy;
                dxy_row[col_idx] = ix * iy;
            }
        });

    dst.as_slice_mut()
        .par_chunks_exact_mut(cols)
        .enumerate()
        .for_each(|(row_idx, dst_row)| {
            if row_idx < 2 || row_idx + 2 >= rows {
                return;
            }
            for (col_idx, dst_pixel) in dst_row.iter_mut().enumerate() {
                if col_idx < 2 || col_idx + 2 >= cols {
                    continue;
                }
                let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
                for wy in row_idx - 1..=row_idx + 1 {
                    let base = wy * cols;
                    for wx in col_idx - 1..=col_idx + 1 {
                        sxx += dx2[base + wx];
                        syy += dy2[base + wx];
                        sxy += dxy[base + wx];
                    }
                }
                let det = sxx * syy - sxy * sxy;
                let trace = sxx + syy;
                *dst_pixel = det - k * trace * trace;
            }
        });

    Ok(())
}

/// Value at the given percentile (`0.0..=1.0`) of a field, nearest-rank.
pub fn percentile(src: &GrayscaleField, p: f32) -> f32 {
    let mut values = src.as_slice().to_vec();
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = ((values.len() - 1) as f32 * p.clamp(0.0, 1.0)).floor() as usize;
    values[rank]
}

/// Suppress everything but strong 3x3 local maxima of a response field.
///
/// A pixel survives if its value is above the `percentile` of all response values,
/// is positive, and is the maximum of its 3x3 neighbourhood. Plateaus keep the first
/// pixel in raster order. Suppressed pixels are written as zero.
pub fn non_max_suppression(
    src: &GrayscaleField,
    dst: &mut GrayscaleField,
    percentile_rank: f32,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let threshold = percentile(src, percentile_rank).max(0.0);
    let (cols, rows) = (src.cols(), src.rows());
    let data = src.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(cols.max(1))
        .enumerate()
        .for_each(|(y, dst_row)| {
            for (x, dst_pixel) in dst_row.iter_mut().enumerate() {
                let v = data[y * cols + x];
                *dst_pixel = 0.0;
                if v <= threshold {
                    continue;
                }
                let mut is_max = true;
                'window: for ny in y.saturating_sub(1)..=(y + 1).min(rows - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(cols - 1) {
                        if nx == x && ny == y {
                            continue;
                        }
                        let n = data[ny * cols + nx];
                        let earlier = (ny, nx) < (y, x);
                        if n > v || (earlier && n == v) {
                            is_max = false;
                            break 'window;
                        }
                    }
                }
                if is_max {
                    *dst_pixel = v;
                }
            }
        });

    Ok(())
}

/// Collect the coordinates of every non-zero pixel of a suppressed response field.
pub fn response_peaks(src: &GrayscaleField) -> Vec<Point> {
    let cols = src.cols();
    src.as_slice()
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > 0.0)
        .map(|(idx, _)| Point::new((idx % cols) as f64, (idx / cols) as f64))
        .collect()
}

/// Detect Harris corners: response, 3x3 non-maximum suppression and percentile gate.
///
/// # Arguments
///
/// * `src` - The input grayscale field.
/// * `k` - The Harris sensitivity factor.
/// * `percentile_rank` - Responses at or below this percentile are discarded.
///
/// # Returns
///
/// The corner locations in raster order.
pub fn harris_corners(
    src: &GrayscaleField,
    k: f32,
    percentile_rank: f32,
) -> Result<Vec<Point>, ImageError> {
    let mut response = Image::from_size_val(src.size(), 0.0f32)?;
    harris_response(src, &mut response, k)?;
    let mut suppressed = Image::from_size_val(src.size(), 0.0f32)?;
    non_max_suppression(&response, &mut suppressed, percentile_rank)?;
    Ok(response_peaks(&suppressed))
}
