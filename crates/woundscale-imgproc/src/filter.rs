use woundscale_image::{GrayscaleField, Image, ImageError};

use crate::parallel::par_iter_interior;

fn check_sizes(src: &GrayscaleField, dst: &GrayscaleField) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

/// Compute the Sobel gradient magnitude of a grayscale field.
///
/// Uses the 3x3 kernels
///
/// ```text
/// gx = [-1 0 1; -2 0 2; -1 0 1]    gy = [-1 -2 -1; 0 0 0; 1 2 1]
/// ```
///
/// and writes `sqrt(gx^2 + gy^2)`. The 1-pixel border of `dst` is set to zero.
///
/// # Arguments
///
/// * `src` - The input grayscale field.
/// * `dst` - The output magnitude field with the same size.
pub fn sobel_magnitude(src: &GrayscaleField, dst: &mut GrayscaleField) -> Result<(), ImageError> {
    check_sizes(src, dst)?;
    dst.as_slice_mut().iter_mut().for_each(|v| *v = 0.0);

    par_iter_interior(src, dst, |data, cols, idx| {
        let prev_row_idx = idx - cols;
        let next_row_idx = idx + cols;

        let v11 = data[prev_row_idx - 1];
        let v12 = data[prev_row_idx];
        let v13 = data[prev_row_idx + 1];
        let v21 = data[idx - 1];
        let v23 = data[idx + 1];
        let v31 = data[next_row_idx - 1];
        let v32 = data[next_row_idx];
        let v33 = data[next_row_idx + 1];

        let gx = (v13 + 2.0 * v23 + v33) - (v11 + 2.0 * v21 + v31);
        let gy = (v31 + 2.0 * v32 + v33) - (v11 + 2.0 * v12 + v13);

        (gx * gx + gy * gy).sqrt()
    });

    Ok(())
}

/// Convolve a grayscale field with the 4-neighbour Laplacian kernel
/// `[0 1 0; 1 -4 1; 0 1 0]`.
///
/// The 1-pixel border of `dst` is set to zero.
pub fn laplacian(src: &GrayscaleField, dst: &mut GrayscaleField) -> Result<(), ImageError> {
    check_sizes(src, dst)?;
    dst.as_slice_mut().iter_mut().for_each(|v| *v = 0.0);

    par_iter_interior(src, dst, |data, cols, idx| {
        data[idx - cols] + data[idx + cols] + data[idx - 1] + data[idx + 1] - 4.0 * data[idx]
    });

    Ok(())
}

/// Allocate a field and fill it with [`sobel_magnitude`].
pub fn sobel_magnitude_field(src: &GrayscaleField) -> Result<GrayscaleField, ImageError> {
    let mut dst = Image::from_size_val(src.size(), 0.0f32)?;
    sobel_magnitude(src, &mut dst)?;
    Ok(dst)
}
