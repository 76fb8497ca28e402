use rayon::prelude::*;
use woundscale_image::{Image, ImageError, ImageSize};

/// Downsample an image by an integer factor using nearest neighbour sampling.
///
/// The output pixel `(x, y)` takes the value of the input pixel `(x * factor, y * factor)`.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `factor` - The downsampling factor, must be at least 1.
///
/// # Returns
///
/// The downsampled image of size `(width / factor, height / factor)`.
///
/// # Errors
///
/// Returns an error if the factor is zero or the result would be empty.
///
/// # Examples
///
/// ```
/// use woundscale_image::Image;
/// use woundscale_imgproc::resize::resize_nearest;
///
/// let image = Image::<u8, 1>::new([4, 2].into(), vec![0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
/// let small = resize_nearest(&image, 2).unwrap();
///
/// assert_eq!(small.as_slice(), &[0, 2]);
/// ```
pub fn resize_nearest<T, const C: usize>(
    src: &Image<T, C>,
    factor: usize,
) -> Result<Image<T, C>, ImageError>
where
    T: Copy + Send + Sync + Default,
{
    if factor == 0 {
        return Err(ImageError::InvalidFactor(factor));
    }

    let new_size = ImageSize {
        width: src.cols() / factor,
        height: src.rows() / factor,
    };
    if new_size.width == 0 || new_size.height == 0 {
        return Err(ImageError::ImageTooSmall(src.cols(), src.rows(), factor));
    }

    let mut dst = Image::from_size_val(new_size, T::default())?;
    let src_data = src.as_slice();
    let src_stride = src.cols() * C;

    dst.as_slice_mut()
        .par_chunks_exact_mut(new_size.width * C)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let src_row = &src_data[y * factor * src_stride..];
            dst_row
                .chunks_exact_mut(C)
                .enumerate()
                .for_each(|(x, dst_pixel)| {
                    let offset = x * factor * C;
                    dst_pixel.copy_from_slice(&src_row[offset..offset + C]);
                });
        });

    Ok(dst)
}
