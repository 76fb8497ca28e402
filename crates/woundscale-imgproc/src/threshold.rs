use num_traits::Zero;
use std::cmp::PartialOrd;

use woundscale_image::{GrayscaleField, Image, ImageError};

use crate::{histogram, parallel};

/// Apply a binary threshold to an image.
///
/// # Arguments
///
/// * `src` - The input image of an arbitrary number of channels and type.
/// * `dst` - The output image.
/// * `threshold` - The threshold value. Must be the same type as the image.
/// * `max_value` - The value written where the input value is greater than the threshold.
///
/// # Examples
///
/// ```
/// use woundscale_image::{Image, ImageSize};
/// use woundscale_imgproc::threshold::threshold_binary;
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 1>::new(ImageSize { width: 2, height: 3 }, data).unwrap();
///
/// let mut thresholded = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// threshold_binary(&image, &mut thresholded, 100, 255).unwrap();
/// assert_eq!(thresholded.as_slice(), &[0, 255, 0, 255, 255, 255]);
/// ```
pub fn threshold_binary<T, U, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<U, C>,
    threshold: T,
    max_value: U,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd,
    U: Copy + Send + Sync + Zero,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    // run the thresholding operation in parallel
    parallel::par_iter_rows_val(src, dst, |src_pixel, dst_pixel| {
        *dst_pixel = if *src_pixel > threshold {
            max_value
        } else {
            U::zero()
        };
    });

    Ok(())
}

/// Compute Otsu's threshold of a grayscale field.
///
/// Intensities are clamped to integer bins in `[0, 255]`. Every candidate split `t`
/// separates the bins `< t` from the bins `>= t`; the split maximizing the
/// inter-class variance is returned. The first maximum wins on ties, and `0` is
/// returned when no split separates two non-empty classes.
///
/// # Arguments
///
/// * `src` - The input grayscale field.
///
/// # Returns
///
/// The threshold bin, i.e. the lowest bin of the bright class.
///
/// # Examples
///
/// ```
/// use woundscale_image::Image;
/// use woundscale_imgproc::threshold::otsu_threshold;
///
/// let mut data = vec![50.0f32; 50];
/// data.extend(vec![200.0f32; 50]);
/// let field = Image::<f32, 1>::new([10, 10].into(), data).unwrap();
///
/// let t = otsu_threshold(&field).unwrap();
/// assert!(t > 50 && t <= 200);
/// ```
pub fn otsu_threshold(src: &GrayscaleField) -> Result<u8, ImageError> {
    let hist = histogram::intensity_histogram(src)?;
    Ok(otsu_threshold_from_histogram(&hist))
}

/// Compute Otsu's threshold from a precomputed 256-bin histogram.
pub fn otsu_threshold_from_histogram(hist: &[usize; 256]) -> u8 {
    let total: f64 = hist.iter().sum::<usize>() as f64;
    if total == 0.0 {
        return 0;
    }
    let total_sum: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut class1_pixels = 0.0f64;
    let mut class1_sum = 0.0f64;
    let mut max_variance = 0.0f64;
    let mut optimal_threshold = 0u8;

    // class 1 holds the bins below the candidate threshold
    for threshold in 0..256usize {
        if threshold > 0 {
            class1_pixels += hist[threshold - 1] as f64;
            class1_sum += (threshold - 1) as f64 * hist[threshold - 1] as f64;
        }
        let class2_pixels = total - class1_pixels;
        if class1_pixels == 0.0 || class2_pixels == 0.0 {
            continue;
        }

        let class1_mean = class1_sum / class1_pixels;
        let class2_mean = (total_sum - class1_sum) / class2_pixels;

        let weight1 = class1_pixels / total;
        let weight2 = class2_pixels / total;

        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

#[cfg(test)]
mod tests {
    use woundscale_image::{Image, ImageError};

    #[test]
    fn test_threshold_binary() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new([4, 1].into(), vec![0.0, 10.0, 11.0, 255.0])?;
        let mut dst = Image::<u8, 1>::from_size_val(image.size(), 0)?;
        super::threshold_binary(&image, &mut dst, 10.0, 255)?;
        assert_eq!(dst.as_slice(), &[0, 0, 255, 255]);
        Ok(())
    }

    #[test]
    fn test_otsu_bimodal_between_peaks() -> Result<(), ImageError> {
        // two well separated peaks with a little spread around each mode
        let mut data = Vec::new();
        for i in 0..200 {
            data.push(60.0 + (i % 5) as f32);
            data.push(180.0 + (i % 7) as f32);
        }
        let field = Image::<f32, 1>::new([20, 20].into(), data)?;
        let t = super::otsu_threshold(&field)?;
        assert!(t > 64 && t < 180, "threshold {t} not between the peaks");
        Ok(())
    }

    #[test]
    fn test_otsu_uniform_image() -> Result<(), ImageError> {
        let field = Image::<f32, 1>::from_size_val([5, 5].into(), 42.0)?;
        assert_eq!(super::otsu_threshold(&field)?, 0);
        Ok(())
    }
}
