use rayon::prelude::*;
use woundscale_image::{GrayscaleField, ImageError};

/// Compute the intensity histogram of a grayscale field.
///
/// Intensities are rounded and clamped to the 0-255 range before binning.
///
/// # Arguments
///
/// * `src` - The input field to compute the histogram.
/// * `hist` - The output histogram, counts are accumulated into it.
/// * `num_bins` - The number of bins to use for the histogram.
///
/// # Errors
///
/// Returns an error if the number of bins is invalid.
///
/// # Example
///
/// ```
/// use woundscale_image::{Image, ImageSize};
/// use woundscale_imgproc::histogram::compute_histogram;
///
/// let image = Image::<f32, 1>::new(
///   ImageSize {
///     width: 3,
///     height: 3,
///   },
///   vec![0.0, 2.0, 4.0, 128.0, 130.0, 132.0, 254.0, 255.0, 300.0],
/// ).unwrap();
///
/// let mut histogram = vec![0; 3];
///
/// compute_histogram(&image, &mut histogram, 3).unwrap();
/// assert_eq!(histogram, vec![3, 3, 3]);
/// ```
pub fn compute_histogram(
    src: &GrayscaleField,
    hist: &mut [usize],
    num_bins: usize,
) -> Result<(), ImageError> {
    if num_bins == 0 || num_bins > 256 {
        return Err(ImageError::InvalidHistogramBins(num_bins));
    }

    if hist.len() != num_bins {
        return Err(ImageError::InvalidHistogramBins(num_bins));
    }

    let mut bin_lut = [0usize; 256];
    for (i, bin) in bin_lut.iter_mut().enumerate() {
        *bin = (i * num_bins) >> 8;
    }

    let counts = src
        .as_slice()
        .par_chunks(4096)
        .fold(
            || vec![0usize; num_bins],
            |mut local, chunk| {
                for &px in chunk {
                    local[bin_lut[intensity_bin(px)]] += 1;
                }
                local
            },
        )
        .reduce(
            || vec![0usize; num_bins],
            |mut a, b| {
                for (i, val) in b.iter().enumerate() {
                    a[i] += val;
                }
                a
            },
        );

    for (h, c) in hist.iter_mut().zip(counts) {
        *h += c;
    }

    Ok(())
}

/// Compute the full 256-bin intensity histogram of a grayscale field.
pub fn intensity_histogram(src: &GrayscaleField) -> Result<[usize; 256], ImageError> {
    let mut hist = [0usize; 256];
    compute_histogram(src, &mut hist, 256)?;
    Ok(hist)
}

/// Map a floating point intensity to its 8-bit histogram bin.
#[inline]
pub fn intensity_bin(value: f32) -> usize {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as usize
}
