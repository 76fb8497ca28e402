use crate::parallel;
use woundscale_image::{GrayscaleField, Image, ImageError, RasterImage};

/// Define the RGB weights for the grayscale conversion.
const RW: f32 = 0.299;
const GW: f32 = 0.587;
const BW: f32 = 0.114;

/// Convert an RGBA8 image to a floating point grayscale field using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// The alpha channel is ignored and the output keeps the 0-255 intensity range.
///
/// # Arguments
///
/// * `src` - The input RGBA8 image.
/// * `dst` - The output grayscale field.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use woundscale_image::{Image, ImageSize};
/// use woundscale_imgproc::color::gray_from_rgba;
///
/// let image = Image::<u8, 4>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![255u8; 4 * 5 * 4],
/// )
/// .unwrap();
///
/// let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// gray_from_rgba(&image, &mut gray).unwrap();
/// assert!((gray.as_slice()[0] - 255.0).abs() < 1e-3);
/// ```
pub fn gray_from_rgba(src: &RasterImage, dst: &mut GrayscaleField) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    // parallelize the grayscale conversion by rows
    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let r = src_pixel[0] as f32;
        let g = src_pixel[1] as f32;
        let b = src_pixel[2] as f32;
        dst_pixel[0] = RW * r + GW * g + BW * b;
    });

    Ok(())
}

/// Allocate a grayscale field for `src` and fill it with [`gray_from_rgba`].
pub fn to_grayscale(src: &RasterImage) -> Result<GrayscaleField, ImageError> {
    let mut gray = Image::from_size_val(src.size(), 0.0f32)?;
    gray_from_rgba(src, &mut gray)?;
    Ok(gray)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use woundscale_image::{Image, ImageError};

    #[test]
    fn test_gray_from_rgba() -> Result<(), ImageError> {
        let image = Image::<u8, 4>::new(
            [2, 1].into(),
            vec![255, 0, 0, 255, 0, 0, 255, 0],
        )?;
        let gray = super::to_grayscale(&image)?;
        assert_relative_eq!(gray.as_slice()[0], 0.299 * 255.0, epsilon = 1e-3);
        assert_relative_eq!(gray.as_slice()[1], 0.114 * 255.0, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn test_gray_size_mismatch() -> Result<(), ImageError> {
        let image = Image::<u8, 4>::from_size_val([2, 2].into(), 0)?;
        let mut gray = Image::<f32, 1>::from_size_val([3, 2].into(), 0.0)?;
        assert!(super::gray_from_rgba(&image, &mut gray).is_err());
        Ok(())
    }
}
