use woundscale_image::{GrayscaleField, Image, ImageError, ImageSize, Point};
use woundscale_imgproc::contours::trace_outer_contour;

/// The output of the external wound segmentation model.
///
/// The mask has the dimensions of the captured frame, values above the foreground
/// threshold belong to the wound. The contour is the wound boundary as a closed polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationResult {
    /// Per pixel wound probability.
    pub mask: GrayscaleField,
    /// Ordered boundary of the wound.
    pub contour: Vec<Point>,
    /// Confidence of the model in `[0, 1]`.
    pub confidence: f64,
}

impl SegmentationResult {
    /// Wraps a mask and contour produced by a model.
    pub fn new(mask: GrayscaleField, contour: Vec<Point>, confidence: f64) -> Self {
        Self {
            mask,
            contour,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Builds a result from a bare mask, tracing the boundary of its largest region.
    ///
    /// # Arguments
    ///
    /// * `mask` - The segmentation mask.
    /// * `confidence` - The confidence of the model.
    /// * `threshold` - The foreground threshold.
    pub fn from_mask(mask: GrayscaleField, confidence: f64, threshold: f32) -> Self {
        let contour = trace_outer_contour(&mask, threshold);
        Self::new(mask, contour, confidence)
    }

    /// Builds a result from an 8-bit mask, `255` being certain foreground.
    ///
    /// # Errors
    ///
    /// If the number of bytes does not match the size.
    pub fn from_mask_bytes(
        size: ImageSize,
        bytes: &[u8],
        confidence: f64,
        threshold: f32,
    ) -> Result<Self, ImageError> {
        let mask: GrayscaleField =
            Image::<u8, 1>::from_size_slice(size, bytes)?.cast_and_scale(1.0 / 255.0)?;
        Ok(Self::from_mask(mask, confidence, threshold))
    }

    /// Size of the mask.
    #[inline]
    pub fn size(&self) -> ImageSize {
        self.mask.size()
    }

    /// Number of mask pixels above the foreground threshold.
    pub fn foreground_pixels(&self, threshold: f32) -> usize {
        self.mask.as_slice().iter().filter(|&&v| v > threshold).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_mask_bytes() -> Result<(), ImageError> {
        let mut bytes = vec![0u8; 36];
        for y in 1..4 {
            for x in 2..5 {
                bytes[y * 6 + x] = 255;
            }
        }
        let seg = SegmentationResult::from_mask_bytes([6, 6].into(), &bytes, 1.4, 0.5)?;
        assert_eq!(seg.foreground_pixels(0.5), 9);
        assert_eq!(seg.contour.len(), 8);
        assert_eq!(seg.contour[0], Point::new(2.0, 1.0));
        assert_eq!(seg.confidence, 1.0);
        Ok(())
    }

    #[test]
    fn test_mask_bytes_scale_to_unit_range() -> Result<(), ImageError> {
        let bytes = [0u8, 128, 255, 255];
        let seg = SegmentationResult::from_mask_bytes([2, 2].into(), &bytes, 0.8, 0.5)?;
        assert_eq!(seg.mask.get(0, 0, 0), Some(&0.0));
        assert_eq!(seg.mask.get(0, 1, 0), Some(&1.0));
        assert_eq!(seg.mask.get(1, 1, 0), Some(&1.0));
        assert_relative_eq!(seg.mask.get_pixel(1, 0, 0)?, 128.0 / 255.0, epsilon = 1e-6);
        assert_eq!(seg.foreground_pixels(0.5), 3);
        assert_eq!(seg.foreground_pixels(0.6), 2);
        Ok(())
    }

    #[test]
    fn test_from_mask_bytes_size_mismatch() {
        let res = SegmentationResult::from_mask_bytes([6, 6].into(), &[0u8; 10], 0.9, 0.5);
        assert!(res.is_err());
    }
}
