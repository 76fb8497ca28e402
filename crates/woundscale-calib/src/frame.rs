use woundscale_image::{GrayscaleField, Image, ImageError, Point, RasterImage};
use woundscale_imgproc::{
    color::to_grayscale, filter::sobel_magnitude_field, threshold::otsu_threshold,
    threshold::threshold_binary,
};

/// The preprocessed views of a frame shared by all marker hypotheses.
///
/// The edge map is the Sobel gradient magnitude binarized at its Otsu threshold.
#[derive(Clone, Debug)]
pub struct EdgeFrame {
    /// Luma of the frame.
    pub gray: GrayscaleField,
    /// Binary edge map, `255` on edges.
    pub edges: Image<u8, 1>,
    /// Coordinates of every edge pixel in raster order.
    pub edge_points: Vec<Point>,
    /// The Otsu threshold bin of the gradient magnitude.
    pub threshold: u8,
}

impl EdgeFrame {
    /// Preprocesses an RGBA frame.
    pub fn new(image: &RasterImage) -> Result<Self, ImageError> {
        Self::from_gray(to_grayscale(image)?)
    }

    /// Preprocesses an already converted grayscale field.
    pub fn from_gray(gray: GrayscaleField) -> Result<Self, ImageError> {
        let magnitude = sobel_magnitude_field(&gray)?;
        let threshold = otsu_threshold(&magnitude)?;

        // a zero threshold means the magnitude has a single class: no edges
        let mut edges = Image::from_size_val(gray.size(), 0u8)?;
        if threshold > 0 {
            threshold_binary(&magnitude, &mut edges, threshold as f32 - 0.5, 255u8)?;
        }

        let cols = edges.cols();
        let edge_points = edges
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0)
            .map(|(idx, _)| Point::new((idx % cols) as f64, (idx / cols) as f64))
            .collect();

        Ok(Self {
            gray,
            edges,
            edge_points,
            threshold,
        })
    }

    /// Width of the frame in pixels.
    pub fn width(&self) -> usize {
        self.gray.width()
    }

    /// Height of the frame in pixels.
    pub fn height(&self) -> usize {
        self.gray.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_frame_has_no_edges() -> Result<(), ImageError> {
        let image = RasterImage::from_size_val([16, 16].into(), 128)?;
        let frame = EdgeFrame::new(&image)?;
        assert_eq!(frame.threshold, 0);
        assert!(frame.edge_points.is_empty());
        Ok(())
    }

    #[test]
    fn test_step_frame_edges() -> Result<(), ImageError> {
        let mut gray = GrayscaleField::from_size_val([16, 16].into(), 20.0)?;
        for y in 0..16 {
            for x in 8..16 {
                gray.set_pixel(x, y, 0, 220.0)?;
            }
        }
        let frame = EdgeFrame::from_gray(gray)?;
        assert!(!frame.edge_points.is_empty());
        // only the two columns around the step respond
        assert!(frame.edge_points.iter().all(|p| p.x == 7.0 || p.x == 8.0));
        Ok(())
    }
}
