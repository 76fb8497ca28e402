/// Errors that can occur while assessing a frame.
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] woundscale_image::ImageError),
}
