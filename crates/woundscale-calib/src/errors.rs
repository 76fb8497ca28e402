/// Errors that can occur while calibrating the image scale.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] woundscale_image::ImageError),

    /// The physical distance of a manual reference is not a positive finite number.
    #[error("Reference distance must be positive and finite, got {0}")]
    InvalidReferenceDistance(f64),

    /// The two points of a manual reference coincide.
    #[error("Reference points must not coincide")]
    CoincidentReferencePoints,
}
