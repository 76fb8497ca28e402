/// Errors that can occur while measuring a wound.
#[derive(Debug, thiserror::Error)]
pub enum MeasurementError {
    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] woundscale_image::ImageError),

    /// The calibration has no usable scale factor.
    #[error("Invalid calibration: detected {detected}, {pixels_per_cm} pixels per cm")]
    InvalidCalibration {
        /// Whether a marker was detected.
        detected: bool,
        /// The scale factor of the calibration.
        pixels_per_cm: f64,
    },

    /// Depth can only be appended once.
    #[error("Depth has already been set")]
    DepthAlreadySet,

    /// The depth is not a positive finite number.
    #[error("Depth must be positive and finite, got {0}")]
    InvalidDepth(f64),
}
