use woundscale_image::ImageSize;
use woundscale_quality::QualityReport;

/// Errors that stop an assessment.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Neither detection nor a manual reference produced a usable scale.
    #[error("No calibration marker was found in the frame")]
    CalibrationUnavailable,

    /// The frame failed the quality checks and the operator did not override them.
    #[error("The frame failed the quality checks")]
    QualityRejected(Box<QualityReport>),

    /// The segmentation mask does not cover the frame.
    #[error("Segmentation mask of {mask} does not match frame of {image}")]
    SegmentationSizeMismatch {
        /// Size of the frame.
        image: ImageSize,
        /// Size of the mask.
        mask: ImageSize,
    },

    /// The segmentation model failed.
    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    /// The assessment store failed.
    #[error("Assessment store failed: {0}")]
    Store(String),

    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] woundscale_image::ImageError),

    /// Error related to calibration.
    #[error(transparent)]
    Calibration(#[from] woundscale_calib::CalibrationError),

    /// Error related to the quality checks.
    #[error(transparent)]
    Quality(#[from] woundscale_quality::QualityError),

    /// Error related to measurement.
    #[error(transparent)]
    Measurement(#[from] woundscale_measure::MeasurementError),

    /// The configuration could not be parsed.
    #[error(transparent)]
    Config(#[from] serde_json::Error),

    /// Error related to io.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
