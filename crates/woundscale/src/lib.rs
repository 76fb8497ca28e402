//! # Woundscale
//!
//! Scale-calibrated wound measurement from photographs: marker detection, capture
//! quality checks, area and dimension measurement and healing analytics.

#[doc(inline)]
pub use woundscale_image as image;

#[doc(inline)]
pub use woundscale_imgproc as imgproc;

#[doc(inline)]
pub use woundscale_calib as calib;

#[doc(inline)]
pub use woundscale_quality as quality;

#[doc(inline)]
pub use woundscale_measure as measure;

#[doc(inline)]
pub use woundscale_pipeline as pipeline;
