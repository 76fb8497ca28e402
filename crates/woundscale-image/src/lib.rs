#![deny(missing_docs)]
//! Image types and traits for representing captured frames and derived fields

/// image representation for computer vision purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

/// floating point pixel coordinates.
pub mod point;

pub use crate::error::ImageError;
pub use crate::image::{GrayscaleField, Image, ImageSize, RasterImage};
pub use crate::point::Point;
