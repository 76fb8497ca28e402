#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color transformations module.
pub mod color;

/// boundary tracing of binary masks.
pub mod contours;

/// corner response module.
pub mod features;

/// image filtering module.
pub mod filter;

/// compute image histogram module.
pub mod histogram;

/// straight line detection module.
pub mod hough;

/// module containing parallization utilities.
pub mod parallel;

/// utility functions for resizing images.
pub mod resize;

/// operations to threshold images.
pub mod threshold;
