//! Transform types and operations.
//!
//! This module provides the spatial transform trait and the affine transform
//! used to map output physical points onto input physical points.

pub mod trait_;
pub mod affine;

pub use trait_::SpatialTransform;
pub use affine::{rotation_matrix, AffineTransform};
