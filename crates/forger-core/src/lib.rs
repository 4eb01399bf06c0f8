//! Core data model for paired image/mask transforms.
//!
//! Images hold voxel values in burn tensors and their physical placement in
//! nalgebra-backed spatial types. This crate provides the grid geometry,
//! spatial transforms, interpolators, resampling and the region, flip and
//! pad primitives that the transform pipeline is built from.

pub mod image;
pub mod spatial;
pub mod transform;
pub mod interpolation;
pub mod filter;
pub mod resampling;

pub use image::{Image, ImageGeometry, Mask, PixelType};
pub use spatial::{Point, Vector, Spacing, Direction};
pub use transform::{AffineTransform, SpatialTransform};
pub use interpolation::Interpolation;
pub use resampling::{reference_free_geometry, resample_onto};
