//! Image types and operations.
//!
//! This module provides the Image type, its grid geometry, its logical
//! pixel type, and index-grid helpers shared by the filters.

pub mod image;
pub mod geometry;
pub mod pixel;
pub mod grid;

pub use image::{Image, Mask};
pub use geometry::ImageGeometry;
pub use pixel::PixelType;
pub use grid::{generate_index_grid, flat_to_index, index_to_flat};
