//! Spatial transform trait.
//!
//! This module defines the trait every point-mapping transform implements.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use crate::spatial::Point;

/// Maps points from one physical space to another.
///
/// During resampling the transform maps output physical points to input
/// physical points.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `D` - The spatial dimensionality (2 or 3)
pub trait SpatialTransform<B: Backend, const D: usize>: std::fmt::Debug + Send + Sync {
    /// Apply transform to a batch of points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, D]` containing the input points
    ///
    /// # Returns
    /// Tensor of shape `[Batch, D]` containing the transformed points
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Apply transform to a single point in double precision.
    fn transform_point(&self, point: &Point<D>) -> Point<D>;

    /// Get the inverse transform (if available).
    ///
    /// Not all transforms are invertible, so this returns an Option.
    fn inverse(&self) -> Option<Box<dyn SpatialTransform<B, D>>> {
        None
    }

    /// Whether the transform maps every point to itself exactly.
    fn is_identity(&self) -> bool {
        false
    }
}
