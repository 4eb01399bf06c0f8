//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Interpolator trait for sampling values at continuous coordinates.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a tensor at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - The source tensor in storage order (`[Z, Y, X]` or `[Y, X]`)
    /// * `indices` - The indices at which to interpolate `[Batch, D]`, columns
    ///   in axis order `(x, y[, z])`
    ///
    /// Indices outside the grid are clamped to the border voxel.
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
