//! Index-grid helpers.
//!
//! Voxels are stored row-major over the tensor shape `[z, y, x]`, so the
//! flat offset of axis-ordered index `(x, y, z)` is `x + nx * (y + ny * z)`.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

/// Axis-ordered index of the voxel at flat storage offset `flat`.
pub fn flat_to_index<const D: usize>(flat: usize, size: [usize; D]) -> [usize; D] {
    let mut rest = flat;
    std::array::from_fn(|axis| {
        let i = rest % size[axis];
        rest /= size[axis];
        i
    })
}

/// Flat storage offset of an axis-ordered index.
pub fn index_to_flat<const D: usize>(index: [usize; D], size: [usize; D]) -> usize {
    (0..D).rev().fold(0, |acc, axis| acc * size[axis] + index[axis])
}

/// Generate the continuous indices of every voxel of a grid.
///
/// Returns a tensor of shape `[N, D]` with columns in axis order `(x, y, z)`
/// and rows in storage order.
pub fn generate_index_grid<B: Backend, const D: usize>(
    size: [usize; D],
    device: &B::Device,
) -> Tensor<B, 2> {
    let total: usize = size.iter().product();
    let mut grid = Vec::with_capacity(total * D);
    for flat in 0..total {
        let index = flat_to_index(flat, size);
        grid.extend(index.iter().map(|&i| i as f32));
    }
    Tensor::<B, 1>::from_data(TensorData::new(grid, [total * D]), device).reshape([total, D])
}
