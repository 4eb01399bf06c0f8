//! Nearest neighbor interpolation implementation.

use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use super::trait_::Interpolator;

/// Nearest Neighbor Interpolator.
///
/// Rounds every coordinate to the closest voxel. Used for label images, where
/// blending values would invent labels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let dims = data.dims();
        let total: usize = dims.iter().product();
        let batch_size = indices.dims()[0];
        let device = indices.device();

        let flat_data = data.clone().reshape([total]);
        let mut flat_index = Tensor::<B, 1, Int>::zeros([batch_size], &device);
        let mut stride = 1usize;

        // Axis `a` lives in tensor dim `D - 1 - a`; x varies fastest.
        for axis in 0..D {
            let extent = dims[D - 1 - axis];
            let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
            let voxel = coord.round().clamp(0.0, (extent - 1) as f64).int();
            flat_index = flat_index + voxel * (stride as i32);
            stride *= extent;
        }

        flat_data.gather(0, flat_index)
    }
}
