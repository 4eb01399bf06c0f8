//! Linear interpolation implementation.
//!
//! Bilinear for 2D and trilinear for 3D, written once over the `2^D` corners
//! of the enclosing cell.

use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use super::trait_::Interpolator;

/// Linear Interpolator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let dims = data.dims();
        let total: usize = dims.iter().product();
        let batch_size = indices.dims()[0];
        let device = indices.device();

        let flat_data = data.clone().reshape([total]);

        // Per axis: lower and upper neighbour offsets (already multiplied by
        // the stride) and the weight of the upper neighbour.
        let mut lower: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(D);
        let mut upper: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(D);
        let mut weights: Vec<Tensor<B, 1>> = Vec::with_capacity(D);
        let mut stride = 1usize;

        for axis in 0..D {
            let extent = dims[D - 1 - axis];
            let max = (extent - 1) as f64;
            let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
            let floor = coord.clone().floor();

            weights.push(coord - floor.clone());
            lower.push(floor.clone().clamp(0.0, max).int() * (stride as i32));
            upper.push((floor + 1.0).clamp(0.0, max).int() * (stride as i32));
            stride *= extent;
        }

        let mut result = Tensor::<B, 1>::zeros([batch_size], &device);
        for corner in 0..(1usize << D) {
            let mut flat_index = Tensor::<B, 1, Int>::zeros([batch_size], &device);
            let mut weight = Tensor::<B, 1>::ones([batch_size], &device);
            for axis in 0..D {
                if corner & (1 << axis) != 0 {
                    flat_index = flat_index + upper[axis].clone();
                    weight = weight * weights[axis].clone();
                } else {
                    flat_index = flat_index + lower[axis].clone();
                    weight = weight * (weights[axis].clone().neg() + 1.0);
                }
            }
            result = result + flat_data.clone().gather(0, flat_index) * weight;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_linear_interpolator_2d_center() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0], [2.0, 3.0]], &device);
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.5, 0.5], [1.0, 0.0], [0.25, 1.0]], &device);
        let values = LinearInterpolator::new()
            .interpolate(&data, indices)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert!((values[0] - 1.5).abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert!((values[2] - 2.25).abs() < 1e-6);
    }

    #[test]
    fn test_linear_interpolator_3d_matches_plane() {
        let device = Default::default();
        // value = x + 2y + 4z on a 3x3x3 grid; linear interpolation is exact.
        let mut values = Vec::new();
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    values.push((x + 2 * y + 4 * z) as f32);
                }
            }
        }
        let data = Tensor::<TestBackend, 3>::from_data(burn::tensor::TensorData::new(values, [3, 3, 3]), &device);
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.5, 1.25, 1.75], [2.0, 0.0, 1.0]], &device);
        let sampled = LinearInterpolator::new()
            .interpolate(&data, indices)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert!((sampled[0] - (0.5 + 2.5 + 7.0)).abs() < 1e-5);
        assert!((sampled[1] - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_linear_interpolator_clamps_at_border() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 2>::from_floats([[5.0, 7.0]], &device);
        let indices = Tensor::<TestBackend, 2>::from_floats([[-0.4, 0.0], [1.3, 0.0]], &device);
        let sampled = LinearInterpolator::new()
            .interpolate(&data, indices)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert!((sampled[0] - 5.0).abs() < 1e-6);
        assert!((sampled[1] - 7.0).abs() < 1e-6);
    }
}
