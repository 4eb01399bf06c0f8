//! Logical voxel types.
//!
//! Voxel data always lives in a float tensor. The pixel type records what the
//! values represent and drives casting after resampling.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

/// Scalar voxel type of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    #[default]
    Float32,
    Float64,
}

impl PixelType {
    /// Representable range for integer types, `None` for floating types.
    pub fn bounds(self) -> Option<(f64, f64)> {
        match self {
            PixelType::UInt8 => Some((u8::MIN as f64, u8::MAX as f64)),
            PixelType::Int8 => Some((i8::MIN as f64, i8::MAX as f64)),
            PixelType::UInt16 => Some((u16::MIN as f64, u16::MAX as f64)),
            PixelType::Int16 => Some((i16::MIN as f64, i16::MAX as f64)),
            PixelType::UInt32 => Some((u32::MIN as f64, u32::MAX as f64)),
            PixelType::Int32 => Some((i32::MIN as f64, i32::MAX as f64)),
            PixelType::Float32 | PixelType::Float64 => None,
        }
    }

    /// Round and saturate a single value into this type.
    pub fn cast_value(self, value: f64) -> f64 {
        match self.bounds() {
            Some((lo, hi)) => value.round().clamp(lo, hi),
            None => value,
        }
    }

    /// Round and saturate every voxel of a tensor into this type.
    pub fn cast_tensor<B: Backend, const D: usize>(self, data: Tensor<B, D>) -> Tensor<B, D> {
        match self.bounds() {
            Some((lo, hi)) => data.round().clamp(lo, hi),
            None => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_cast_value_saturates() {
        assert_eq!(PixelType::UInt8.cast_value(300.4), 255.0);
        assert_eq!(PixelType::UInt8.cast_value(-3.0), 0.0);
        assert_eq!(PixelType::Int16.cast_value(-1024.6), -1025.0);
        assert_eq!(PixelType::Float32.cast_value(0.25), 0.25);
    }

    #[test]
    fn test_cast_tensor_rounds_integers() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 1>::from_floats([0.4, 1.6, -7.0, 260.0], &device);
        let cast = PixelType::UInt8.cast_tensor(data);
        let values = cast.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 2.0, 0.0, 255.0]);
    }
}
