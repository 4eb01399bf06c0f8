//! Interpolation types and operations.
//!
//! This module provides interpolation traits and implementations
//! for sampling values at continuous coordinates.

pub mod trait_;
pub mod linear;
pub mod nearest;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;

/// Interpolation method selectable at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    NearestNeighbor,
    #[default]
    Linear,
}

impl<B: Backend> Interpolator<B> for Interpolation {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            Interpolation::NearestNeighbor => NearestNeighborInterpolator.interpolate(data, indices),
            Interpolation::Linear => LinearInterpolator.interpolate(data, indices),
        }
    }
}
