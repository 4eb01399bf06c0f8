//! Padding filter.

use std::marker::PhantomData;
use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use crate::image::Image;

/// How padded voxels are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PadMethod {
    /// Fill with a constant value.
    #[default]
    Constant,
    /// Reflect about the border voxel, which is not repeated.
    Mirror,
}

/// Grows an image by `lower[i]` voxels before and `upper[i]` voxels after
/// axis `i`. The origin shifts so existing voxels keep their physical
/// position.
pub struct PadFilter<B: Backend, const D: usize> {
    lower: [usize; D],
    upper: [usize; D],
    method: PadMethod,
    constant: f64,
    _b: PhantomData<B>,
}

impl<B: Backend, const D: usize> PadFilter<B, D> {
    pub fn new(lower: [usize; D], upper: [usize; D]) -> Self {
        Self {
            lower,
            upper,
            method: PadMethod::Constant,
            constant: 0.0,
            _b: PhantomData,
        }
    }

    pub fn with_method(mut self, method: PadMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    /// Apply the filter to an image.
    ///
    /// Returns `None` for mirror padding wider than `size - 1` on any axis.
    pub fn apply(&self, image: &Image<B, D>) -> Option<Image<B, D>> {
        let size = image.size();
        if self.method == PadMethod::Mirror
            && (0..D).any(|i| self.lower[i] >= size[i] || self.upper[i] >= size[i])
        {
            return None;
        }

        let mut data = image.data().clone();
        for axis in 0..D {
            let (lo, hi) = (self.lower[axis], self.upper[axis]);
            if lo == 0 && hi == 0 {
                continue;
            }
            let dim = D - 1 - axis;
            data = match self.method {
                PadMethod::Constant => self.pad_constant(data, dim, lo, hi),
                PadMethod::Mirror => Self::pad_mirror(data, dim, lo, hi),
            };
        }

        let start: [f64; D] = std::array::from_fn(|i| -(self.lower[i] as f64));
        let new_size: [usize; D] = std::array::from_fn(|i| size[i] + self.lower[i] + self.upper[i]);
        let geometry = image
            .geometry()
            .set_origin(image.geometry().index_to_physical(&start))
            .set_size(new_size);

        Some(Image::from_geometry(data, &geometry, image.pixel_type()))
    }

    fn pad_constant(&self, data: Tensor<B, D>, dim: usize, lo: usize, hi: usize) -> Tensor<B, D> {
        let device = data.device();
        let mut parts = Vec::with_capacity(3);
        let mut block = data.dims();
        if lo > 0 {
            block[dim] = lo;
            parts.push(Tensor::full(block, self.constant, &device));
        }
        parts.push(data);
        if hi > 0 {
            block[dim] = hi;
            parts.push(Tensor::full(block, self.constant, &device));
        }
        Tensor::cat(parts, dim)
    }

    fn pad_mirror(data: Tensor<B, D>, dim: usize, lo: usize, hi: usize) -> Tensor<B, D> {
        let device = data.device();
        let n = data.dims()[dim] as i32;
        let (lo, hi) = (lo as i32, hi as i32);

        // lo..1, 0..n, n-2..n-1-hi
        let indices: Vec<i32> = (1..=lo)
            .rev()
            .chain(0..n)
            .chain((n - 1 - hi..n - 1).rev())
            .collect();
        data.select(dim, Tensor::<B, 1, Int>::from_ints(indices.as_slice(), &device))
    }
}
