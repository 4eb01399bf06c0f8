//! Axis flip filter.

use std::marker::PhantomData;
use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use crate::image::Image;

/// Reverses voxel order along the selected axes. Geometry is unchanged.
pub struct FlipFilter<B: Backend, const D: usize> {
    axes: [bool; D],
    _b: PhantomData<B>,
}

impl<B: Backend, const D: usize> FlipFilter<B, D> {
    /// `axes[i]` selects axis `i` in `(x, y, z)` order.
    pub fn new(axes: [bool; D]) -> Self {
        Self {
            axes,
            _b: PhantomData,
        }
    }

    pub fn apply(&self, image: &Image<B, D>) -> Image<B, D> {
        let mut data = image.data().clone();
        let device = data.device();
        let dims = data.dims();

        for (axis, _) in self.axes.iter().enumerate().filter(|(_, flip)| **flip) {
            let dim = D - 1 - axis;
            let reversed: Vec<i32> = (0..dims[dim] as i32).rev().collect();
            let indices = Tensor::<B, 1, Int>::from_ints(reversed.as_slice(), &device);
            data = data.select(dim, indices);
        }

        image.with_data(data)
    }
}
