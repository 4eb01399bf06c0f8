//! Region extraction filter.

use std::marker::PhantomData;
use burn::tensor::backend::Backend;
use crate::image::Image;

/// Extracts the sub-grid starting at `index` with extent `size`.
///
/// Index and size are in axis order. The output origin is the physical
/// position of `index` in the input, so the extracted voxels keep their
/// physical location.
pub struct ExtractRegionFilter<B: Backend, const D: usize> {
    index: [usize; D],
    size: [usize; D],
    _b: PhantomData<B>,
}

impl<B: Backend, const D: usize> ExtractRegionFilter<B, D> {
    pub fn new(index: [usize; D], size: [usize; D]) -> Self {
        Self {
            index,
            size,
            _b: PhantomData,
        }
    }

    /// Apply the filter to an image.
    ///
    /// Returns `None` when the region leaves the image on any axis or is empty.
    pub fn apply(&self, image: &Image<B, D>) -> Option<Image<B, D>> {
        let image_size = image.size();
        let fits = (0..D).all(|i| {
            self.size[i] > 0
                && self.index[i]
                    .checked_add(self.size[i])
                    .is_some_and(|end| end <= image_size[i])
        });
        if !fits {
            return None;
        }

        // Tensor dim `t` holds axis `D - 1 - t`.
        let ranges: [std::ops::Range<usize>; D] = std::array::from_fn(|t| {
            let axis = D - 1 - t;
            self.index[axis]..self.index[axis] + self.size[axis]
        });
        let data = image.data().clone().slice(ranges);

        let start: [f64; D] = std::array::from_fn(|i| self.index[i] as f64);
        let geometry = image
            .geometry()
            .set_origin(image.geometry().index_to_physical(&start))
            .set_size(self.size);

        Some(Image::from_geometry(data, &geometry, image.pixel_type()))
    }
}
