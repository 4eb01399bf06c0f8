use std::marker::PhantomData;
use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use crate::image::Image;

/// Shrink filter.
///
/// Reduces the image size by integer factors by keeping every Nth voxel,
/// starting at voxel 0. Spacing grows by the factor; the origin is unchanged
/// because the first kept voxel is the original first voxel.
pub struct ShrinkFilter<B: Backend, const D: usize> {
    factors: [usize; D],
    _b: PhantomData<B>,
}

impl<B: Backend, const D: usize> ShrinkFilter<B, D> {
    /// `factors` are in axis order; a factor of 1 leaves the axis untouched.
    pub fn new(factors: [usize; D]) -> Self {
        Self {
            factors,
            _b: PhantomData,
        }
    }

    /// Apply the filter to an image.
    ///
    /// Returns `None` when a factor is zero or exceeds the axis length.
    pub fn apply(&self, image: &Image<B, D>) -> Option<Image<B, D>> {
        let size = image.size();
        if (0..D).any(|i| self.factors[i] == 0 || self.factors[i] > size[i]) {
            return None;
        }

        let mut data = image.data().clone();
        let device = data.device();
        let mut spacing = *image.spacing();
        let mut new_size = size;

        for axis in 0..D {
            let factor = self.factors[axis];
            if factor == 1 {
                continue;
            }
            // 10 voxels, factor 3: keep 0, 3, 6.
            new_size[axis] = size[axis] / factor;
            let kept: Vec<i32> = (0..new_size[axis]).map(|i| (i * factor) as i32).collect();
            let indices = Tensor::<B, 1, Int>::from_ints(kept.as_slice(), &device);
            data = data.select(D - 1 - axis, indices);
            spacing[axis] *= factor as f64;
        }

        let geometry = image.geometry().set_size(new_size).set_spacing(spacing);
        Some(Image::from_geometry(data, &geometry, image.pixel_type()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageGeometry, PixelType};

    type TestBackend = burn_ndarray::NdArray<f32>;

    #[test]
    fn test_shrink_keeps_every_nth_voxel() {
        let device = Default::default();
        let geometry = ImageGeometry::with_default_metadata([5, 2]);
        let values: Vec<f32> = (0..10).map(|v| v as f32).collect();
        let image = Image::<TestBackend, 2>::from_voxels(values, &geometry, PixelType::Float32, &device);

        let shrunk = ShrinkFilter::new([2, 1]).apply(&image).unwrap();
        assert_eq!(shrunk.size(), [2, 2]);
        assert_eq!(shrunk.spacing()[0], 2.0);
        assert_eq!(shrunk.spacing()[1], 1.0);
        assert_eq!(shrunk.to_voxels(), vec![0.0, 2.0, 5.0, 7.0]);
    }

    #[test]
    fn test_shrink_rejects_bad_factors() {
        let device = Default::default();
        let geometry = ImageGeometry::with_default_metadata([3, 3]);
        let image = Image::<TestBackend, 2>::from_voxels(vec![0.0; 9], &geometry, PixelType::Float32, &device);
        assert!(ShrinkFilter::new([0, 1]).apply(&image).is_none());
        assert!(ShrinkFilter::new([4, 1]).apply(&image).is_none());
    }
}
