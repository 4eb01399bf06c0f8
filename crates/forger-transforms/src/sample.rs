//! Paired image and optional mask.

use burn::tensor::backend::Backend;
use forger_core::{Image, Mask};
use crate::error::{Result, TransformError};

/// An image with an optional co-registered mask.
///
/// Every transform consumes a `Sample` and returns a new one. When a mask is
/// present it has the same size as the image.
#[derive(Debug, Clone)]
pub struct Sample<B: Backend, const D: usize> {
    image: Image<B, D>,
    mask: Option<Mask<B, D>>,
}

impl<B: Backend, const D: usize> Sample<B, D> {
    /// Pair an image with an optional mask.
    ///
    /// Fails with `DimensionMismatch` when the mask size differs from the
    /// image size.
    pub fn new(image: Image<B, D>, mask: Option<Mask<B, D>>) -> Result<Self> {
        if let Some(mask) = &mask {
            check_sizes(&image, mask)?;
        }
        Ok(Self { image, mask })
    }

    /// An image without a mask.
    pub fn from_image(image: Image<B, D>) -> Self {
        Self { image, mask: None }
    }

    pub fn image(&self) -> &Image<B, D> {
        &self.image
    }

    pub fn mask(&self) -> Option<&Mask<B, D>> {
        self.mask.as_ref()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn into_parts(self) -> (Image<B, D>, Option<Mask<B, D>>) {
        (self.image, self.mask)
    }

    /// Apply `f` to the image and, when present, `g` to the mask.
    ///
    /// The sizes of the results are checked again.
    pub fn try_map<F, G>(self, f: F, g: G) -> Result<Self>
    where
        F: FnOnce(Image<B, D>) -> Result<Image<B, D>>,
        G: FnOnce(Mask<B, D>) -> Result<Mask<B, D>>,
    {
        let image = f(self.image)?;
        let mask = self.mask.map(g).transpose()?;
        Self::new(image, mask)
    }

    /// Replace the image, keeping the mask.
    pub fn with_image(self, image: Image<B, D>) -> Result<Self> {
        Self::new(image, self.mask)
    }

    /// Replace the mask, keeping the image.
    pub fn with_mask(self, mask: Option<Mask<B, D>>) -> Result<Self> {
        Self::new(self.image, mask)
    }

    /// Copy both voxel buffers.
    pub fn deep_copy(&self) -> Self {
        Self {
            image: self.image.deep_copy(),
            mask: self.mask.as_ref().map(Image::deep_copy),
        }
    }
}

fn check_sizes<B: Backend, const D: usize>(image: &Image<B, D>, mask: &Mask<B, D>) -> Result<()> {
    let (image_size, mask_size) = (image.size(), mask.size());
    if image_size != mask_size {
        let join = |size: [usize; D]| size.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");
        return Err(TransformError::dimension_mismatch(format!(
            "image and mask size should be equal, but ({}) != ({})",
            join(image_size),
            join(mask_size)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use forger_core::{ImageGeometry, PixelType};

    type TestBackend = NdArray<f32>;

    fn image(size: [usize; 2]) -> Image<TestBackend, 2> {
        let geometry = ImageGeometry::with_default_metadata(size);
        Image::from_voxels(vec![0.0; size[0] * size[1]], &geometry, PixelType::UInt8, &Default::default())
    }

    #[test]
    fn test_sample_accepts_matching_mask() {
        let sample = Sample::new(image([3, 2]), Some(image([3, 2]))).unwrap();
        assert!(sample.has_mask());
        assert_eq!(sample.image().size(), [3, 2]);
    }

    #[test]
    fn test_sample_rejects_mismatched_mask() {
        let err = Sample::new(image([3, 2]), Some(image([2, 3]))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: image and mask size should be equal, but (3, 2) != (2, 3)"
        );
    }

    #[test]
    fn test_try_map_skips_absent_mask() {
        let sample = Sample::from_image(image([2, 2]));
        let mapped = sample
            .try_map(Ok, |_| panic!("mask closure must not run without a mask"))
            .unwrap();
        assert!(!mapped.has_mask());
    }
}
