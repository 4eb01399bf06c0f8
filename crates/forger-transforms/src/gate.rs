//! Probabilistic application and the identity node.

use burn::tensor::backend::Backend;
use rand::{Rng, RngCore};
use tracing::debug;
use crate::error::{check_probability, Result};
use crate::sample::Sample;
use crate::transform::{BoxedTransform, Transform};

/// Applies the wrapped transform with probability `p`.
///
/// One uniform draw in `[0, 1)` per call; the transform runs when the draw
/// is below `p`. Otherwise the sample is returned as is, without copying.
#[derive(Debug)]
pub struct RandomApply<B: Backend, const D: usize> {
    inner: BoxedTransform<B, D>,
    p: f64,
}

impl<B: Backend, const D: usize> RandomApply<B, D> {
    /// Fails with `InvalidParameter` when `p` is outside `[0, 1]`.
    pub fn new(inner: impl Transform<B, D> + 'static, p: f64) -> Result<Self> {
        check_probability(p)?;
        Ok(Self {
            inner: Box::new(inner),
            p,
        })
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for RandomApply<B, D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let draw: f64 = rng.random();
        if draw < self.p {
            debug!(p = self.p, draw, "applying {:?}", self.inner);
            self.inner.apply(sample, rng)
        } else {
            debug!(p = self.p, draw, "skipping {:?}", self.inner);
            Ok(sample)
        }
    }
}

/// Returns its input, optionally as deep copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity {
    copy: bool,
}

impl Identity {
    pub fn new(copy: bool) -> Self {
        Self { copy }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Identity {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        if self.copy {
            Ok(sample.deep_copy())
        } else {
            Ok(sample)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use forger_core::{Image, ImageGeometry, PixelType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::compose::Lambda;
    use crate::error::TransformError;

    type TestBackend = NdArray<f32>;

    fn sample() -> Sample<TestBackend, 2> {
        let geometry = ImageGeometry::with_default_metadata([2, 2]);
        let image = Image::from_voxels(vec![1.0, 2.0, 3.0, 4.0], &geometry, PixelType::Float32, &Default::default());
        Sample::from_image(image)
    }

    fn add_ten() -> Lambda<TestBackend, 2> {
        Lambda::new(|image: Image<TestBackend, 2>| {
            let data = image.data().clone() + 10.0;
            Ok(image.with_data(data))
        })
    }

    #[test]
    fn test_invalid_probability() {
        assert!(matches!(RandomApply::<TestBackend, 2>::new(Identity::default(), -0.1), Err(TransformError::InvalidParameter { .. })));
        assert!(matches!(RandomApply::<TestBackend, 2>::new(Identity::default(), 1.1), Err(TransformError::InvalidParameter { .. })));
    }

    #[test]
    fn test_probability_boundaries() {
        let mut rng = StdRng::seed_from_u64(7);
        let always = RandomApply::new(add_ten(), 1.0).unwrap();
        let never = RandomApply::new(add_ten(), 0.0).unwrap();
        for _ in 0..50 {
            let applied = always.apply(sample(), &mut rng).unwrap();
            assert_eq!(applied.image().to_voxels(), vec![11.0, 12.0, 13.0, 14.0]);
            let skipped = never.apply(sample(), &mut rng).unwrap();
            assert_eq!(skipped.image().to_voxels(), vec![1.0, 2.0, 3.0, 4.0]);
        }
    }

    #[test]
    fn test_identity_copy() {
        let mut rng = StdRng::seed_from_u64(0);
        let original = sample();
        let copied = Identity::new(true).apply(original.clone(), &mut rng).unwrap();
        assert_eq!(copied.image().to_voxels(), original.image().to_voxels());
        assert_eq!(copied.image().geometry(), original.image().geometry());
        assert!(!copied.has_mask());
    }
}
