//! The transform trait every pipeline node implements.

use burn::tensor::backend::Backend;
use rand::RngCore;
use crate::error::Result;
use crate::gate::RandomApply;
use crate::sample::Sample;

/// A unit of work on an image and its optional mask.
///
/// `apply` consumes the sample and returns a new one. Randomness comes only
/// from `rng`, so a seeded generator reproduces a run exactly.
///
/// Contract for the mask: an absent mask stays absent unless the transform
/// documents that it derives one.
pub trait Transform<B: Backend, const D: usize>: std::fmt::Debug + Send + Sync {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>>;
}

impl<B: Backend, const D: usize, T: Transform<B, D> + ?Sized> Transform<B, D> for Box<T> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        (**self).apply(sample, rng)
    }
}

/// A boxed transform, the element type of every combinator.
pub type BoxedTransform<B, const D: usize> = Box<dyn Transform<B, D>>;

/// Convenience adapters for concrete transforms.
pub trait TransformExt<B: Backend, const D: usize>: Transform<B, D> + Sized + 'static {
    /// Run this transform with probability `p`.
    fn with_probability(self, p: f64) -> Result<RandomApply<B, D>> {
        RandomApply::new(self, p)
    }

    fn boxed(self) -> BoxedTransform<B, D> {
        Box::new(self)
    }
}

impl<B: Backend, const D: usize, T: Transform<B, D> + 'static> TransformExt<B, D> for T {}
