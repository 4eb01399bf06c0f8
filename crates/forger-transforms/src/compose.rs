//! Combinators that sequence, shuffle or pick transforms.
//!
//! Combinators thread the sample from one member to the next. An absent mask
//! is passed along as absent; members decide what to do with it.

use std::collections::BTreeMap;
use std::fmt;
use burn::tensor::backend::Backend;
use forger_core::{Image, Mask};
use rand::seq::{index, SliceRandom};
use rand::{Rng, RngCore};
use tracing::debug;
use crate::error::{Result, TransformError};
use crate::sample::Sample;
use crate::transform::{BoxedTransform, Transform};

/// Applies each transform in order. An empty list is the identity.
#[derive(Debug, Default)]
pub struct Compose<B: Backend, const D: usize> {
    transforms: Vec<BoxedTransform<B, D>>,
}

impl<B: Backend, const D: usize> Compose<B, D> {
    pub fn new(transforms: Vec<BoxedTransform<B, D>>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Compose<B, D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        run_sequence(&self.transforms, 0..self.transforms.len(), sample, rng)
    }
}

fn run_sequence<B: Backend, const D: usize>(
    transforms: &[BoxedTransform<B, D>],
    order: impl IntoIterator<Item = usize>,
    sample: Sample<B, D>,
    rng: &mut dyn RngCore,
) -> Result<Sample<B, D>> {
    order
        .into_iter()
        .try_fold(sample, |sample, i| transforms[i].apply(sample, rng))
}

/// Applies every transform once, in a fresh random order per call.
#[derive(Debug)]
pub struct RandomOrder<B: Backend, const D: usize> {
    transforms: Vec<BoxedTransform<B, D>>,
}

impl<B: Backend, const D: usize> RandomOrder<B, D> {
    pub fn new(transforms: Vec<BoxedTransform<B, D>>) -> Self {
        Self { transforms }
    }

    /// A uniformly random permutation of the member indices.
    pub fn order(&self, rng: &mut dyn RngCore) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.transforms.len()).collect();
        order.shuffle(rng);
        order
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for RandomOrder<B, D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let order = self.order(rng);
        debug!(?order, "random order");
        run_sequence(&self.transforms, order, sample, rng)
    }
}

/// Applies `k` transforms drawn from the pool.
///
/// Without replacement `k` may not exceed the pool size. With
/// `keep_original_order` the drawn members run in pool order, otherwise in
/// draw order.
#[derive(Debug)]
pub struct RandomChoices<B: Backend, const D: usize> {
    transforms: Vec<BoxedTransform<B, D>>,
    k: usize,
    keep_original_order: bool,
    with_replacement: bool,
}

impl<B: Backend, const D: usize> RandomChoices<B, D> {
    /// Draw `k` distinct members per call.
    pub fn new(transforms: Vec<BoxedTransform<B, D>>, k: usize, keep_original_order: bool) -> Result<Self> {
        Self::build(transforms, k, keep_original_order, false)
    }

    /// Draw `k` members per call, repeats allowed.
    pub fn with_replacement(transforms: Vec<BoxedTransform<B, D>>, k: usize, keep_original_order: bool) -> Result<Self> {
        Self::build(transforms, k, keep_original_order, true)
    }

    fn build(
        transforms: Vec<BoxedTransform<B, D>>,
        k: usize,
        keep_original_order: bool,
        with_replacement: bool,
    ) -> Result<Self> {
        let pool = transforms.len();
        if (!with_replacement && k > pool) || (pool == 0 && k > 0) {
            return Err(TransformError::invalid_parameter(
                "k",
                format!("cannot choose {} transforms from a pool of {}", k, pool),
            ));
        }
        Ok(Self {
            transforms,
            k,
            keep_original_order,
            with_replacement,
        })
    }

    /// Indices of the members to run, in run order.
    pub fn choose(&self, rng: &mut dyn RngCore) -> Vec<usize> {
        let pool = self.transforms.len();
        let mut chosen: Vec<usize> = if self.with_replacement {
            (0..self.k).map(|_| rng.random_range(0..pool)).collect()
        } else {
            index::sample(rng, pool, self.k).into_vec()
        };
        if self.keep_original_order {
            chosen.sort_unstable();
        }
        chosen
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for RandomChoices<B, D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let chosen = self.choose(rng);
        debug!(?chosen, "random choices");
        run_sequence(&self.transforms, chosen, sample, rng)
    }
}

/// Applies exactly one member, picked uniformly.
#[derive(Debug)]
pub struct OneOf<B: Backend, const D: usize> {
    transforms: Vec<BoxedTransform<B, D>>,
}

impl<B: Backend, const D: usize> OneOf<B, D> {
    /// Fails with `InvalidParameter` on an empty list.
    pub fn new(transforms: Vec<BoxedTransform<B, D>>) -> Result<Self> {
        if transforms.is_empty() {
            return Err(TransformError::invalid_parameter(
                "transforms",
                "OneOf needs at least one transform",
            ));
        }
        Ok(Self { transforms })
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for OneOf<B, D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let pick = rng.random_range(0..self.transforms.len());
        debug!(pick, "one of");
        self.transforms[pick].apply(sample, rng)
    }
}

/// Candidate values per named parameter.
///
/// `combinations` expands the grid into its cross product. Parameters vary
/// in name order, the last name fastest.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid<P> {
    axes: BTreeMap<String, Vec<P>>,
}

impl<P: Clone> ParamGrid<P> {
    pub fn new() -> Self {
        Self { axes: BTreeMap::new() }
    }

    pub fn with_param(mut self, name: impl Into<String>, candidates: Vec<P>) -> Self {
        self.axes.insert(name.into(), candidates);
        self
    }

    /// Every assignment of one candidate to each parameter.
    pub fn combinations(&self) -> Vec<BTreeMap<String, P>> {
        self.axes.iter().fold(vec![BTreeMap::new()], |partial, (name, candidates)| {
            partial
                .iter()
                .flat_map(|assignment| {
                    candidates.iter().map(move |value| {
                        let mut next = assignment.clone();
                        next.insert(name.clone(), value.clone());
                        next
                    })
                })
                .collect()
        })
    }
}

/// One transform per parameter combination, run in sequence.
///
/// Expansion happens once, at construction; `apply` just runs the
/// resulting `Compose`.
#[derive(Debug)]
pub struct Factory<B: Backend, const D: usize> {
    compose: Compose<B, D>,
}

impl<B: Backend, const D: usize> Factory<B, D> {
    pub fn new<P, F>(grid: &ParamGrid<P>, build: F) -> Result<Self>
    where
        P: Clone,
        F: Fn(&BTreeMap<String, P>) -> Result<BoxedTransform<B, D>>,
    {
        let transforms = grid
            .combinations()
            .iter()
            .map(build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            compose: Compose::new(transforms),
        })
    }

    pub fn len(&self) -> usize {
        self.compose.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compose.is_empty()
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Factory<B, D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        self.compose.apply(sample, rng)
    }
}

type ImageFn<B, const D: usize> = Box<dyn Fn(Image<B, D>) -> Result<Image<B, D>> + Send + Sync>;
type MaskFn<B, const D: usize> = Box<dyn Fn(Mask<B, D>) -> Result<Mask<B, D>> + Send + Sync>;

/// Applies user closures to the image and, when present, the mask.
pub struct Lambda<B: Backend, const D: usize> {
    image_fn: ImageFn<B, D>,
    mask_fn: Option<MaskFn<B, D>>,
}

impl<B: Backend, const D: usize> Lambda<B, D> {
    pub fn new<F>(image_fn: F) -> Self
    where
        F: Fn(Image<B, D>) -> Result<Image<B, D>> + Send + Sync + 'static,
    {
        Self {
            image_fn: Box::new(image_fn),
            mask_fn: None,
        }
    }

    pub fn with_mask_fn<G>(mut self, mask_fn: G) -> Self
    where
        G: Fn(Mask<B, D>) -> Result<Mask<B, D>> + Send + Sync + 'static,
    {
        self.mask_fn = Some(Box::new(mask_fn));
        self
    }
}

impl<B: Backend, const D: usize> fmt::Debug for Lambda<B, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda")
            .field("mask_fn", &self.mask_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Lambda<B, D> {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let (image, mask) = sample.into_parts();
        let image = (self.image_fn)(image)?;
        let mask = match (&self.mask_fn, mask) {
            (Some(mask_fn), Some(mask)) => Some(mask_fn(mask)?),
            (_, mask) => mask,
        };
        Sample::new(image, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_grid_cross_product() {
        let grid = ParamGrid::new()
            .with_param("a", vec![1, 2])
            .with_param("b", vec![10, 20, 30]);
        let combinations = grid.combinations();

        assert_eq!(combinations.len(), 6);
        assert_eq!(combinations[0]["a"], 1);
        assert_eq!(combinations[0]["b"], 10);
        assert_eq!(combinations[1]["b"], 20);
        assert_eq!(combinations[5]["a"], 2);
        assert_eq!(combinations[5]["b"], 30);
    }

    #[test]
    fn test_empty_grid_has_one_empty_combination() {
        let grid = ParamGrid::<u8>::new();
        assert_eq!(grid.combinations(), vec![BTreeMap::new()]);
    }
}
