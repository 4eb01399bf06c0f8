//! Crop window selection.
//!
//! Every selector returns a [`Region`] that lies inside the image, or fails.
//! Sizes arrive as slices so a wrong tuple length is reported instead of
//! rejected by the type system.

use burn::tensor::backend::Backend;
use forger_core::image::flat_to_index;
use forger_core::Mask;
use rand::{Rng, RngCore};
use tracing::{debug, warn};
use crate::error::{axis_name, check_len, Result, TransformError};

/// An axis-ordered index and size identifying a sub-grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region<const D: usize> {
    pub index: [usize; D],
    pub size: [usize; D],
}

impl<const D: usize> Region<D> {
    /// Whether the axis-ordered `voxel` lies inside the region.
    pub fn contains(&self, voxel: [usize; D]) -> bool {
        (0..D).all(|i| voxel[i] >= self.index[i] && voxel[i] < self.index[i] + self.size[i])
    }

    /// A region at `index` with `size`.
    ///
    /// Fails with `InvalidRegion` when `index + size` exceeds the image size
    /// on any axis or any size is zero.
    pub fn fixed(index: &[usize], size: &[usize], image_size: [usize; D]) -> Result<Self> {
        check_len("size", size, D)?;
        check_len("index", index, D)?;
        let outside = |i: usize| index[i].checked_add(size[i]).map_or(true, |end| end > image_size[i]);
        if (0..D).any(|i| size[i] == 0 || outside(i)) {
            return Err(TransformError::invalid_region("size + index cannot be greater than image size"));
        }
        Ok(Self {
            index: to_array(index),
            size: to_array(size),
        })
    }

    /// The region of `size` centred in the image, `floor((image - size) / 2)`.
    pub fn center(size: &[usize], image_size: [usize; D]) -> Result<Self> {
        check_len("size", size, D)?;
        if (0..D).any(|i| size[i] > image_size[i]) {
            return Err(TransformError::invalid_region("size cannot be larger than image size"));
        }
        let size = to_array(size);
        Ok(Self {
            index: std::array::from_fn(|i| (image_size[i] - size[i]) / 2),
            size,
        })
    }

    /// A region of `size` at a uniformly drawn position.
    pub fn random(size: &[usize], image_size: [usize; D], rng: &mut dyn RngCore) -> Result<Self> {
        check_len("size", size, D)?;
        for axis in 0..D {
            if size[axis] > image_size[axis] {
                let name = axis_name(axis);
                return Err(TransformError::invalid_region(format!(
                    "cropped region {name} ({}) cannot be larger than image {name} ({})",
                    size[axis], image_size[axis]
                )));
            }
        }
        let size = to_array(size);
        let index = std::array::from_fn(|i| rng.random_range(0..=image_size[i] - size[i]));
        Ok(Self { index, size })
    }

    /// Tight bounding box of the voxels whose label is in `labels`.
    ///
    /// `None` when no voxel carries any of the labels.
    pub fn segment_bounding_box<B: Backend>(mask: &Mask<B, D>, labels: &[i64]) -> Option<Self> {
        let size = mask.size();
        let mut lo = size;
        let mut hi = [0usize; D];
        let mut found = false;

        for flat in labelled_voxels(mask, labels) {
            let voxel = flat_to_index(flat, size);
            for i in 0..D {
                lo[i] = lo[i].min(voxel[i]);
                hi[i] = hi[i].max(voxel[i]);
            }
            found = true;
        }

        found.then(|| Self {
            index: lo,
            size: std::array::from_fn(|i| hi[i] - lo[i] + 1),
        })
    }

    /// A random region of `size` that contains at least one voxel labelled
    /// with one of `labels`, when such a voxel exists.
    ///
    /// A random labelled voxel is picked first, then the window offset is
    /// drawn among those that keep it inside and stay within the grid. With
    /// no labelled voxel this degrades to [`Region::random`].
    pub fn segment_safe_random<B: Backend>(
        mask: &Mask<B, D>,
        labels: &[i64],
        size: &[usize],
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        let image_size = mask.size();
        check_len("crop_size", size, D)?;
        if (0..D).any(|i| size[i] > image_size[i]) {
            return Err(TransformError::invalid_region("crop_size must be less than or equal to image size"));
        }
        if size.contains(&0) {
            return Err(TransformError::invalid_region(format!("crop_size entries must be positive (got {:?})", size)));
        }

        let candidates: Vec<usize> = labelled_voxels(mask, labels).collect();
        if candidates.is_empty() {
            warn!(?labels, "no voxel carries the requested labels, cropping at random");
            return Self::random(size, image_size, rng);
        }

        let anchor = flat_to_index(candidates[rng.random_range(0..candidates.len())], image_size);
        let size = to_array(size);
        let index = std::array::from_fn(|i| {
            let lowest = (anchor[i] + 1).saturating_sub(size[i]);
            let highest = anchor[i].min(image_size[i] - size[i]);
            rng.random_range(lowest..=highest)
        });
        debug!(?anchor, ?index, ?size, "segment safe crop");
        Ok(Self { index, size })
    }
}

/// Flat storage offsets of voxels whose rounded value is in `labels`.
pub fn labelled_voxels<B: Backend, const D: usize>(
    mask: &Mask<B, D>,
    labels: &[i64],
) -> impl Iterator<Item = usize> {
    let values = mask.to_voxels();
    let labels = labels.to_vec();
    values
        .into_iter()
        .enumerate()
        .filter(move |(_, v)| labels.contains(&(v.round() as i64)))
        .map(|(flat, _)| flat)
}

fn to_array<const D: usize>(values: &[usize]) -> [usize; D] {
    std::array::from_fn(|i| values[i])
}
