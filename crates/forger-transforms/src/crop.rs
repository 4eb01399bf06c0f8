//! Cropping and padding transforms.
//!
//! Crops cut the same window out of the image and the mask; the output
//! origin is the physical position of the window's first voxel, so both stay
//! co-registered.

use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;
use forger_core::filter::{ExtractRegionFilter, PadFilter, PadMethod};
use forger_core::{Image, Mask, PixelType};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::error::{check_len, Result, TransformError};
use crate::mask::{Background, ForegroundMask};
use crate::region::Region;
use crate::sample::Sample;
use crate::transform::Transform;

fn extract<B: Backend, const D: usize>(sample: Sample<B, D>, region: Region<D>) -> Result<Sample<B, D>> {
    debug!(index = ?region.index, size = ?region.size, "crop");
    let filter = ExtractRegionFilter::<B, D>::new(region.index, region.size);
    sample.try_map(
        |image| filter.apply(&image).ok_or_else(|| out_of_bounds(&region)),
        |mask| filter.apply(&mask).ok_or_else(|| out_of_bounds(&region)),
    )
}

fn out_of_bounds<const D: usize>(region: &Region<D>) -> TransformError {
    TransformError::invalid_region(format!(
        "region at {:?} of size {:?} leaves the image",
        region.index, region.size
    ))
}

fn require_mask<'a, B: Backend, const D: usize>(sample: &'a Sample<B, D>, name: &str) -> Result<&'a Mask<B, D>> {
    sample
        .mask()
        .ok_or_else(|| TransformError::missing_operand(format!("{} requires an image and a mask", name)))
}

/// Crops a fixed window.
#[derive(Debug, Clone)]
pub struct Crop {
    size: Vec<usize>,
    index: Vec<usize>,
}

impl Crop {
    pub fn new(size: Vec<usize>, index: Vec<usize>) -> Self {
        Self { size, index }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Crop {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let region = Region::fixed(&self.index, &self.size, sample.image().size())?;
        extract(sample, region)
    }
}

/// Crops a window of `size` centred in the image.
#[derive(Debug, Clone)]
pub struct CenterCrop {
    size: Vec<usize>,
}

impl CenterCrop {
    pub fn new(size: Vec<usize>) -> Self {
        Self { size }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for CenterCrop {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let region = Region::center(&self.size, sample.image().size())?;
        extract(sample, region)
    }
}

/// Crops a window of `size` at a uniformly drawn position.
#[derive(Debug, Clone)]
pub struct RandomCrop {
    size: Vec<usize>,
}

impl RandomCrop {
    pub fn new(size: Vec<usize>) -> Self {
        Self { size }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for RandomCrop {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let region = Region::random(&self.size, sample.image().size(), rng)?;
        extract(sample, region)
    }
}

/// What a segment crop does when none of its labels is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IfMissing {
    /// Fail with `EmptyRegion`.
    #[default]
    Raise,
    /// Return the sample unchanged.
    Ignore,
}

/// Crops to the bounding box of the voxels labelled with `include`.
#[derive(Debug, Clone)]
pub struct SegmentCrop {
    include: Vec<i64>,
    if_missing: IfMissing,
}

impl SegmentCrop {
    pub fn new(include: Vec<i64>) -> Self {
        Self {
            include,
            if_missing: IfMissing::Raise,
        }
    }

    pub fn with_if_missing(mut self, if_missing: IfMissing) -> Self {
        self.if_missing = if_missing;
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for SegmentCrop {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let mask = require_mask(&sample, "SegmentCrop")?;
        match (Region::segment_bounding_box(mask, &self.include), self.if_missing) {
            (Some(region), _) => extract(sample, region),
            (None, IfMissing::Ignore) => {
                warn!(include = ?self.include, "labels not found, segment crop skipped");
                Ok(sample)
            }
            (None, IfMissing::Raise) => Err(TransformError::EmptyRegion {
                labels: self.include.clone(),
            }),
        }
    }
}

/// Random crop that keeps at least one voxel of the `include` labels when
/// the mask has any.
#[derive(Debug, Clone)]
pub struct RandomSegmentSafeCrop {
    crop_size: Vec<usize>,
    include: Vec<i64>,
}

impl RandomSegmentSafeCrop {
    pub fn new(crop_size: Vec<usize>, include: Vec<i64>) -> Self {
        Self { crop_size, include }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for RandomSegmentSafeCrop {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let mask = require_mask(&sample, "SegmentSafeCrop")?;
        let region = Region::segment_safe_random(mask, &self.include, &self.crop_size, rng)?;
        extract(sample, region)
    }
}

/// Crops to the bounding box of the automatically thresholded foreground.
///
/// The threshold follows [`ForegroundMask`]; the mask, when present, is cut
/// with the image and is not replaced.
#[derive(Debug, Clone)]
pub struct ForegroundCrop {
    foreground: ForegroundMask,
}

impl ForegroundCrop {
    pub fn new(background: Background, bins: usize) -> Result<Self> {
        Ok(Self {
            foreground: ForegroundMask::new(background, bins)?,
        })
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for ForegroundCrop {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let foreground = self.foreground.compute(sample.image(), PixelType::UInt8);
        match Region::segment_bounding_box(&foreground, &[self.foreground.foreground_label()]) {
            Some(region) => extract(sample, region),
            None => Err(TransformError::invalid_region("image has no foreground voxel to crop to")),
        }
    }
}

/// Pads every axis by `padding[i]` voxels on the selected sides.
///
/// The image is filled with `constant` (the image minimum when unset) or
/// mirrored; the mask with `background_label` or mirrored.
#[derive(Debug, Clone)]
pub struct Pad {
    padding: Vec<usize>,
    method: PadMethod,
    constant: Option<f64>,
    background_label: f64,
    pad_lower: bool,
    pad_upper: bool,
}

impl Pad {
    pub fn new(padding: Vec<usize>) -> Self {
        Self {
            padding,
            method: PadMethod::Constant,
            constant: None,
            background_label: 0.0,
            pad_lower: true,
            pad_upper: true,
        }
    }

    pub fn with_method(mut self, method: PadMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = Some(constant);
        self
    }

    pub fn with_background_label(mut self, label: f64) -> Self {
        self.background_label = label;
        self
    }

    pub fn with_sides(mut self, lower: bool, upper: bool) -> Self {
        self.pad_lower = lower;
        self.pad_upper = upper;
        self
    }

    fn filter<B: Backend, const D: usize>(&self, fill: f64) -> PadFilter<B, D> {
        let side = |enabled: bool| -> [usize; D] {
            std::array::from_fn(|i| if enabled { self.padding[i] } else { 0 })
        };
        PadFilter::new(side(self.pad_lower), side(self.pad_upper))
            .with_method(self.method)
            .with_constant(fill)
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Pad {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        check_len("padding", &self.padding, D)?;
        let constant = self.constant.unwrap_or_else(|| image_minimum(sample.image()));
        let image_filter = self.filter::<B, D>(constant);
        let mask_filter = self.filter::<B, D>(self.background_label);
        let too_wide = || TransformError::invalid_region("mirror padding must be smaller than the image size");

        sample.try_map(
            |image| image_filter.apply(&image).ok_or_else(too_wide),
            |mask| mask_filter.apply(&mask).ok_or_else(too_wide),
        )
    }
}

fn image_minimum<B: Backend, const D: usize>(image: &Image<B, D>) -> f64 {
    image.data().clone().min().into_scalar().elem::<f64>()
}
