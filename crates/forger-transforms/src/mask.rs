//! Intensity and label transforms.
//!
//! None of these move voxels; they rewrite values of the image, the mask or
//! both. Mask labels are compared after rounding to the nearest integer.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::str::FromStr;
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};
use forger_core::image::{flat_to_index, index_to_flat};
use forger_core::{Image, Mask, PixelType};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::{Result, TransformError};
use crate::sample::Sample;
use crate::transform::Transform;

fn labelled<B: Backend, const D: usize>(mask: &Mask<B, D>, label: i64) -> Tensor<B, D, Bool> {
    mask.data().clone().round().equal_elem(label as f64)
}

fn check_bounds(lower: f64, upper: f64, strict: bool) -> Result<()> {
    let ordered = if strict { lower < upper } else { lower <= upper };
    if !ordered {
        return Err(TransformError::invalid_parameter(
            "lower_bound",
            format!("lower_bound must be smaller than upper_bound ({} >= {})", lower, upper),
        ));
    }
    Ok(())
}

/// Relabels mask voxels; labels missing from the map are kept.
///
/// All entries are applied to the original labels, so `{1: 2, 2: 1}` swaps.
#[derive(Debug, Clone)]
pub struct MaskLabelRemap {
    map: BTreeMap<i64, i64>,
}

impl MaskLabelRemap {
    pub fn new(map: BTreeMap<i64, i64>) -> Self {
        Self { map }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for MaskLabelRemap {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        sample.try_map(Ok, |mask| {
            let remapped = self
                .map
                .iter()
                .fold(mask.data().clone(), |data, (from, to)| data.mask_fill(labelled(&mask, *from), *to as f64));
            Ok(mask.with_data(remapped))
        })
    }
}

/// Keeps only the voxels of one label.
///
/// Image voxels outside the label become `image_outside_value`, mask voxels
/// outside become `mask_outside_label`.
#[derive(Debug, Clone)]
pub struct MaskImage {
    label: i64,
    image_outside_value: f64,
    mask_outside_label: i64,
}

impl MaskImage {
    pub fn new(label: i64) -> Self {
        Self {
            label,
            image_outside_value: 0.0,
            mask_outside_label: 0,
        }
    }

    pub fn with_image_outside_value(mut self, value: f64) -> Self {
        self.image_outside_value = value;
        self
    }

    pub fn with_mask_outside_label(mut self, label: i64) -> Self {
        self.mask_outside_label = label;
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for MaskImage {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let outside = match sample.mask() {
            Some(mask) => labelled(mask, self.label).bool_not(),
            None => return Err(TransformError::missing_operand("MaskImage requires an image and a mask")),
        };
        let (image, mask) = sample.into_parts();
        let image = image.with_data(image.data().clone().mask_fill(outside.clone(), self.image_outside_value));
        let mask = mask.map(|mask| mask.with_data(mask.data().clone().mask_fill(outside, self.mask_outside_label as f64)));
        Sample::new(image, mask)
    }
}

/// Keeps image intensities inside `[lower, upper]`.
///
/// Voxels outside the range become `image_outside_value`. With
/// `recompute_mask` the mask is replaced (or created) from the range:
/// `mask_label` inside, `0` outside.
#[derive(Debug, Clone)]
pub struct IsolateRange {
    lower: f64,
    upper: f64,
    image_outside_value: f64,
    recompute_mask: bool,
    mask_label: i64,
}

impl IsolateRange {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        check_bounds(lower, upper, true)?;
        Ok(Self {
            lower,
            upper,
            image_outside_value: 0.0,
            recompute_mask: false,
            mask_label: 1,
        })
    }

    pub fn with_image_outside_value(mut self, value: f64) -> Self {
        self.image_outside_value = value;
        self
    }

    pub fn with_recompute_mask(mut self, mask_label: i64) -> Self {
        self.recompute_mask = true;
        self.mask_label = mask_label;
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for IsolateRange {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let (image, mask) = sample.into_parts();
        let data = image.data().clone();
        let below = data.clone().lower_elem(self.lower);
        let above = data.clone().greater_elem(self.upper);

        let mask = if self.recompute_mask {
            let inside = data
                .ones_like()
                .mul_scalar(self.mask_label as f64)
                .mask_fill(below.clone(), 0.0)
                .mask_fill(above.clone(), 0.0);
            let pixel_type = mask.as_ref().map_or(PixelType::UInt8, |mask| mask.pixel_type());
            debug!(lower = self.lower, upper = self.upper, "mask recomputed from intensity range");
            Some(Image::from_geometry(inside, &image.geometry(), pixel_type))
        } else {
            mask
        };
        let data = data
            .mask_fill(below, self.image_outside_value)
            .mask_fill(above, self.image_outside_value);
        let image = image.with_data(data);
        Sample::new(image, mask)
    }
}

/// Saturates image intensities to `[lower, upper]`.
#[derive(Debug, Clone)]
pub struct Clip {
    lower: f64,
    upper: f64,
}

impl Clip {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        check_bounds(lower, upper, false)?;
        Ok(Self { lower, upper })
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Clip {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        sample.try_map(
            |image| Ok(image.with_data(image.data().clone().clamp(self.lower, self.upper))),
            Ok,
        )
    }
}

/// Which side of the threshold counts as background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    /// `value < threshold`
    Below,
    /// `value <= threshold`
    BelowOrEqual,
    /// `value > threshold`
    Above,
    /// `value >= threshold`
    AboveOrEqual,
}

impl Background {
    fn select<B: Backend, const D: usize>(self, data: Tensor<B, D>, threshold: f64) -> Tensor<B, D, Bool> {
        match self {
            Background::Below => data.lower_elem(threshold),
            Background::BelowOrEqual => data.lower_equal_elem(threshold),
            Background::Above => data.greater_elem(threshold),
            Background::AboveOrEqual => data.greater_equal_elem(threshold),
        }
    }
}

impl FromStr for Background {
    type Err = TransformError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "<" => Ok(Background::Below),
            "<=" => Ok(Background::BelowOrEqual),
            ">" => Ok(Background::Above),
            ">=" => Ok(Background::AboveOrEqual),
            _ => Err(TransformError::invalid_parameter(
                "background",
                "Valid background calculation values are:  <, <=, >, and >=",
            )),
        }
    }
}

/// Threshold maximising the between-class variance of a `bins`-bin
/// histogram of `values` (Otsu). A constant input returns its value.
pub fn otsu_threshold(values: &[f32], bins: usize) -> f64 {
    let (low, high) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v as f64), hi.max(*v as f64)));
    if !(high > low) || bins < 2 {
        return if low.is_finite() { low } else { 0.0 };
    }

    let width = (high - low) / bins as f64;
    let mut histogram = vec![0f64; bins];
    for v in values {
        let bin = ((*v as f64 - low) / width) as usize;
        histogram[bin.min(bins - 1)] += 1.0;
    }

    let total: f64 = histogram.iter().sum();
    let weighted: f64 = histogram.iter().enumerate().map(|(i, count)| i as f64 * count).sum();
    let (mut below, mut below_weighted) = (0.0, 0.0);
    let (mut best, mut best_bin) = (f64::NEG_INFINITY, 0);
    for (bin, count) in histogram.iter().enumerate().take(bins - 1) {
        below += count;
        below_weighted += bin as f64 * count;
        let above = total - below;
        if below == 0.0 || above == 0.0 {
            continue;
        }
        let gap = below_weighted / below - (weighted - below_weighted) / above;
        let between = below * above * gap * gap;
        if between > best {
            best = between;
            best_bin = bin;
        }
    }
    low + (best_bin + 1) as f64 * width
}

/// Derives the mask from an automatic intensity threshold.
///
/// Voxels on the `background` side of the Otsu threshold get label `0`,
/// every other voxel `foreground_label`. Any previous mask is replaced and
/// its pixel type kept; a new mask is `UInt8`.
#[derive(Debug, Clone)]
pub struct ForegroundMask {
    background: Background,
    bins: usize,
    foreground_label: i64,
}

impl ForegroundMask {
    pub fn new(background: Background, bins: usize) -> Result<Self> {
        if bins < 2 {
            return Err(TransformError::invalid_parameter(
                "bins",
                format!("histogram needs at least 2 bins (got {})", bins),
            ));
        }
        Ok(Self {
            background,
            bins,
            foreground_label: 1,
        })
    }

    pub fn with_foreground_label(mut self, label: i64) -> Self {
        self.foreground_label = label;
        self
    }

    pub fn foreground_label(&self) -> i64 {
        self.foreground_label
    }

    /// Foreground mask of `image` with the given pixel type.
    pub fn compute<B: Backend, const D: usize>(&self, image: &Image<B, D>, pixel_type: PixelType) -> Mask<B, D> {
        let threshold = otsu_threshold(&image.to_voxels(), self.bins);
        debug!(threshold, background = ?self.background, "foreground threshold");
        let data = image.data().clone();
        let background = self.background.select(data.clone(), threshold);
        let labels = data
            .ones_like()
            .mul_scalar(self.foreground_label as f64)
            .mask_fill(background, 0.0);
        Image::from_geometry(labels, &image.geometry(), pixel_type)
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for ForegroundMask {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let (image, mask) = sample.into_parts();
        let pixel_type = mask.as_ref().map_or(PixelType::UInt8, |mask| mask.pixel_type());
        let mask = self.compute(&image, pixel_type);
        Sample::new(image, Some(mask))
    }
}

/// Splits a binary mask into connected components.
pub trait ConnectedComponents<B: Backend, const D: usize>: Debug + Send + Sync {
    /// Label every connected foreground segment of `binary`.
    fn label(&self, binary: &Mask<B, D>) -> Result<Mask<B, D>>;
}

/// Connected-component labelling on the host.
///
/// Segment labels start at 1 and are consecutive, in the raster order of
/// each segment's first voxel. Face neighbours are connected; with
/// `fully_connected` so are edge and corner neighbours.
#[derive(Debug, Clone)]
pub struct RasterLabeler {
    fully_connected: bool,
    foreground: i64,
    background: i64,
    pixel_type: PixelType,
}

impl Default for RasterLabeler {
    fn default() -> Self {
        Self {
            fully_connected: false,
            foreground: 1,
            background: 0,
            pixel_type: PixelType::UInt8,
        }
    }
}

impl RasterLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fully_connected(mut self, fully_connected: bool) -> Self {
        self.fully_connected = fully_connected;
        self
    }

    /// Input value treated as foreground.
    pub fn with_foreground(mut self, value: i64) -> Self {
        self.foreground = value;
        self
    }

    /// Output value of background voxels.
    pub fn with_background(mut self, value: i64) -> Self {
        self.background = value;
        self
    }

    pub fn with_pixel_type(mut self, pixel_type: PixelType) -> Self {
        self.pixel_type = pixel_type;
        self
    }

    /// Offsets to the neighbours already visited in raster order.
    fn backward_neighbours<const D: usize>(&self) -> Vec<[i64; D]> {
        let count = 3usize.pow(D as u32);
        (0..count)
            .map(|code| {
                let mut rest = code;
                std::array::from_fn(|_| {
                    let step = (rest % 3) as i64 - 1;
                    rest /= 3;
                    step
                })
            })
            .filter(|delta: &[i64; D]| {
                let nonzero = delta.iter().filter(|d| **d != 0).count();
                // Last non-zero component is the slowest axis and decides the raster order.
                let before = delta.iter().rev().find(|d| **d != 0).is_some_and(|d| *d < 0);
                before && (self.fully_connected || nonzero == 1)
            })
            .collect()
    }

    fn components<const D: usize>(&self, foreground: &[bool], size: [usize; D]) -> Vec<u32> {
        let mut parent: Vec<usize> = (0..foreground.len()).collect();
        let neighbours = self.backward_neighbours::<D>();

        for flat in (0..foreground.len()).filter(|v| foreground[*v]) {
            let index = flat_to_index(flat, size);
            for delta in &neighbours {
                let mut neighbour = [0usize; D];
                let inside = (0..D).all(|axis| {
                    let n = index[axis] as i64 + delta[axis];
                    neighbour[axis] = n.max(0) as usize;
                    n >= 0 && (n as usize) < size[axis]
                });
                if !inside {
                    continue;
                }
                let other = index_to_flat(neighbour, size);
                if foreground[other] {
                    let (a, b) = (find(&mut parent, flat), find(&mut parent, other));
                    if a != b {
                        parent[a.max(b)] = a.min(b);
                    }
                }
            }
        }

        let mut labels = vec![0u32; foreground.len()];
        let mut assigned: BTreeMap<usize, u32> = BTreeMap::new();
        for flat in (0..foreground.len()).filter(|v| foreground[*v]) {
            let root = find(&mut parent, flat);
            let next = assigned.len() as u32 + 1;
            labels[flat] = *assigned.entry(root).or_insert(next);
        }
        labels
    }
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

impl<B: Backend, const D: usize> ConnectedComponents<B, D> for RasterLabeler {
    fn label(&self, binary: &Mask<B, D>) -> Result<Mask<B, D>> {
        let foreground: Vec<bool> = binary
            .to_voxels()
            .iter()
            .map(|v| v.round() as i64 == self.foreground)
            .collect();
        let labels = self.components(&foreground, binary.size());
        let count = labels.iter().copied().max().unwrap_or(0);
        debug!(segments = count, "connected components");

        let values = labels
            .iter()
            .map(|l| if *l == 0 { self.background as f32 } else { *l as f32 })
            .collect();
        let device = binary.data().device();
        Ok(Image::from_voxels(values, &binary.geometry(), self.pixel_type, &device))
    }
}

/// Replaces a binary mask by its connected-component labels.
#[derive(Debug, Clone)]
pub struct Label<L> {
    labeler: L,
}

impl<L> Label<L> {
    pub fn new(labeler: L) -> Self {
        Self { labeler }
    }
}

impl<B: Backend, const D: usize, L: ConnectedComponents<B, D>> Transform<B, D> for Label<L> {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        if !sample.has_mask() {
            return Err(TransformError::missing_operand("Label requires an image and a mask"));
        }
        sample.try_map(Ok, |mask| self.labeler.label(&mask))
    }
}
