//! Intensity rescaling transforms.
//!
//! Only image values change; the mask passes through as given.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use forger_core::{Image, PixelType};
use rand::RngCore;
use tracing::debug;
use crate::error::{Result, TransformError};
use crate::sample::Sample;
use crate::transform::Transform;

fn minimum<B: Backend, const D: usize>(data: &Tensor<B, D>) -> f64 {
    data.clone().min().into_scalar().elem::<f64>()
}

fn maximum<B: Backend, const D: usize>(data: &Tensor<B, D>) -> f64 {
    data.clone().max().into_scalar().elem::<f64>()
}

/// Linear map of `data` from its own range onto `[low, high]`.
///
/// A constant image maps to `low`.
fn rescale<B: Backend, const D: usize>(data: Tensor<B, D>, low: f64, high: f64) -> Tensor<B, D> {
    let (min, max) = (minimum(&data), maximum(&data));
    if max <= min {
        return data.zeros_like().add_scalar(low);
    }
    data.sub_scalar(min).mul_scalar((high - low) / (max - min)).add_scalar(low)
}

fn check_interval(name: &str, low: f64, high: f64, message: &str) -> Result<()> {
    if !(low < high) {
        return Err(TransformError::invalid_parameter(name, message));
    }
    Ok(())
}

/// Mirrors intensities about `maximum`: `v ↦ maximum - v`.
///
/// Without a maximum the image maximum is used, so the darkest voxel becomes
/// the brightest.
#[derive(Debug, Clone, Default)]
pub struct Invert {
    maximum: Option<f64>,
}

impl Invert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Invert {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        sample.try_map(
            |image| {
                let data = image.data().clone();
                let top = self.maximum.unwrap_or_else(|| maximum(&data));
                Ok(image.with_data(data.neg().add_scalar(top)))
            },
            Ok,
        )
    }
}

/// Rescales intensities linearly onto `[min_value, max_value]`.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min_value: f64,
    max_value: f64,
}

impl MinMaxScaler {
    pub fn new(min_value: f64, max_value: f64) -> Result<Self> {
        check_interval("min_value", min_value, max_value, "min_value must be smaller than max_value.")?;
        Ok(Self { min_value, max_value })
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for MinMaxScaler {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        sample.try_map(
            |image| Ok(image.with_data(rescale(image.data().clone(), self.min_value, self.max_value))),
            Ok,
        )
    }
}

/// Shifts and scales intensities to zero mean and unit variance.
///
/// Integer images become `Float32`. A constant image is only centred.
#[derive(Debug, Clone, Default)]
pub struct UnitNormalize;

impl UnitNormalize {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for UnitNormalize {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        sample.try_map(
            |image| {
                let pixel_type = match image.pixel_type() {
                    PixelType::Float64 => PixelType::Float64,
                    _ => PixelType::Float32,
                };
                let data = image.data().clone();
                let mean = data.clone().mean().into_scalar().elem::<f64>();
                let centred = data.sub_scalar(mean);
                let variance = centred.clone().powf_scalar(2.0).mean().into_scalar().elem::<f64>();
                debug!(mean, variance, "unit normalize");

                let normalized = if variance > 0.0 {
                    centred.div_scalar(variance.sqrt())
                } else {
                    centred
                };
                Ok(Image::from_geometry(normalized, &image.geometry(), pixel_type))
            },
            Ok,
        )
    }
}

/// Saturates intensities to `[location - window, location + window]`.
#[derive(Debug, Clone)]
pub struct WindowLocationClip {
    location: f64,
    window: f64,
}

impl WindowLocationClip {
    pub fn new(location: f64, window: f64) -> Result<Self> {
        if !(window >= 0.0) {
            return Err(TransformError::invalid_parameter(
                "window",
                format!("window must be non-negative (got {})", window),
            ));
        }
        Ok(Self { location, window })
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for WindowLocationClip {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        let (lower, upper) = (self.location - self.window, self.location + self.window);
        sample.try_map(|image| Ok(image.with_data(image.data().clone().clamp(lower, upper))), Ok)
    }
}

/// Rescales intensities onto `[lower, upper]`, optionally changing the
/// pixel type.
///
/// The rescaling happens before the cast, so a floating target keeps the
/// fractional values an integer input could not hold.
#[derive(Debug, Clone)]
pub struct IntensityRangeTransfer {
    lower: f64,
    upper: f64,
    cast: Option<PixelType>,
}

impl IntensityRangeTransfer {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        check_interval("interval", lower, upper, "interval lower bound must be smaller than its upper bound")?;
        Ok(Self {
            lower,
            upper,
            cast: None,
        })
    }

    pub fn with_cast(mut self, pixel_type: PixelType) -> Self {
        self.cast = Some(pixel_type);
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for IntensityRangeTransfer {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> Result<Sample<B, D>> {
        sample.try_map(
            |image| {
                let pixel_type = self.cast.unwrap_or(image.pixel_type());
                let data = rescale(image.data().clone(), self.lower, self.upper);
                Ok(Image::from_geometry(data, &image.geometry(), pixel_type))
            },
            Ok,
        )
    }
}
