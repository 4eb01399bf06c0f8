//! Geometric transforms.
//!
//! Image and mask are resampled onto one output grid, so the pair stays
//! co-registered. Masks always use nearest-neighbour interpolation; the image
//! uses the interpolation of the transform's [`ResampleConfig`].

use burn::prelude::*;
use forger_core::filter::{FlipFilter, ShrinkFilter};
use forger_core::transform::rotation_matrix;
use forger_core::{
    reference_free_geometry, resample_onto, AffineTransform, Direction, ImageGeometry, Interpolation, PixelType, Point,
    Spacing, Vector,
};
use rand::{Rng, RngCore};
use tracing::debug;
use crate::error::{check_len, TransformError};
use crate::sample::Sample;
use crate::transform::Transform;

/// Resampling options shared by every geometric transform.
#[derive(Config, Debug, PartialEq)]
pub struct ResampleConfig {
    /// Interpolation used for the image.
    #[config(default = "Interpolation::Linear")]
    pub interpolation: Interpolation,
    /// Value of image voxels mapped from outside the input field.
    #[config(default = "0.0")]
    pub image_background: f64,
    /// Label of mask voxels mapped from outside the input field.
    #[config(default = "0.0")]
    pub mask_background: f64,
    /// Output pixel type of the image, the input's when unset.
    pub image_pixel_type: Option<PixelType>,
    /// Output pixel type of the mask, the input's when unset.
    pub mask_pixel_type: Option<PixelType>,
}

fn resample_sample<B: Backend, const D: usize>(
    sample: Sample<B, D>,
    geometry: ImageGeometry<D>,
    transform: AffineTransform<D>,
    config: &ResampleConfig,
) -> crate::error::Result<Sample<B, D>> {
    if geometry.size().contains(&0) {
        return Err(TransformError::invalid_region(format!(
            "output grid {:?} has an empty axis",
            geometry.size()
        )));
    }
    debug!(size = ?geometry.size(), spacing = ?geometry.spacing().to_array(), "resample");

    let singular = || TransformError::invalid_parameter("direction", "input direction matrix is singular");
    sample.try_map(
        |image| {
            resample_onto(
                &image,
                geometry,
                transform,
                config.interpolation,
                config.image_background,
                config.image_pixel_type,
            )
            .ok_or_else(singular)
        },
        |mask| {
            resample_onto(
                &mask,
                geometry,
                transform,
                Interpolation::NearestNeighbor,
                config.mask_background,
                config.mask_pixel_type,
            )
            .ok_or_else(singular)
        },
    )
}

fn check_angles<const D: usize>(angles: &[f64]) -> crate::error::Result<()> {
    if rotation_matrix::<D>(angles).is_none() {
        return Err(TransformError::dimension_mismatch(format!(
            "{} rotation angles do not fit a {}D image",
            angles.len(),
            D
        )));
    }
    Ok(())
}

fn positive_factors<const D: usize>(name: &str, values: &[usize]) -> crate::error::Result<[usize; D]> {
    check_len(name, values, D)?;
    if values.contains(&0) {
        return Err(TransformError::invalid_parameter(name, format!("entries must be positive (got {:?})", values)));
    }
    Ok(std::array::from_fn(|i| values[i]))
}

/// Rotation, scaling and translation about a centre.
///
/// The content moves by `x ↦ R·S·(x - c) + c + t` with `c` the physical centre
/// of the image unless set. With `reshape` the output grid grows or shrinks
/// to enclose the moved content (and honours the `spacing` and `direction`
/// overrides); without it the input grid is kept. A `reference` grid wins
/// over both.
#[derive(Debug, Clone)]
pub struct Affine<const D: usize> {
    angles: Vec<f64>,
    translation: Vector<D>,
    scales: Vector<D>,
    center: Option<Point<D>>,
    spacing: Option<Spacing<D>>,
    direction: Option<Direction<D>>,
    reference: Option<ImageGeometry<D>>,
    reshape: bool,
    config: ResampleConfig,
}

impl<const D: usize> Affine<D> {
    /// `angles` are in degrees: one in 2D, three (x, y, z) in 3D.
    pub fn new(angles: Vec<f64>) -> crate::error::Result<Self> {
        check_angles::<D>(&angles)?;
        Ok(Self {
            angles,
            translation: Vector::zeros(),
            scales: Vector::new([1.0; D]),
            center: None,
            spacing: None,
            direction: None,
            reference: None,
            reshape: true,
            config: ResampleConfig::new(),
        })
    }

    pub fn with_translation(mut self, translation: Vector<D>) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_scales(mut self, scales: Vector<D>) -> Self {
        self.scales = scales;
        self
    }

    pub fn with_center(mut self, center: Point<D>) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_spacing(mut self, spacing: Spacing<D>) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn with_direction(mut self, direction: Direction<D>) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_reference(mut self, reference: ImageGeometry<D>) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_reshape(mut self, reshape: bool) -> Self {
        self.reshape = reshape;
        self
    }

    pub fn with_config(mut self, config: ResampleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    pub fn translation(&self) -> &Vector<D> {
        &self.translation
    }

    pub fn scales(&self) -> &Vector<D> {
        &self.scales
    }

    /// Transform moving the content of an image with `geometry`.
    pub fn content_transform(&self, geometry: &ImageGeometry<D>) -> crate::error::Result<AffineTransform<D>> {
        let center = self.center.unwrap_or_else(|| geometry.physical_center());
        AffineTransform::from_parameters(&self.angles, &self.scales, &self.translation, &center)
            .ok_or_else(|| TransformError::dimension_mismatch(format!("{} rotation angles do not fit a {}D image", self.angles.len(), D)))
    }

    fn output_geometry<B: Backend>(
        &self,
        input: &ImageGeometry<D>,
        resampling: &AffineTransform<D>,
    ) -> crate::error::Result<ImageGeometry<D>> {
        if let Some(reference) = self.reference {
            return Ok(reference);
        }
        if !self.reshape {
            return Ok(*input);
        }
        if let Some(spacing) = self.spacing.filter(|spacing| !spacing.is_valid()) {
            return Err(TransformError::invalid_parameter(
                "spacing",
                format!("entries must be finite and positive (got {:?})", spacing.to_array()),
            ));
        }
        if self.direction.is_some_and(|direction| !direction.is_orthogonal()) {
            return Err(TransformError::invalid_parameter("direction", "direction matrix must be orthogonal"));
        }
        reference_free_geometry::<B, _, D>(input, resampling, self.spacing, self.direction)
            .ok_or_else(|| TransformError::invalid_parameter("transform", "resampling transform is not invertible"))
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Affine<D> {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        let input = sample.image().geometry();
        let content = self.content_transform(&input)?;
        let resampling = content.try_inverse().ok_or_else(|| {
            TransformError::invalid_parameter("scales", format!("{:?} make the transform singular", self.scales.to_array()))
        })?;
        let geometry = self.output_geometry::<B>(&input, &resampling)?;
        debug!(angles = ?self.angles, reshape = self.reshape, "affine");
        resample_sample(sample, geometry, resampling, &self.config)
    }
}

/// Rotation about the image centre; an [`Affine`] without scaling or
/// translation.
#[derive(Debug, Clone)]
pub struct Rotation<const D: usize>(Affine<D>);

impl<const D: usize> Rotation<D> {
    pub fn new(angles: Vec<f64>) -> crate::error::Result<Self> {
        Affine::new(angles).map(Self)
    }

    pub fn with_center(self, center: Point<D>) -> Self {
        Self(self.0.with_center(center))
    }

    pub fn with_reference(self, reference: ImageGeometry<D>) -> Self {
        Self(self.0.with_reference(reference))
    }

    pub fn with_reshape(self, reshape: bool) -> Self {
        Self(self.0.with_reshape(reshape))
    }

    pub fn with_config(self, config: ResampleConfig) -> Self {
        Self(self.0.with_config(config))
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Rotation<D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        Transform::<B, D>::apply(&self.0, sample, rng)
    }
}

fn symmetric(rng: &mut dyn RngCore, max: f64) -> f64 {
    if max == 0.0 {
        0.0
    } else {
        rng.random_range(-max..=max)
    }
}

/// [`Affine`] with parameters drawn on every application.
///
/// Each angle is uniform in `[-max_angles[i], max_angles[i]]`, each
/// translation component in `[-max_translation[i], max_translation[i]]` and
/// each scale factor in the scale range.
#[derive(Debug, Clone)]
pub struct RandomAffine<const D: usize> {
    max_angles: Vec<f64>,
    max_translation: Option<Vector<D>>,
    scale_range: Option<(f64, f64)>,
    reshape: bool,
    config: ResampleConfig,
}

impl<const D: usize> RandomAffine<D> {
    pub fn new(max_angles: Vec<f64>) -> crate::error::Result<Self> {
        check_angles::<D>(&max_angles)?;
        if max_angles.iter().any(|a| *a < 0.0) {
            return Err(TransformError::invalid_parameter("max_angles", "bounds must be non-negative"));
        }
        Ok(Self {
            max_angles,
            max_translation: None,
            scale_range: None,
            reshape: true,
            config: ResampleConfig::new(),
        })
    }

    pub fn with_max_translation(mut self, max_translation: Vector<D>) -> crate::error::Result<Self> {
        if max_translation.to_array().iter().any(|t| *t < 0.0) {
            return Err(TransformError::invalid_parameter("max_translation", "bounds must be non-negative"));
        }
        self.max_translation = Some(max_translation);
        Ok(self)
    }

    pub fn with_scale_range(mut self, low: f64, high: f64) -> crate::error::Result<Self> {
        if !(low > 0.0 && low <= high) {
            return Err(TransformError::invalid_parameter(
                "scale_range",
                format!("expected 0 < low <= high (got {}, {})", low, high),
            ));
        }
        self.scale_range = Some((low, high));
        Ok(self)
    }

    pub fn with_reshape(mut self, reshape: bool) -> Self {
        self.reshape = reshape;
        self
    }

    pub fn with_config(mut self, config: ResampleConfig) -> Self {
        self.config = config;
        self
    }

    /// Draw the concrete transform of one application.
    pub fn draw(&self, rng: &mut dyn RngCore) -> crate::error::Result<Affine<D>> {
        let angles: Vec<f64> = self.max_angles.iter().map(|max| symmetric(rng, *max)).collect();
        let translation = match self.max_translation {
            Some(max) => Vector::new(std::array::from_fn(|i| symmetric(rng, max[i]))),
            None => Vector::zeros(),
        };
        let scales = match self.scale_range {
            Some((low, high)) if low < high => Vector::new(std::array::from_fn(|_| rng.random_range(low..=high))),
            Some((low, _)) => Vector::new([low; D]),
            None => Vector::new([1.0; D]),
        };

        Ok(Affine::new(angles)?
            .with_translation(translation)
            .with_scales(scales)
            .with_reshape(self.reshape)
            .with_config(self.config.clone()))
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for RandomAffine<D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        let affine = self.draw(rng)?;
        Transform::<B, D>::apply(&affine, sample, rng)
    }
}

/// [`Rotation`] with angles drawn on every application.
#[derive(Debug, Clone)]
pub struct RandomRotation<const D: usize>(RandomAffine<D>);

impl<const D: usize> RandomRotation<D> {
    pub fn new(max_angles: Vec<f64>) -> crate::error::Result<Self> {
        RandomAffine::new(max_angles).map(Self)
    }

    pub fn with_reshape(self, reshape: bool) -> Self {
        Self(self.0.with_reshape(reshape))
    }

    pub fn with_config(self, config: ResampleConfig) -> Self {
        Self(self.0.with_config(config))
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for RandomRotation<D> {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        Transform::<B, D>::apply(&self.0, sample, rng)
    }
}

/// Reverses the voxel order along the selected axes.
#[derive(Debug, Clone)]
pub struct Flip {
    axes: Vec<bool>,
}

impl Flip {
    pub fn new(axes: Vec<bool>) -> Self {
        Self { axes }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Flip {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        check_len("axes", &self.axes, D)?;
        let filter = FlipFilter::<B, D>::new(std::array::from_fn(|i| self.axes[i]));
        sample.try_map(|image| Ok(filter.apply(&image)), |mask| Ok(filter.apply(&mask)))
    }
}

/// Grid with `size` voxels over the physical extent of `input`.
fn resized<const D: usize>(input: &ImageGeometry<D>, size: [usize; D]) -> ImageGeometry<D> {
    let old = input.size();
    let spacing = Spacing::new(std::array::from_fn(|i| input.spacing()[i] * old[i] as f64 / size[i] as f64));
    input.set_size(size).set_spacing(spacing)
}

/// Resamples to a new size over the same physical extent.
#[derive(Debug, Clone)]
pub struct Resize {
    size: Vec<usize>,
    config: ResampleConfig,
}

impl Resize {
    pub fn new(size: Vec<usize>) -> Self {
        Self {
            size,
            config: ResampleConfig::new(),
        }
    }

    pub fn with_config(mut self, config: ResampleConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Resize {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        let size = positive_factors::<D>("size", &self.size)?;
        let geometry = resized(&sample.image().geometry(), size);
        resample_sample(sample, geometry, AffineTransform::identity(), &self.config)
    }
}

/// Upsamples by integer factors.
#[derive(Debug, Clone)]
pub struct Expand {
    factors: Vec<usize>,
    config: ResampleConfig,
}

impl Expand {
    pub fn new(factors: Vec<usize>) -> Self {
        Self {
            factors,
            config: ResampleConfig::new(),
        }
    }

    pub fn with_config(mut self, config: ResampleConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Expand {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        let factors = positive_factors::<D>("factors", &self.factors)?;
        let input = sample.image().geometry();
        let old = input.size();
        let geometry = resized(&input, std::array::from_fn(|i| old[i] * factors[i]));
        resample_sample(sample, geometry, AffineTransform::identity(), &self.config)
    }
}

/// Keeps every `factor`-th voxel along each axis.
#[derive(Debug, Clone)]
pub struct Shrink {
    factors: Vec<usize>,
}

impl Shrink {
    pub fn new(factors: Vec<usize>) -> Self {
        Self { factors }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Shrink {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        let factors = positive_factors::<D>("factors", &self.factors)?;
        let filter = ShrinkFilter::<B, D>::new(factors);
        let too_large = || TransformError::invalid_region(format!("shrink factors {:?} exceed the image size", factors));
        sample.try_map(
            |image| filter.apply(&image).ok_or_else(too_large),
            |mask| filter.apply(&mask).ok_or_else(too_large),
        )
    }
}

/// Resamples to a new spacing; the size follows so the extent is kept as
/// closely as whole voxels allow.
#[derive(Debug, Clone)]
pub struct Resample {
    spacing: Vec<f64>,
    config: ResampleConfig,
}

impl Resample {
    pub fn new(spacing: Vec<f64>) -> Self {
        Self {
            spacing,
            config: ResampleConfig::new(),
        }
    }

    pub fn with_config(mut self, config: ResampleConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Resample {
    fn apply(&self, sample: Sample<B, D>, _rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        check_len("spacing", &self.spacing, D)?;
        let spacing = Spacing::new(std::array::from_fn(|i| self.spacing[i]));
        if !spacing.is_valid() {
            return Err(TransformError::invalid_parameter(
                "spacing",
                format!("entries must be finite and positive (got {:?})", self.spacing),
            ));
        }

        let input = sample.image().geometry();
        let old = input.size();
        let size: [usize; D] = std::array::from_fn(|i| {
            let scaled = old[i] as f64 * input.spacing()[i] / self.spacing[i];
            (scaled.round() as usize).max(1)
        });
        let geometry = input.set_size(size).set_spacing(spacing);
        resample_sample(sample, geometry, AffineTransform::identity(), &self.config)
    }
}

/// [`Resample`] to the same spacing on every axis.
#[derive(Debug, Clone)]
pub struct Isotropic {
    spacing: f64,
    config: ResampleConfig,
}

impl Isotropic {
    pub fn new(spacing: f64) -> Self {
        Self {
            spacing,
            config: ResampleConfig::new(),
        }
    }

    pub fn with_config(mut self, config: ResampleConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for Isotropic {
    fn apply(&self, sample: Sample<B, D>, rng: &mut dyn RngCore) -> crate::error::Result<Sample<B, D>> {
        let resample = Resample::new(vec![self.spacing; D]).with_config(self.config.clone());
        Transform::<B, D>::apply(&resample, sample, rng)
    }
}
