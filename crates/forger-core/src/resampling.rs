//! Output-grid derivation for resampling.
//!
//! A resampling transform maps output physical points to input physical
//! points. Without a reference grid, the output grid is the axis-aligned box
//! enclosing the input's corners pushed through the inverse of that
//! transform, i.e. where the input content lands.

use burn::tensor::backend::Backend;
use crate::image::{Image, ImageGeometry, PixelType};
use crate::interpolation::Interpolator;
use crate::spatial::{Direction, Point, Spacing};
use crate::transform::SpatialTransform;

/// Absorbs floating-point loss in `(max - min) / spacing` so grids whose
/// extent is an exact multiple of the spacing keep their size.
const SIZE_EPSILON: f64 = 1e-6;

/// Smallest axis-aligned grid enclosing the transformed input extent.
///
/// * `spacing` - output spacing, defaults to the input's
/// * `direction` - output direction, defaults to the input's
///
/// The identity transform without overrides returns `input` unchanged.
/// Returns `None` when `transform` has no inverse. The size of a degenerate
/// extent can be zero on some axis; callers decide how to treat it.
pub fn reference_free_geometry<B, T, const D: usize>(
    input: &ImageGeometry<D>,
    transform: &T,
    spacing: Option<Spacing<D>>,
    direction: Option<Direction<D>>,
) -> Option<ImageGeometry<D>>
where
    B: Backend,
    T: SpatialTransform<B, D> + ?Sized,
{
    let spacing = spacing.unwrap_or(*input.spacing());
    let direction = direction.unwrap_or(*input.direction());

    if transform.is_identity() && spacing == *input.spacing() && direction == *input.direction() {
        return Some(*input);
    }

    let inverse = transform.inverse()?;
    let corners: Vec<Point<D>> = input
        .corners()
        .iter()
        .map(|corner| inverse.transform_point(corner))
        .collect();

    let (min, max) = corners
        .iter()
        .skip(1)
        .fold((corners[0], corners[0]), |(lo, hi), p| (lo.inf(p), hi.sup(p)));

    let size: [usize; D] = std::array::from_fn(|i| {
        let extent = (max[i] - min[i]) / spacing[i] + SIZE_EPSILON;
        extent.floor().max(0.0) as usize
    });

    Some(ImageGeometry::new(size, min, spacing, direction))
}

/// Resample `image` onto `geometry` through `transform`.
///
/// `pixel_type` defaults to the input's. Returns `None` when the input
/// direction matrix is singular.
pub fn resample_onto<B, T, I, const D: usize>(
    image: &Image<B, D>,
    geometry: ImageGeometry<D>,
    transform: T,
    interpolator: I,
    default_value: f64,
    pixel_type: Option<PixelType>,
) -> Option<Image<B, D>>
where
    B: Backend,
    T: SpatialTransform<B, D>,
    I: Interpolator<B>,
{
    let filter = crate::filter::ResampleImageFilter::new(geometry, transform, interpolator)
        .with_default_pixel_value(default_value)
        .with_output_pixel_type(pixel_type.unwrap_or(image.pixel_type()));
    filter.apply(image)
}
