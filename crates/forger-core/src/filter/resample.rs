//! Resample image filter.
//!
//! This module provides ResampleImageFilter which resamples an image
//! onto a new grid using a transform and an interpolator.

use std::marker::PhantomData;
use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::image::{generate_index_grid, Image, ImageGeometry, PixelType};
use crate::interpolation::trait_::Interpolator;
use crate::transform::trait_::SpatialTransform;

/// Continuous indices further than this beyond the half-voxel border count
/// as outside the field of view.
const FIELD_OF_VIEW_TOLERANCE: f64 = 1e-4;

/// Resample image filter.
///
/// Resamples an image by applying a transform to map points from the
/// output image space to the input image space, and then interpolating values.
/// Output voxels whose mapped position falls outside the input grid receive
/// the default pixel value.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `T` - The transform type (output physical space -> input physical space)
/// * `I` - The interpolator type
/// * `D` - The dimensionality (2 or 3)
pub struct ResampleImageFilter<B, T, I, const D: usize>
where
    B: Backend,
    T: SpatialTransform<B, D>,
    I: Interpolator<B>,
{
    geometry: ImageGeometry<D>,
    transform: T,
    interpolator: I,
    default_pixel_value: f64,
    output_pixel_type: Option<PixelType>,
    _phantom: PhantomData<B>,
}

impl<B, T, I, const D: usize> ResampleImageFilter<B, T, I, D>
where
    B: Backend,
    T: SpatialTransform<B, D>,
    I: Interpolator<B>,
{
    /// Create a new resample filter.
    ///
    /// # Arguments
    /// * `geometry` - Output grid (size, origin, spacing, direction)
    /// * `transform` - Transform from output space to input space
    /// * `interpolator` - Interpolator for input image sampling
    pub fn new(geometry: ImageGeometry<D>, transform: T, interpolator: I) -> Self {
        Self {
            geometry,
            transform,
            interpolator,
            default_pixel_value: 0.0,
            output_pixel_type: None,
            _phantom: PhantomData,
        }
    }

    /// Create from a reference image: the output grid is the reference's grid.
    pub fn new_from_reference(reference: &Image<B, D>, transform: T, interpolator: I) -> Self {
        Self::new(reference.geometry(), transform, interpolator)
    }

    /// Set default pixel value for outside the field of view.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Set the output pixel type. Defaults to the input's.
    pub fn with_output_pixel_type(mut self, pixel_type: PixelType) -> Self {
        self.output_pixel_type = Some(pixel_type);
        self
    }

    pub fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    /// Apply filter to an input image.
    ///
    /// Returns `None` when the input direction matrix is singular.
    pub fn apply(&self, input: &Image<B, D>) -> Option<Image<B, D>> {
        let pixel_type = self.output_pixel_type.unwrap_or(input.pixel_type());

        if self.transform.is_identity() && self.geometry == input.geometry() {
            return Some(Image::from_geometry(input.data().clone(), &self.geometry, pixel_type));
        }

        let device = input.data().device();

        // 1. Continuous indices of every output voxel
        let output_indices = generate_index_grid::<B, D>(self.geometry.size(), &device);

        // 2. Output indices -> output physical points
        let output_points = self.indices_to_physical(output_indices, &device);

        // 3. Output physical points -> input physical points
        let input_points = self.transform.transform_points(output_points);

        // 4. Input physical points -> input continuous indices
        let input_indices = input.world_to_index_tensor(input_points)?;

        // 5. Interpolate, then overwrite everything outside the input grid
        let sampled = self.interpolator.interpolate(input.data(), input_indices.clone());
        let outside = outside_field_of_view(input_indices, input.size());
        let values = sampled.mask_fill(outside, self.default_pixel_value);

        let output_data = values.reshape(self.geometry.tensor_shape());
        Some(Image::from_geometry(output_data, &self.geometry, pixel_type))
    }

    fn indices_to_physical(&self, indices: Tensor<B, 2>, device: &B::Device) -> Tensor<B, 2> {
        // point = origin + Direction * (index * spacing)
        // Row vectors: P = O + (I * s) @ Direction^T
        let origin = self.geometry.origin();
        let spacing = self.geometry.spacing();
        let direction = self.geometry.direction();

        let origin_vec: Vec<f32> = (0..D).map(|i| origin[i] as f32).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(TensorData::new(origin_vec, [D]), device).reshape([1, D]);

        let spacing_vec: Vec<f32> = (0..D).map(|i| spacing[i] as f32).collect();
        let spacing_tensor = Tensor::<B, 1>::from_data(TensorData::new(spacing_vec, [D]), device).reshape([1, D]);

        let mut dir_data = Vec::with_capacity(D * D);
        for c in 0..D {
            for r in 0..D {
                dir_data.push(direction[(r, c)] as f32);
            }
        }
        let dir_t_tensor = Tensor::<B, 2>::from_data(TensorData::new(dir_data, [D, D]), device);

        origin_tensor + (indices * spacing_tensor).matmul(dir_t_tensor)
    }
}

/// Boolean mask `[N]` of indices outside `[-0.5, n - 0.5]` on any axis.
fn outside_field_of_view<B: Backend, const D: usize>(
    indices: Tensor<B, 2>,
    size: [usize; D],
) -> Tensor<B, 1, burn::tensor::Bool> {
    let batch_size = indices.dims()[0];
    let device = indices.device();
    let mut violations = Tensor::<B, 1>::zeros([batch_size], &device);

    for (axis, &extent) in size.iter().enumerate() {
        let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
        let low = -0.5 - FIELD_OF_VIEW_TOLERANCE;
        let high = extent as f64 - 0.5 + FIELD_OF_VIEW_TOLERANCE;
        violations = violations + coord.clone().lower_elem(low).float() + coord.greater_elem(high).float();
    }

    violations.greater_elem(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use nalgebra::SMatrix;
    use crate::interpolation::{LinearInterpolator, NearestNeighborInterpolator};
    use crate::spatial::{Direction2, Point2, Spacing2, Vector};
    use crate::transform::AffineTransform;

    type TestBackend = NdArray<f32>;

    fn square_image() -> Image<TestBackend, 2> {
        let device = Default::default();

        // 10x10 image with a 2x2 square at (4,4)..(5,5)
        let mut data = vec![0.0f32; 100];
        data[4 * 10 + 4] = 1.0;
        data[4 * 10 + 5] = 1.0;
        data[5 * 10 + 4] = 1.0;
        data[5 * 10 + 5] = 1.0;

        let tensor = Tensor::<TestBackend, 2>::from_data(TensorData::new(data, [10, 10]), &device);
        Image::new(tensor, Point2::new([0.0, 0.0]), Spacing2::new([1.0, 1.0]), Direction2::identity())
    }

    #[test]
    fn test_resample_translation_2d() {
        let image = square_image();

        // Content moves by +2 in x and +1 in y, so output -> input subtracts.
        let transform = AffineTransform::<2>::new(SMatrix::identity(), Vector::new([-2.0, -1.0]));
        let filter = ResampleImageFilter::new_from_reference(&image, transform, LinearInterpolator::new());
        let slice = filter.apply(&image).unwrap().to_voxels();

        assert!(slice[5 * 10 + 6] > 0.9);
        assert!(slice[5 * 10 + 7] > 0.9);
        assert!(slice[6 * 10 + 6] > 0.9);
        assert!(slice[6 * 10 + 7] > 0.9);
        assert!(slice[4 * 10 + 4] < 0.1);
    }

    #[test]
    fn test_resample_fills_outside_with_default() {
        let image = square_image();
        let transform = AffineTransform::<2>::new(SMatrix::identity(), Vector::new([-5.0, 0.0]));
        let filter = ResampleImageFilter::new_from_reference(&image, transform, NearestNeighborInterpolator::new())
            .with_default_pixel_value(-1.0);
        let slice = filter.apply(&image).unwrap().to_voxels();

        // Columns 0..5 map to x < 0 in the input.
        for y in 0..10 {
            for x in 0..5 {
                assert_eq!(slice[y * 10 + x], -1.0);
            }
            assert_eq!(slice[y * 10 + 5], 0.0);
        }
    }

    #[test]
    fn test_identity_copies_and_casts() {
        let image = square_image();
        let filter = ResampleImageFilter::new_from_reference(&image, AffineTransform::<2>::identity(), LinearInterpolator::new())
            .with_output_pixel_type(PixelType::UInt8);
        let output = filter.apply(&image).unwrap();

        assert_eq!(output.geometry(), image.geometry());
        assert_eq!(output.pixel_type(), PixelType::UInt8);
        assert_eq!(output.to_voxels(), image.to_voxels());
    }

    #[test]
    fn test_resample_to_coarser_grid() {
        let image = square_image();
        let geometry = ImageGeometry::new([5, 5], Point2::new([0.5, 0.5]), Spacing2::new([2.0, 2.0]), Direction2::identity());
        let filter = ResampleImageFilter::new(geometry, AffineTransform::<2>::identity(), LinearInterpolator::new());
        let output = filter.apply(&image).unwrap();

        assert_eq!(output.size(), [5, 5]);
        // Output voxel (2, 2) sits at physical (4.5, 4.5), the centre of the square.
        assert!((output.to_voxels()[2 * 5 + 2] - 1.0).abs() < 1e-5);
    }
}
