use burn_ndarray::NdArray;
use forger_core::image::{Image, ImageGeometry, PixelType};
use forger_core::interpolation::{Interpolation, NearestNeighborInterpolator};
use forger_core::resampling::{reference_free_geometry, resample_onto};
use forger_core::spatial::{Direction, Point, Spacing, Vector};
use forger_core::transform::AffineTransform;
use proptest::prelude::*;

type Backend = NdArray<f32>;

fn cube_image(size: usize, geometry: ImageGeometry<3>) -> Image<Backend, 3> {
    let device = Default::default();
    let values: Vec<f32> = (0..size * size * size).map(|v| (v % 17) as f32).collect();
    Image::from_voxels(values, &geometry, PixelType::Int16, &device)
}

fn rotation_content(angles: [f64; 3], geometry: &ImageGeometry<3>) -> AffineTransform<3> {
    AffineTransform::from_parameters(&angles, &Vector::new([1.0; 3]), &Vector::zeros(), &geometry.physical_center()).unwrap()
}

proptest! {
    #[test]
    fn test_identity_round_trip(
        nx in 1usize..6, ny in 1usize..6, nz in 1usize..6,
        ox in -50.0f64..50.0, oy in -50.0f64..50.0, oz in -50.0f64..50.0,
        sx in 0.1f64..3.0, sy in 0.1f64..3.0, sz in 0.1f64..3.0,
    ) {
        let device = Default::default();
        let geometry = ImageGeometry::new([nx, ny, nz], Point::new([ox, oy, oz]), Spacing::new([sx, sy, sz]), Direction::identity());
        let values: Vec<f32> = (0..nx * ny * nz).map(|v| v as f32).collect();
        let image = Image::<Backend, 3>::from_voxels(values, &geometry, PixelType::UInt16, &device);

        let transform = AffineTransform::<3>::identity();
        let output_geometry = reference_free_geometry::<Backend, _, 3>(&image.geometry(), &transform, None, None).unwrap();
        let output = resample_onto(&image, output_geometry, transform, Interpolation::Linear, 0.0, None).unwrap();

        prop_assert_eq!(output.geometry(), image.geometry());
        prop_assert_eq!(output.pixel_type(), image.pixel_type());
        prop_assert_eq!(output.to_voxels(), image.to_voxels());
    }
}

#[test]
fn test_rotation_reshape_grows_grid() {
    let geometry = ImageGeometry::with_default_metadata([9, 9, 9]);
    let image = cube_image(9, geometry);
    let content = rotation_content([0.0, 0.0, 45.0], &geometry);
    let resampling = content.try_inverse().unwrap();

    let grown = reference_free_geometry::<Backend, _, 3>(&geometry, &resampling, None, None).unwrap();
    let output = resample_onto(&image, grown, resampling, NearestNeighborInterpolator::new(), 0.0, None).unwrap();

    // Rotation about z enlarges the x and y extents, z is untouched.
    assert!(output.size()[0] > 9);
    assert!(output.size()[1] > 9);
    assert_eq!(output.size()[2], 9);
    assert!(output.origin()[0] < 0.0);
    assert!(output.origin()[1] < 0.0);
    assert_eq!(output.pixel_type(), PixelType::Int16);
}

#[test]
fn test_rotation_on_fixed_grid_keeps_origin() {
    let geometry = ImageGeometry::new([8, 8, 8], Point::new([3.0, -4.0, 1.0]), Spacing::uniform(0.5), Direction::identity());
    let image = cube_image(8, geometry);
    let resampling = rotation_content([30.0, 0.0, 0.0], &geometry).try_inverse().unwrap();

    let output = resample_onto(&image, geometry, resampling, Interpolation::Linear, -1.0, None).unwrap();
    assert_eq!(output.geometry(), geometry);
}

#[test]
fn test_half_turn_about_center_reverses_axis() {
    let device = Default::default();
    let geometry = ImageGeometry::with_default_metadata([4, 1]);
    let image = Image::<Backend, 2>::from_voxels(vec![1.0, 2.0, 3.0, 4.0], &geometry, PixelType::Float32, &device);
    let center = geometry.physical_center();
    let resampling = AffineTransform::<2>::from_parameters(&[180.0], &Vector::new([1.0, 1.0]), &Vector::zeros(), &center)
        .unwrap()
        .try_inverse()
        .unwrap();

    let output = resample_onto(&image, geometry, resampling, NearestNeighborInterpolator::new(), 0.0, None).unwrap();
    assert_eq!(output.to_voxels(), vec![4.0, 3.0, 2.0, 1.0]);
}
