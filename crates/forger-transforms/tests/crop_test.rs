use burn_ndarray::NdArray;
use forger_core::image::index_to_flat;
use forger_core::{Image, ImageGeometry, PixelType, Point, Spacing, Direction};
use forger_transforms::{
    CenterCrop, Crop, RandomCrop, RandomSegmentSafeCrop, Sample, SegmentCrop, Transform, TransformError,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

type Backend = NdArray<f32>;

const SIZE: usize = 11;

/// 11^3 cube whose voxel value is its flat offset, with a 7^3 foreground
/// block labelled 1 starting at voxel (2, 2, 2).
fn cube() -> Sample<Backend, 3> {
    let geometry = ImageGeometry::new(
        [SIZE; 3],
        Point::new([-5.0, 0.0, 10.0]),
        Spacing::new([1.0, 0.5, 2.0]),
        Direction::identity(),
    );
    let device = Default::default();
    let count = SIZE * SIZE * SIZE;
    let values: Vec<f32> = (0..count).map(|v| v as f32).collect();
    let labels: Vec<f32> = (0..count)
        .map(|flat| {
            let index = forger_core::image::flat_to_index(flat, [SIZE; 3]);
            if index.iter().all(|i| (2..9).contains(i)) { 1.0 } else { 0.0 }
        })
        .collect();

    let image = Image::from_voxels(values, &geometry, PixelType::Int32, &device);
    let mask = Image::from_voxels(labels, &geometry, PixelType::UInt8, &device);
    Sample::new(image, Some(mask)).unwrap()
}

#[test]
fn test_crop_window_values_and_origin() {
    let mut rng = StdRng::seed_from_u64(0);
    let cropped = Crop::new(vec![2, 2, 2], vec![1, 1, 1]).apply(cube(), &mut rng).unwrap();

    assert_eq!(cropped.image().size(), [2, 2, 2]);
    assert_eq!(cropped.mask().unwrap().size(), [2, 2, 2]);

    let expected: Vec<f32> = (1..3)
        .flat_map(|z| (1..3).flat_map(move |y| (1..3).map(move |x| index_to_flat([x, y, z], [SIZE; 3]) as f32)))
        .collect();
    assert_eq!(cropped.image().to_voxels(), expected);
    assert_eq!(cropped.image().origin().to_array(), [-4.0, 0.5, 12.0]);
    assert_eq!(cropped.image().spacing(), cube().image().spacing());
    assert_eq!(cropped.image().pixel_type(), PixelType::Int32);
}

#[test]
fn test_full_crop_is_identity() {
    let mut rng = StdRng::seed_from_u64(0);
    let input = cube();
    let cropped = Crop::new(vec![SIZE; 3], vec![0; 3]).apply(input.deep_copy(), &mut rng).unwrap();

    assert_eq!(cropped.image().geometry(), input.image().geometry());
    assert_eq!(cropped.image().to_voxels(), input.image().to_voxels());
    assert_eq!(cropped.mask().unwrap().to_voxels(), input.mask().unwrap().to_voxels());
}

#[test]
fn test_crop_bounds_violation() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = Crop::new(vec![5, 5, 5], vec![7, 0, 0]).apply(cube(), &mut rng).unwrap_err();
    assert_eq!(err.to_string(), "Invalid region: size + index cannot be greater than image size");

    let err = Crop::new(vec![SIZE; 3], vec![1, 1, 1]).apply(cube(), &mut rng).unwrap_err();
    assert!(matches!(err, TransformError::InvalidRegion(_)));

    let err = Crop::new(vec![2, 2, 2], vec![usize::MAX, 0, 0]).apply(cube(), &mut rng).unwrap_err();
    assert!(matches!(err, TransformError::InvalidRegion(_)));

    let err = Crop::new(vec![5, 5], vec![0, 0]).apply(cube(), &mut rng).unwrap_err();
    assert!(matches!(err, TransformError::DimensionMismatch(_)));

    let err = CenterCrop::new(vec![12, 1, 1]).apply(cube(), &mut rng).unwrap_err();
    assert!(matches!(err, TransformError::InvalidRegion(_)));

    let err = RandomCrop::new(vec![1, 1, 12]).apply(cube(), &mut rng).unwrap_err();
    assert!(matches!(err, TransformError::InvalidRegion(_)));
}

#[test]
fn test_center_crop_floors_offset() {
    let mut rng = StdRng::seed_from_u64(0);
    let cropped = CenterCrop::new(vec![4, 11, 1]).apply(cube(), &mut rng).unwrap();
    // floor((11 - 4) / 2) = 3, floor((11 - 1) / 2) = 5.
    assert_eq!(cropped.image().to_voxels()[0], index_to_flat([3, 0, 5], [SIZE; 3]) as f32);
    assert_eq!(cropped.image().size(), [4, 11, 1]);
}

#[test]
fn test_segment_crop_finds_foreground_block() {
    let mut rng = StdRng::seed_from_u64(0);
    let cropped = SegmentCrop::new(vec![1]).apply(cube(), &mut rng).unwrap();

    assert_eq!(cropped.image().size(), [7, 7, 7]);
    assert!(cropped.mask().unwrap().to_voxels().iter().all(|l| *l == 1.0));
    assert_eq!(cropped.image().origin().to_array(), [-3.0, 1.0, 14.0]);
}

#[test]
fn test_segment_safe_crop_without_mask() {
    let mut rng = StdRng::seed_from_u64(0);
    let (image, _) = cube().into_parts();
    let err = RandomSegmentSafeCrop::new(vec![3, 3, 3], vec![1])
        .apply(Sample::from_image(image), &mut rng)
        .unwrap_err();
    assert!(matches!(err, TransformError::MissingOperand(_)));
}

#[test]
fn test_segment_safe_crop_rejects_empty_size() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = RandomSegmentSafeCrop::new(vec![0, 2, 2], vec![1]).apply(cube(), &mut rng).unwrap_err();
    assert!(matches!(err, TransformError::InvalidRegion(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_segment_safe_crop_keeps_a_labelled_voxel(
        seed in any::<u64>(),
        sx in 1usize..=SIZE, sy in 1usize..=SIZE, sz in 1usize..=SIZE,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let cropped = RandomSegmentSafeCrop::new(vec![sx, sy, sz], vec![1])
            .apply(cube(), &mut rng)
            .unwrap();

        prop_assert_eq!(cropped.image().size(), [sx, sy, sz]);
        prop_assert!(cropped.mask().unwrap().to_voxels().iter().any(|l| *l == 1.0));
    }

    #[test]
    fn test_segment_safe_crop_degrades_without_labels(
        seed in any::<u64>(),
        sx in 1usize..=SIZE, sy in 1usize..=SIZE, sz in 1usize..=SIZE,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let cropped = RandomSegmentSafeCrop::new(vec![sx, sy, sz], vec![4])
            .apply(cube(), &mut rng)
            .unwrap();
        prop_assert_eq!(cropped.image().size(), [sx, sy, sz]);
        prop_assert_eq!(cropped.mask().unwrap().size(), [sx, sy, sz]);
    }
}
