use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use forger_core::image::Image;
use forger_core::spatial::{Direction, Point, Spacing};
use forger_core::transform::rotation_matrix;
use proptest::prelude::*;

type Backend = NdArray<f32>;
const D: usize = 3;

fn make_direction(ax: f64, ay: f64, az: f64) -> Direction<D> {
    Direction(rotation_matrix::<D>(&[ax, ay, az]).unwrap())
}

fn make_image(origin: [f64; 3], spacing: [f64; 3], direction: Direction<D>) -> Image<Backend, D> {
    let device = Default::default();
    // Only metadata is exercised here.
    let data = Tensor::<Backend, D>::zeros([2, 2, 2], &device);
    Image::new(data, Point::new(origin), Spacing::new(spacing), direction)
}

#[test]
fn test_rotated_image_transform() {
    // Direction rotates index x onto physical y.
    let image = make_image([0.0; 3], [1.0; 3], make_direction(0.0, 0.0, 90.0));

    let index = image
        .transform_physical_point_to_continuous_index(&Point::new([1.0, 0.0, 0.0]))
        .unwrap();
    assert!(index[0].abs() < 1e-9, "expected index[0] = 0, got {}", index[0]);
    assert!((index[1] + 1.0).abs() < 1e-9, "expected index[1] = -1, got {}", index[1]);
    assert!(index[2].abs() < 1e-9, "expected index[2] = 0, got {}", index[2]);

    let device = Default::default();
    let points = Tensor::<Backend, 2>::from_floats([[1.0, 0.0, 0.0]], &device);
    let indices = image.world_to_index_tensor(points).unwrap().into_data().to_vec::<f32>().unwrap();
    assert!(indices[0].abs() < 1e-5);
    assert!((indices[1] + 1.0).abs() < 1e-5);
    assert!(indices[2].abs() < 1e-5);
}

proptest! {
    #[test]
    fn test_coordinate_roundtrip(
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ax in -180.0f64..180.0, ay in -180.0f64..180.0, az in -180.0f64..180.0,
        px in -50.0f64..50.0, py in -50.0f64..50.0, pz in -50.0f64..50.0
    ) {
        let image = make_image([ox, oy, oz], [sx, sy, sz], make_direction(ax, ay, az));
        let point = Point::<D>::new([px, py, pz]);

        let index = image.transform_physical_point_to_continuous_index(&point).unwrap();
        let recovered = image.transform_continuous_index_to_physical_point(&index);

        prop_assert!((point[0] - recovered[0]).abs() < 1e-6, "X mismatch: {} vs {}", point[0], recovered[0]);
        prop_assert!((point[1] - recovered[1]).abs() < 1e-6, "Y mismatch: {} vs {}", point[1], recovered[1]);
        prop_assert!((point[2] - recovered[2]).abs() < 1e-6, "Z mismatch: {} vs {}", point[2], recovered[2]);
    }

    #[test]
    fn test_tensor_batch_consistency(
        ox in -10.0f64..10.0, oy in -10.0f64..10.0,
        sx in 0.5f64..2.0, sy in 0.5f64..2.0,
        az in -90.0f64..90.0,
        px in -10.0f64..10.0, py in -10.0f64..10.0, pz in -10.0f64..10.0
    ) {
        let image = make_image([ox, oy, 1.0], [sx, sy, 1.5], make_direction(0.0, 0.0, az));
        let device = Default::default();

        let points = Tensor::<Backend, 2>::from_floats([[px as f32, py as f32, pz as f32]], &device);
        let batch = image.world_to_index_tensor(points).unwrap().into_data().to_vec::<f32>().unwrap();
        let single = image
            .transform_physical_point_to_continuous_index(&Point::new([px as f32 as f64, py as f32 as f64, pz as f32 as f64]))
            .unwrap();

        for i in 0..D {
            prop_assert!((batch[i] as f64 - single[i]).abs() < 1e-3, "axis {} mismatch: {} vs {}", i, batch[i], single[i]);
        }
    }
}
