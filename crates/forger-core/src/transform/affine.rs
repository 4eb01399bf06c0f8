//! Affine transform implementation.
//!
//! This module provides an affine transform (linear transformation + offset)
//! and the builders used by the geometric transforms: rotation, scaling and
//! translation about a fixed centre.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use nalgebra::{Matrix3, SMatrix, SVector};
use super::trait_::SpatialTransform;
use crate::spatial::{Point, Vector};

/// Affine Transform stored in offset form.
///
/// T(x) = A x + b
///
/// The centred form `A(x - c) + c + t` folds into the offset
/// `b = c + t - A c`. Storing the offset keeps the identity and its inverse
/// exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    offset: SVector<f64, D>,
}

impl<const D: usize> AffineTransform<D> {
    pub fn new(matrix: SMatrix<f64, D, D>, offset: Vector<D>) -> Self {
        Self {
            matrix,
            offset: offset.0,
        }
    }

    pub fn identity() -> Self {
        Self {
            matrix: SMatrix::identity(),
            offset: SVector::zeros(),
        }
    }

    /// Build `T(x) = A(x - c) + c + t`.
    pub fn centered(matrix: SMatrix<f64, D, D>, center: &Point<D>, translation: &Vector<D>) -> Self {
        let c = center.inner().coords;
        Self {
            matrix,
            offset: c + translation.0 - matrix * c,
        }
    }

    /// Build `T(x) = R S (x - c) + c + t` from rotation angles in degrees,
    /// per-axis scale factors and a translation.
    ///
    /// Returns `None` when the number of angles does not fit the
    /// dimensionality (one angle in 2D, three in 3D).
    pub fn from_parameters(
        angles_deg: &[f64],
        scales: &Vector<D>,
        translation: &Vector<D>,
        center: &Point<D>,
    ) -> Option<Self> {
        let rotation = rotation_matrix::<D>(angles_deg)?;
        let scale = SMatrix::<f64, D, D>::from_diagonal(&scales.0);
        Some(Self::centered(rotation * scale, center, translation))
    }

    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    pub fn offset(&self) -> Vector<D> {
        Vector(self.offset)
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
            offset: self.matrix * other.offset + self.offset,
        }
    }

    /// Exact inverse, `None` when the matrix is singular.
    pub fn try_inverse(&self) -> Option<Self> {
        if self.is_identity() {
            return Some(*self);
        }
        let inv = self.matrix.try_inverse()?;
        Some(Self {
            matrix: inv,
            offset: -(inv * self.offset),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == SMatrix::<f64, D, D>::identity() && self.offset == SVector::<f64, D>::zeros()
    }

    pub fn apply(&self, point: &Point<D>) -> Point<D> {
        let mapped = self.matrix * point.inner().coords + self.offset;
        Point::new(std::array::from_fn(|i| mapped[i]))
    }
}

impl<const D: usize> Default for AffineTransform<D> {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation matrix from angles in degrees.
///
/// 2D takes a single angle. 3D takes `(ax, ay, az)` and composes
/// `Rz · Ry · Rx`. Other combinations return `None`.
pub fn rotation_matrix<const D: usize>(angles_deg: &[f64]) -> Option<SMatrix<f64, D, D>> {
    let m3 = match (D, angles_deg) {
        (2, [a]) => {
            let (s, c) = a.to_radians().sin_cos();
            Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
        }
        (3, [ax, ay, az]) => {
            let (sx, cx) = ax.to_radians().sin_cos();
            let (sy, cy) = ay.to_radians().sin_cos();
            let (sz, cz) = az.to_radians().sin_cos();
            let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);
            let ry = Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
            let rz = Matrix3::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);
            rz * ry * rx
        }
        _ => return None,
    };
    Some(SMatrix::from_fn(|r, c| m3[(r, c)]))
}

impl<B: Backend, const D: usize> SpatialTransform<B, D> for AffineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row vectors: y = x @ A^T + b
        let device = points.device();

        let mut a_t = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                a_t.push(self.matrix[(c, r)] as f32);
            }
        }
        let a_t = Tensor::<B, 2>::from_data(TensorData::new(a_t, [D, D]), &device);

        let b: Vec<f32> = self.offset.iter().map(|v| *v as f32).collect();
        let b = Tensor::<B, 1>::from_data(TensorData::new(b, [D]), &device).reshape([1, D]);

        points.matmul(a_t) + b
    }

    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        self.apply(point)
    }

    fn inverse(&self) -> Option<Box<dyn SpatialTransform<B, D>>> {
        self.try_inverse()
            .map(|inv| Box::new(inv) as Box<dyn SpatialTransform<B, D>>)
    }

    fn is_identity(&self) -> bool {
        AffineTransform::is_identity(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_affine_transform_identity() {
        let device = Default::default();
        let transform = AffineTransform::<3>::identity();

        let points = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], &device);
        let transformed = SpatialTransform::<TestBackend, 3>::transform_points(&transform, points);
        let slice = transformed.into_data().to_vec::<f32>().unwrap();

        assert_eq!(slice, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(transform.try_inverse().unwrap().is_identity());
    }

    #[test]
    fn test_affine_transform_translation_with_center() {
        let transform = AffineTransform::<2>::centered(
            SMatrix::identity(),
            &Point::new([10.0, 10.0]),
            &Vector::new([1.0, 1.0]),
        );
        let moved = transform.apply(&Point::new([10.0, 10.0]));
        assert_eq!(moved, Point::new([11.0, 11.0]));
    }

    #[test]
    fn test_affine_transform_scale_with_center() {
        let transform = AffineTransform::<2>::from_parameters(
            &[0.0],
            &Vector::new([2.0, 2.0]),
            &Vector::zeros(),
            &Point::new([1.0, 1.0]),
        )
        .unwrap();

        // x - c = [1, 0], A(x - c) = [2, 0], + c = [3, 1]
        let moved = transform.apply(&Point::new([2.0, 1.0]));
        assert!((moved[0] - 3.0).abs() < 1e-12);
        assert!((moved[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_about_center_keeps_center() {
        let center = Point::new([5.0, -3.0, 2.0]);
        let transform = AffineTransform::<3>::from_parameters(
            &[30.0, -45.0, 60.0],
            &Vector::new([1.0, 1.0, 1.0]),
            &Vector::zeros(),
            &center,
        )
        .unwrap();
        let moved = transform.apply(&center);
        for i in 0..3 {
            assert!((moved[i] - center[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rotation_2d_quarter_turn() {
        let rotation = rotation_matrix::<2>(&[90.0]).unwrap();
        let v = rotation * SVector::<f64, 2>::new(1.0, 0.0);
        assert!(v[0].abs() < 1e-12);
        assert!((v[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_rejects_wrong_angle_count() {
        assert!(rotation_matrix::<3>(&[10.0]).is_none());
        assert!(rotation_matrix::<2>(&[10.0, 20.0, 30.0]).is_none());
    }

    #[test]
    fn test_inverse_and_compose() {
        let transform = AffineTransform::<3>::from_parameters(
            &[10.0, 20.0, 30.0],
            &Vector::new([1.5, 0.5, 2.0]),
            &Vector::new([3.0, -1.0, 4.0]),
            &Point::new([1.0, 2.0, 3.0]),
        )
        .unwrap();
        let inverse = transform.try_inverse().unwrap();
        let round_trip = inverse.compose(&transform);

        let p = Point::new([7.0, -2.0, 0.5]);
        let q = round_trip.apply(&p);
        for i in 0..3 {
            assert!((p[i] - q[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tensor_and_scalar_paths_agree() {
        let device = Default::default();
        let transform = AffineTransform::<2>::from_parameters(
            &[33.0],
            &Vector::new([1.2, 0.8]),
            &Vector::new([-1.0, 2.0]),
            &Point::new([4.0, 4.0]),
        )
        .unwrap();

        let points = Tensor::<TestBackend, 2>::from_floats([[1.0, 7.0]], &device);
        let mapped = SpatialTransform::<TestBackend, 2>::transform_points(&transform, points)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let expected = transform.apply(&Point::new([1.0, 7.0]));
        assert!((mapped[0] as f64 - expected[0]).abs() < 1e-4);
        assert!((mapped[1] as f64 - expected[1]).abs() < 1e-4);
    }
}
