//! Point type for positions in physical space.

use nalgebra::Point as NaPoint;
use serde::{Deserialize, Serialize};
use super::Vector;

/// A position in D-dimensional physical space.
///
/// Used for image origins, voxel centres, grid corners and the fixed centre
/// of spatial transforms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a new point from coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// The point with all coordinates zero.
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Create a point from a slice; `None` when the length is not `D`.
    pub fn try_from_slice(coords: &[f64]) -> Option<Self> {
        if coords.len() != D {
            return None;
        }
        let mut point = Self::origin();
        for (i, c) in coords.iter().enumerate() {
            point[i] = *c;
        }
        Some(point)
    }

    /// Coordinates as an array.
    pub fn to_array(&self) -> [f64; D] {
        std::array::from_fn(|i| self[i])
    }

    /// Per-axis minimum of two points.
    pub fn inf(&self, other: &Self) -> Self {
        Self::new(std::array::from_fn(|i| self[i].min(other[i])))
    }

    /// Per-axis maximum of two points.
    pub fn sup(&self, other: &Self) -> Self {
        Self::new(std::array::from_fn(|i| self[i].max(other[i])))
    }

    pub fn inner(&self) -> &NaPoint<f64, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0.coords[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0.coords - other.0.coords)
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 + vector.0)
    }
}

impl<const D: usize> std::ops::Sub<Vector<D>> for Point<D> {
    type Output = Self;

    fn sub(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 - vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Point3 = Point<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_point_from_slice() {
        let p = Point3::try_from_slice(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(p.to_array(), [1.0, 2.0, 3.0]);
        assert!(Point3::try_from_slice(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_point_inf_sup() {
        let a = Point3::new([1.0, 5.0, -2.0]);
        let b = Point3::new([3.0, 0.0, -4.0]);
        assert_eq!(a.inf(&b), Point3::new([1.0, 0.0, -4.0]));
        assert_eq!(a.sup(&b), Point3::new([3.0, 5.0, -2.0]));
    }

    #[test]
    fn test_point_vector_arithmetic() {
        let p = Point3::new([1.0, 2.0, 3.0]);
        let v = Vector3::new([4.0, 5.0, 6.0]);
        assert_eq!(p + v, Point3::new([5.0, 7.0, 9.0]));
        assert_eq!((p + v) - p, v);
        assert_eq!(p - v, Point3::new([-3.0, -3.0, -3.0]));
    }
}
