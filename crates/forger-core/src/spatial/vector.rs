//! Vector type for displacements and per-axis quantities.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A vector in D-dimensional space.
///
/// Also used, through the [`Spacing`](super::Spacing) alias, for per-axis
/// voxel sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a new vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Create a vector from a slice; `None` when the length is not `D`.
    pub fn try_from_slice(components: &[f64]) -> Option<Self> {
        if components.len() != D {
            return None;
        }
        Some(Self(SVector::from_column_slice(components)))
    }

    /// Components as an array.
    pub fn to_array(&self) -> [f64; D] {
        std::array::from_fn(|i| self.0[i])
    }

    /// Element-wise product.
    pub fn component_mul(&self, other: &Self) -> Self {
        Self(self.0.component_mul(&other.0))
    }

    /// Element-wise quotient.
    pub fn component_div(&self, other: &Self) -> Self {
        Self(self.0.component_div(&other.0))
    }

    pub fn inner(&self) -> &SVector<f64, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}

impl<const D: usize> std::ops::Neg for Vector<D> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Vector3 = Vector<3>;

    #[test]
    fn test_vector_component_ops() {
        let a = Vector3::new([2.0, 4.0, 6.0]);
        let b = Vector3::new([2.0, 0.5, 3.0]);
        assert_eq!(a.component_mul(&b), Vector3::new([4.0, 2.0, 18.0]));
        assert_eq!(a.component_div(&b), Vector3::new([1.0, 8.0, 2.0]));
    }

    #[test]
    fn test_vector_from_slice_length() {
        assert!(Vector3::try_from_slice(&[1.0, 2.0, 3.0]).is_some());
        assert!(Vector3::try_from_slice(&[1.0]).is_none());
    }
}
