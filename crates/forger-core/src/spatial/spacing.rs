//! Physical distance between adjacent voxels along each axis.

use super::Vector;

/// Spacing between adjacent pixels/voxels along each axis.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing on every axis.
    pub fn uniform(value: f64) -> Self {
        Self::new([value; D])
    }

    /// Spacing must be finite and strictly positive on every axis.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self[i].is_finite() && self[i] > 0.0)
    }
}
