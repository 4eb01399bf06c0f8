//! Grid geometry: how voxel indices map to physical space.

use serde::{Deserialize, Serialize};
use crate::spatial::{Direction, Point, Spacing, Vector};

/// Origin, spacing, direction and size of a regular voxel grid.
///
/// `size` is in physical axis order `(x, y[, z])`. The physical position of
/// continuous index `i` is `origin + direction * (i ⊙ spacing)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry<const D: usize> {
    #[serde(with = "size_serde")]
    size: [usize; D],
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
}

impl<const D: usize> ImageGeometry<D> {
    pub fn new(size: [usize; D], origin: Point<D>, spacing: Spacing<D>, direction: Direction<D>) -> Self {
        Self {
            size,
            origin,
            spacing,
            direction,
        }
    }

    /// Unit spacing, zero origin and identity direction.
    pub fn with_default_metadata(size: [usize; D]) -> Self {
        Self::new(size, Point::origin(), Spacing::uniform(1.0), Direction::identity())
    }

    pub fn size(&self) -> [usize; D] {
        self.size
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    pub fn set_size(mut self, size: [usize; D]) -> Self {
        self.size = size;
        self
    }

    pub fn set_origin(mut self, origin: Point<D>) -> Self {
        self.origin = origin;
        self
    }

    pub fn set_spacing(mut self, spacing: Spacing<D>) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn set_direction(mut self, direction: Direction<D>) -> Self {
        self.direction = direction;
        self
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.size.iter().product()
    }

    /// Tensor shape (`[z, y, x]` for 3D) matching this grid.
    pub fn tensor_shape(&self) -> [usize; D] {
        std::array::from_fn(|i| self.size[D - 1 - i])
    }

    /// Map a continuous index to a physical point.
    pub fn index_to_physical(&self, index: &[f64; D]) -> Point<D> {
        let scaled = Vector::new(*index).component_mul(&self.spacing);
        self.origin + self.direction * scaled
    }

    /// Map a physical point to a continuous index.
    ///
    /// Returns `None` if the direction matrix is singular.
    pub fn physical_to_index(&self, point: &Point<D>) -> Option<[f64; D]> {
        let inv_dir = self.direction.try_inverse()?;
        let rotated = inv_dir * (*point - self.origin);
        Some(rotated.component_div(&self.spacing).to_array())
    }

    /// The `2^D` extreme points of the grid, built from every combination of
    /// index `0` and index `size[i]` per axis.
    pub fn corners(&self) -> Vec<Point<D>> {
        (0..1usize << D)
            .map(|bits| {
                let index: [f64; D] = std::array::from_fn(|axis| {
                    if bits & (1 << axis) != 0 {
                        self.size[axis] as f64
                    } else {
                        0.0
                    }
                });
                self.index_to_physical(&index)
            })
            .collect()
    }

    /// Physical position of the central voxel, index `(size - 1) / 2`.
    pub fn physical_center(&self) -> Point<D> {
        let index: [f64; D] = std::array::from_fn(|axis| (self.size[axis] as f64 - 1.0) / 2.0);
        self.index_to_physical(&index)
    }

    /// Same size and metadata within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.size == other.size
            && (0..D).all(|i| (self.origin[i] - other.origin[i]).abs() <= tolerance)
            && (0..D).all(|i| (self.spacing[i] - other.spacing[i]).abs() <= tolerance)
            && (0..D).all(|r| (0..D).all(|c| (self.direction[(r, c)] - other.direction[(r, c)]).abs() <= tolerance))
    }
}


/// serde only implements arrays of fixed literal length; (de)serialize the
/// const-generic size array as a sequence.
mod size_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer, const D: usize>(size: &[usize; D], s: S) -> Result<S::Ok, S::Error> {
        size.as_slice().serialize(s)
    }

    pub fn deserialize<'de, De: Deserializer<'de>, const D: usize>(d: De) -> Result<[usize; D], De::Error> {
        let v = Vec::<usize>::deserialize(d)?;
        let len = v.len();
        v.try_into()
            .map_err(|_| De::Error::invalid_length(len, &"an array of the image dimensionality"))
    }
}
