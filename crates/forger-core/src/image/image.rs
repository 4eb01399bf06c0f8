//! Image type with physical metadata and coordinate transformations.
//!
//! An Image combines a burn tensor holding voxel values with the physical
//! metadata (origin, spacing, direction) that places the voxel grid in
//! space, plus the logical pixel type of the values.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use crate::image::{ImageGeometry, PixelType};
use crate::spatial::{Direction, Point, Spacing};

/// Medical image with physical metadata.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
/// * `D` - The dimensionality of the image (2 or 3)
///
/// # Coordinate Systems
/// * **Index Space**: voxel indices in axis order `(x, y, z)`
/// * **Storage**: tensor dims `[z, y, x]`, x varying fastest
/// * **Physical Space**: continuous coordinates in mm or other units
///
/// # Examples
/// ```rust
/// use forger_core::Image;
/// use forger_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
/// let image = Image::new(data, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity());
/// assert_eq!(image.size(), [10, 10, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
    pixel_type: PixelType,
}

/// A label image: same grid as its image, integer labels, `0` is background.
pub type Mask<B, const D: usize> = Image<B, D>;

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a `Float32` image with the given data and metadata.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
            pixel_type: PixelType::Float32,
        }
    }

    /// Create an image whose metadata comes from `geometry`.
    ///
    /// The tensor shape must equal `geometry.tensor_shape()`.
    pub fn from_geometry(data: Tensor<B, D>, geometry: &ImageGeometry<D>, pixel_type: PixelType) -> Self {
        debug_assert_eq!(data.dims(), geometry.tensor_shape());
        Self {
            data: pixel_type.cast_tensor(data),
            origin: *geometry.origin(),
            spacing: *geometry.spacing(),
            direction: *geometry.direction(),
            pixel_type,
        }
    }

    /// Build an image from voxel values in storage order.
    pub fn from_voxels(
        values: Vec<f32>,
        geometry: &ImageGeometry<D>,
        pixel_type: PixelType,
        device: &B::Device,
    ) -> Self {
        let data = Tensor::from_data(TensorData::new(values, geometry.tensor_shape()), device);
        Self::from_geometry(data, geometry, pixel_type)
    }

    /// Re-label the pixel type, casting the voxel values.
    pub fn with_pixel_type(self, pixel_type: PixelType) -> Self {
        Self {
            data: pixel_type.cast_tensor(self.data),
            pixel_type,
            ..self
        }
    }

    /// Replace the voxel data, keeping metadata and pixel type.
    ///
    /// The new data is cast to the image's pixel type.
    pub fn with_data(&self, data: Tensor<B, D>) -> Self {
        Self {
            data: self.pixel_type.cast_tensor(data),
            origin: self.origin,
            spacing: self.spacing,
            direction: self.direction,
            pixel_type: self.pixel_type,
        }
    }

    /// Copy the voxel buffer instead of sharing it.
    pub fn deep_copy(&self) -> Self {
        let device = self.data.device();
        Self {
            data: Tensor::from_data(self.data.to_data(), &device),
            ..self.clone()
        }
    }

    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    pub fn into_data(self) -> Tensor<B, D> {
        self.data
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

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Tensor shape, storage order (`[z, y, x]` for 3D).
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Voxel count per axis, axis order (`[x, y, z]` for 3D).
    pub fn size(&self) -> [usize; D] {
        let shape = self.shape();
        std::array::from_fn(|i| shape[D - 1 - i])
    }

    /// Grid geometry of this image.
    pub fn geometry(&self) -> ImageGeometry<D> {
        ImageGeometry::new(self.size(), self.origin, self.spacing, self.direction)
    }

    /// Voxel values in storage order.
    pub fn to_voxels(&self) -> Vec<f32> {
        self.data.to_data().iter::<f32>().collect()
    }

    /// Convert a continuous physical point to a continuous index.
    ///
    /// `index = (Direction^-1 * (point - origin)) / spacing`. Returns `None`
    /// when the direction matrix is singular.
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Option<Point<D>> {
        self.geometry().physical_to_index(point).map(Point::new)
    }

    /// Convert a continuous index to a physical point.
    ///
    /// `point = origin + Direction * (index * spacing)`.
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        self.geometry().index_to_physical(&index.to_array())
    }

    /// Batch transform physical points `[N, D]` to continuous indices `[N, D]`.
    ///
    /// `I = (P - O) @ T` with `T_rc = (Direction^-1)_cr / spacing_c`.
    /// Returns `None` when the direction matrix is singular.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Option<Tensor<B, 2>> {
        let device = points.device();
        let inv_dir = self.direction.try_inverse()?;

        let origin_vec: Vec<f32> = (0..D).map(|i| self.origin[i] as f32).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(TensorData::new(origin_vec, [D]), &device).reshape([1, D]);

        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((inv_dir[(c, r)] / self.spacing[c]) as f32);
            }
        }
        let t_tensor = Tensor::<B, 2>::from_data(TensorData::new(t_data, [D, D]), &device);

        Some((points - origin_tensor).matmul(t_tensor))
    }
}
