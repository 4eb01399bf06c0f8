//! NIfTI-1 backend.
//!
//! The voxel-to-world affine comes from the sform when set, else from the
//! qform, else from `pixdim` alone. Voxels are written as `f32`, so the
//! pixel type of a written image reads back as `Float32`.

use std::fs;
use std::path::Path;
use burn::tensor::backend::Backend;
use forger_core::{Direction, Image, ImageGeometry, PixelType, Point, Spacing};
use nalgebra::{Matrix3, Vector3};
use ndarray::Array3;
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use tracing::debug;
use crate::error::{Result, TransformError};
use super::ImageIo;

/// Reads and writes `.nii` / `.nii.gz` volumes. Each NIfTI file in a
/// directory counts as one series.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiIo;

fn is_nifti(name: &str) -> bool {
    name.ends_with(".nii") || name.ends_with(".nii.gz")
}

fn backend_error(context: &str, err: impl std::fmt::Display) -> TransformError {
    TransformError::backend(format!("{}: {}", context, err))
}

/// Pixel type of a NIfTI `datatype` code.
fn pixel_type(datatype: i16) -> PixelType {
    match datatype {
        2 => PixelType::UInt8,
        4 => PixelType::Int16,
        8 => PixelType::Int32,
        64 => PixelType::Float64,
        256 => PixelType::Int8,
        512 => PixelType::UInt16,
        768 => PixelType::UInt32,
        _ => PixelType::Float32,
    }
}

/// Rows of the 3x4 voxel-to-world affine.
fn affine(header: &NiftiHeader) -> [[f64; 4]; 3] {
    let widen = |row: [f32; 4]| row.map(f64::from);
    if header.sform_code > 0 {
        return [widen(header.srow_x), widen(header.srow_y), widen(header.srow_z)];
    }

    let dx = f64::from(header.pixdim[1]);
    let dy = f64::from(header.pixdim[2]);
    let dz = f64::from(header.pixdim[3]);
    if header.qform_code <= 0 {
        return [[dx, 0.0, 0.0, 0.0], [0.0, dy, 0.0, 0.0], [0.0, 0.0, dz, 0.0]];
    }

    let (b, c, d) = (
        f64::from(header.quatern_b),
        f64::from(header.quatern_c),
        f64::from(header.quatern_d),
    );
    let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let dz = dz * qfac;
    [
        [
            (a * a + b * b - c * c - d * d) * dx,
            (2.0 * b * c - 2.0 * a * d) * dy,
            (2.0 * b * d + 2.0 * a * c) * dz,
            f64::from(header.quatern_x),
        ],
        [
            (2.0 * b * c + 2.0 * a * d) * dx,
            (a * a + c * c - b * b - d * d) * dy,
            (2.0 * c * d - 2.0 * a * b) * dz,
            f64::from(header.quatern_y),
        ],
        [
            (2.0 * b * d - 2.0 * a * c) * dx,
            (2.0 * c * d + 2.0 * a * b) * dy,
            (a * a + d * d - c * c - b * b) * dz,
            f64::from(header.quatern_z),
        ],
    ]
}

/// Split the affine into origin, spacing and unit direction columns.
fn geometry(header: &NiftiHeader, size: [usize; 3]) -> ImageGeometry<3> {
    let rows = affine(header);
    let origin = Point::new([rows[0][3], rows[1][3], rows[2][3]]);
    let axes = [Vector3::x(), Vector3::y(), Vector3::z()];

    let mut spacing = [1.0; 3];
    let columns: [Vector3<f64>; 3] = std::array::from_fn(|j| {
        let column = Vector3::new(rows[0][j], rows[1][j], rows[2][j]);
        let norm = column.norm();
        if norm > 1e-9 {
            spacing[j] = norm;
            column / norm
        } else {
            axes[j]
        }
    });

    ImageGeometry::new(
        size,
        origin,
        Spacing::new(spacing),
        Direction(Matrix3::from_columns(&columns)),
    )
}

fn header_for(geometry: &ImageGeometry<3>) -> NiftiHeader {
    let spacing = geometry.spacing().to_array();
    let direction = geometry.direction().0;
    let origin = geometry.origin();
    let row = |i: usize| -> [f32; 4] {
        [
            (direction[(i, 0)] * spacing[0]) as f32,
            (direction[(i, 1)] * spacing[1]) as f32,
            (direction[(i, 2)] * spacing[2]) as f32,
            origin[i] as f32,
        ]
    };

    let mut header = NiftiHeader::default();
    header.pixdim = [1.0, spacing[0] as f32, spacing[1] as f32, spacing[2] as f32, 1.0, 1.0, 1.0, 1.0];
    header.sform_code = 2;
    header.srow_x = row(0);
    header.srow_y = row(1);
    header.srow_z = row(2);
    header
}

impl<B: Backend> ImageIo<B, 3> for NiftiIo {
    fn read(&self, path: &Path, device: &B::Device) -> Result<Image<B, 3>> {
        let object = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| backend_error("failed to read NIfTI file", e))?;
        let header = object.header().clone();
        let volume = object
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| backend_error("failed to decode NIfTI volume", e))?;

        let shape = volume.shape().to_vec();
        if shape.len() != 3 {
            return Err(TransformError::dimension_mismatch(format!(
                "expected a 3D NIfTI volume, found {} dimensions",
                shape.len()
            )));
        }
        let size = [shape[0], shape[1], shape[2]];

        // NIfTI indexes [x, y, z]; storage here is x fastest.
        let mut voxels = Vec::with_capacity(size.iter().product());
        for z in 0..size[2] {
            for y in 0..size[1] {
                for x in 0..size[0] {
                    voxels.push(volume[[x, y, z].as_slice()]);
                }
            }
        }

        debug!(path = %path.display(), ?size, "read NIfTI");
        Ok(Image::from_voxels(voxels, &geometry(&header, size), pixel_type(header.datatype), device))
    }

    fn series_ids(&self, directory: &Path) -> Result<Vec<String>> {
        let entries = fs::read_dir(directory).map_err(|e| backend_error("failed to list directory", e))?;
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| is_nifti(name))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn read_series(&self, directory: &Path, series_id: &str, device: &B::Device) -> Result<Image<B, 3>> {
        ImageIo::<B, 3>::read(self, &directory.join(series_id), device)
    }

    fn write(&self, image: &Image<B, 3>, path: &Path) -> Result<()> {
        let geometry = image.geometry();
        let [nx, ny, nz] = geometry.size();
        let voxels = image.to_voxels();
        let array = Array3::from_shape_fn((nx, ny, nz), |(x, y, z)| voxels[x + nx * (y + ny * z)]);

        let header = header_for(&geometry);
        WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(&array)
            .map_err(|e| backend_error("failed to write NIfTI file", e))?;
        debug!(path = %path.display(), size = ?geometry.size(), "wrote NIfTI");
        Ok(())
    }
}
