//! Reading and writing image/mask pairs.
//!
//! File formats live behind [`ImageIo`]. A path may name a single image file
//! or a directory holding exactly one image series.

pub mod nifti_io;

pub use nifti_io::NiftiIo;

use std::fmt::Debug;
use std::path::Path;
use burn::tensor::backend::Backend;
use forger_core::Image;
use tracing::debug;
use crate::error::{Result, TransformError};
use crate::sample::Sample;

/// Image file backend.
pub trait ImageIo<B: Backend, const D: usize>: Debug + Send + Sync {
    /// Read a single image file.
    fn read(&self, path: &Path, device: &B::Device) -> Result<Image<B, D>>;

    /// Identifiers of the image series stored in `directory`.
    fn series_ids(&self, directory: &Path) -> Result<Vec<String>>;

    /// Read one series of `directory`.
    fn read_series(&self, directory: &Path, series_id: &str, device: &B::Device) -> Result<Image<B, D>>;

    /// Write `image` to `path`, replacing any existing file.
    fn write(&self, image: &Image<B, D>, path: &Path) -> Result<()>;
}

/// Read the image at `path`, which is a file or a single-series directory.
pub fn read_image<B, I, const D: usize>(io: &I, path: &Path, device: &B::Device) -> Result<Image<B, D>>
where
    B: Backend,
    I: ImageIo<B, D> + ?Sized,
{
    if !path.exists() {
        return Err(TransformError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return io.read(path, device);
    }

    let ids = io.series_ids(path)?;
    match ids.as_slice() {
        [] => Err(TransformError::EmptySeries(path.to_path_buf())),
        [id] => {
            debug!(path = %path.display(), series = %id, "reading series");
            io.read_series(path, id, device)
        }
        _ => Err(TransformError::AmbiguousSeries {
            path: path.to_path_buf(),
            count: ids.len(),
        }),
    }
}

/// Read an image and, when `mask_path` is given, its mask.
pub fn read_sample<B, I, const D: usize>(
    io: &I,
    image_path: &Path,
    mask_path: Option<&Path>,
    device: &B::Device,
) -> Result<Sample<B, D>>
where
    B: Backend,
    I: ImageIo<B, D> + ?Sized,
{
    let image = read_image(io, image_path, device)?;
    let mask = mask_path.map(|path| read_image(io, path, device)).transpose()?;
    Sample::new(image, mask)
}

/// Write the image of `sample` and, when `mask_path` is given, its mask.
pub fn write_sample<B, I, const D: usize>(
    io: &I,
    sample: &Sample<B, D>,
    image_path: &Path,
    mask_path: Option<&Path>,
) -> Result<()>
where
    B: Backend,
    I: ImageIo<B, D> + ?Sized,
{
    io.write(sample.image(), image_path)?;
    if let Some(path) = mask_path {
        let mask = sample
            .mask()
            .ok_or_else(|| TransformError::missing_operand("cannot write a mask the sample does not have"))?;
        io.write(mask, path)?;
    }
    Ok(())
}
