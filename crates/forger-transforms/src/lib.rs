//! Composable transforms for paired image/mask samples.
//!
//! Every transform consumes a [`Sample`] (an image and an optional mask on
//! the same grid) and returns a new one, drawing randomness only from the
//! generator it is handed. Transforms nest through the combinators in
//! [`compose`] and the probability gate in [`gate`]; a [`Pipeline`] runs a
//! tree with a seeded generator.

pub mod error;
pub mod sample;
pub mod transform;
pub mod gate;
pub mod compose;
pub mod region;
pub mod crop;
pub mod spatial;
pub mod mask;
pub mod intensity;
pub mod io;
pub mod pipeline;

pub use error::{Result, TransformError};
pub use sample::Sample;
pub use transform::{BoxedTransform, Transform, TransformExt};
pub use gate::{Identity, RandomApply};
pub use compose::{Compose, Factory, Lambda, OneOf, ParamGrid, RandomChoices, RandomOrder};
pub use region::Region;
pub use crop::{
    CenterCrop, Crop, ForegroundCrop, IfMissing, Pad, RandomCrop, RandomSegmentSafeCrop, SegmentCrop,
};
pub use spatial::{
    Affine, Expand, Flip, Isotropic, RandomAffine, RandomRotation, Resample, ResampleConfig, Resize, Rotation, Shrink,
};
pub use mask::{
    Background, Clip, ConnectedComponents, ForegroundMask, IsolateRange, Label, MaskImage, MaskLabelRemap,
    RasterLabeler,
};
pub use intensity::{IntensityRangeTransfer, Invert, MinMaxScaler, UnitNormalize, WindowLocationClip};
pub use io::{read_image, read_sample, write_sample, ImageIo, NiftiIo};
pub use pipeline::{Pipeline, PipelineConfig};
pub use forger_core::filter::PadMethod;
