//! Image filters.
//!
//! Every filter reads an input image and builds a new one; inputs are never
//! modified in place.

pub mod resample;
pub mod region;
pub mod flip;
pub mod pad;
pub mod shrink;

pub use resample::ResampleImageFilter;
pub use region::ExtractRegionFilter;
pub use flip::FlipFilter;
pub use pad::{PadFilter, PadMethod};
pub use shrink::ShrinkFilter;
