//! Stateless operations that read one raster file and write another.

pub mod clip;
pub mod convert;
pub mod downsample;
pub mod reproject;

pub use clip::{clip, ClipRequest};
pub use convert::{to_image, ConvertRequest};
pub use downsample::{downsample, DownsampleRequest};
pub use reproject::{reproject, ReprojectRequest};
