#![deny(warnings)]

pub mod colormap;
pub mod config;
pub mod crs;
pub mod errors;
pub mod fetch;
pub mod formats;
pub mod geometry;
pub mod georeference;
pub mod geotiff;
pub mod geotransform;
pub mod inspect;
pub mod raster;
pub mod render;
pub mod scene;
pub mod staging;
pub mod testing;
pub mod transform;
pub mod trig;
pub mod validate;

pub type Result<T> = std::result::Result<T, errors::HillmapError>;
