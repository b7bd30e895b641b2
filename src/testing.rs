//! Raster fixtures shared by unit tests, integration tests and benches.

use crate::geotiff::{self, WriteOptions};
use crate::geotransform::GeoTransform;
use crate::raster::{Raster, SampleType};
use std::path::{Path, PathBuf};

/// A 30 m single band elevation raster in UTM zone 13N (EPSG:32613) whose
/// elevation rises towards the south-east.
pub fn utm_dem(width: usize, height: usize) -> Raster {
    let mut raster = Raster::new(width, height, 1, SampleType::F32);
    raster.transform = GeoTransform::new(480_000.0, 4_430_000.0, 30.0, -30.0);
    raster.epsg = Some(32613);
    for row in 0..height {
        for col in 0..width {
            raster.set(0, col, row, 1500.0 + col as f64 * 2.0 + row as f64);
        }
    }
    raster
}

/// A geographic (EPSG:4326) elevation raster covering one degree square
/// north-west of (-105, 40) with a dip below sea level in its first row.
pub fn geographic_dem(width: usize, height: usize) -> Raster {
    let mut raster = Raster::new(width, height, 1, SampleType::I16);
    raster.transform = GeoTransform::new(
        -106.0,
        40.0,
        1.0 / width as f64,
        -1.0 / height as f64,
    );
    raster.epsg = Some(4326);
    for row in 0..height {
        for col in 0..width {
            let value = if row == 0 {
                -5.0
            } else {
                (col * 10 + row) as f64
            };
            raster.set(0, col, row, value);
        }
    }
    raster
}

/// Writes a raster as GeoTIFF into `dir` and returns its path.
pub fn write_geotiff(dir: &Path, name: &str, raster: &Raster) -> PathBuf {
    let path = dir.join(name);
    geotiff::write(raster, &path, WriteOptions::default())
        .expect("fixture GeoTIFF should be writable");
    path
}

/// Writes an 8-bit grayscale PNG gradient into `dir` and returns its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let image = image::ImageBuffer::from_fn(width, height, |x, y| {
        image::Luma([((x + y) % 256) as u8])
    });
    image.save(&path).expect("fixture PNG should be writable");
    path
}
