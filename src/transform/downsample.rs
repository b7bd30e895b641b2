use crate::errors::ValidationError;
use crate::formats::{read_raster, write_raster};
use crate::geotiff::WriteOptions;
use crate::raster::Raster;
use crate::validate::{Checks, PathRole};
use crate::Result;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct DownsampleRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub factor: u32,
    pub options: WriteOptions,
}

impl DownsampleRequest {
    /// # Arguments
    ///
    /// * `input` - PNG, BMP or GeoTIFF to shrink.
    /// * `output` - File to write, in the format its extension selects.
    /// * `factor` - How many times smaller the output is along each axis,
    ///   at least 2.
    pub fn new(
        input: &Path,
        output: &Path,
        factor: u32,
    ) -> Result<DownsampleRequest> {
        Checks::new()
            .input("input", input, PathRole::Downsample)
            .output("output", output, PathRole::Downsample)
            .at_least("factor", factor as f64, 2.0)
            .run()?;

        Ok(DownsampleRequest {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            factor,
            options: WriteOptions::default(),
        })
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self) -> Result<()> {
        let raster = read_raster(&self.input)?;
        log::info!(
            "Downsampling {} by a factor of {}",
            self.input.display(),
            self.factor
        );
        let smaller = downsample_raster(&raster, self.factor)?;
        write_raster(&smaller, &self.output, self.options)
    }
}

/// Shrinks the image or GeoTIFF at `input` by `factor` along each axis and
/// writes it to `output`.
pub fn downsample(input: &Path, output: &Path, factor: u32) -> Result<()> {
    DownsampleRequest::new(input, output, factor)?.run()
}

/// Resamples every band to `floor(width / factor)` by
/// `floor(height / factor)` pixels with a Catmull-Rom filter. The transform
/// is scaled so the result covers the same extent.
pub fn downsample_raster(raster: &Raster, factor: u32) -> Result<Raster> {
    let factor = factor as usize;
    let (width, height) = (raster.width / factor, raster.height / factor);
    if width == 0 || height == 0 {
        return Err(ValidationError::OutOfRange {
            param: "factor".to_string(),
            reason: format!(
                "{} leaves nothing of a {}x{} raster",
                factor, raster.width, raster.height
            ),
        }
        .into());
    }

    log::debug!(
        "Resampling {}x{} to {}x{}",
        raster.width,
        raster.height,
        width,
        height
    );

    let bands = raster
        .bands()
        .iter()
        .map(|band| resample_band(raster, band, width, height))
        .collect();

    let mut output = Raster::from_bands(width, height, bands, raster.sample_type)?;
    output.transform = raster.transform.scaled(
        raster.width as f64 / width as f64,
        raster.height as f64 / height as f64,
    );
    output.epsg = raster.epsg;
    output.model_type = raster.model_type;
    output.nodata = raster.nodata;
    Ok(output)
}

/// Output pixels whose filter footprint is less covered by valid samples
/// than this become nodata.
const FULL_COVERAGE: f32 = 0.999;

fn resize(
    samples: Vec<f32>,
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
) -> Option<Vec<f32>> {
    let buffer = ImageBuffer::<Luma<f32>, _>::from_raw(
        width as u32,
        height as u32,
        samples,
    )?;
    let resized = imageops::resize(
        &buffer,
        new_width as u32,
        new_height as u32,
        FilterType::CatmullRom,
    );
    Some(resized.into_raw())
}

/// The image filters work on samples in [0, 1], so the band is normalised by
/// the range of its valid samples before resizing and mapped back
/// afterwards. Voids are filled with the minimum for the filter and a
/// validity mask is resized alongside, so any output pixel that drew on a
/// void is written as nodata.
fn resample_band(
    raster: &Raster,
    band: &[f64],
    new_width: usize,
    new_height: usize,
) -> Vec<f64> {
    let (width, height) = (raster.width, raster.height);
    let void = raster.nodata.unwrap_or(f64::NAN);
    let valid: Vec<bool> = band.iter().map(|&v| !raster.is_nodata(v)).collect();

    let range = band
        .iter()
        .zip(&valid)
        .filter(|(_, ok)| **ok)
        .fold(None, |acc, (&v, _)| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((f64::min(min, v), f64::max(max, v))),
        });
    let Some((min, max)) = range else {
        return vec![void; new_width * new_height];
    };

    let span = max - min;
    let resized = if span > 0.0 {
        let normalised = band
            .iter()
            .zip(&valid)
            .map(|(&v, &ok)| if ok { ((v - min) / span) as f32 } else { 0.0 })
            .collect();
        resize(normalised, width, height, new_width, new_height)
    } else {
        None
    };
    let mut values: Vec<f64> = match resized {
        Some(resized) => {
            resized.into_iter().map(|v| min + v as f64 * span).collect()
        }
        None => vec![min; new_width * new_height],
    };

    if valid.iter().all(|&ok| ok) {
        return values;
    }
    let mask = valid.iter().map(|&ok| if ok { 1.0 } else { 0.0 }).collect();
    if let Some(coverage) = resize(mask, width, height, new_width, new_height)
    {
        for (value, coverage) in values.iter_mut().zip(coverage) {
            if coverage < FULL_COVERAGE {
                *value = void;
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HillmapError;
    use crate::raster::SampleType;
    use crate::testing::{utm_dem, write_geotiff, write_png};
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[test]
    fn quarter_size() {
        let raster = Raster::new(4000, 2000, 1, SampleType::U8);
        let smaller = downsample_raster(&raster, 4).unwrap();
        assert_eq!((smaller.width, smaller.height), (1000, 500));
    }

    #[rstest]
    #[case(10, 7, 3, 3, 2)]
    #[case(5, 5, 2, 2, 2)]
    #[case(9, 4, 4, 2, 1)]
    fn sizes_are_floored(
        #[case] width: usize,
        #[case] height: usize,
        #[case] factor: u32,
        #[case] expected_width: usize,
        #[case] expected_height: usize,
    ) {
        let raster = Raster::new(width, height, 1, SampleType::U8);
        let smaller = downsample_raster(&raster, factor).unwrap();
        assert_eq!((smaller.width, smaller.height), (expected_width, expected_height));
    }

    #[test]
    fn georeferencing_covers_the_same_extent() {
        let raster = utm_dem(40, 20);
        let smaller = downsample_raster(&raster, 4).unwrap();

        assert_eq!(smaller.epsg, Some(32613));
        assert_abs_diff_eq!(smaller.transform.pixel_width, 120.0);
        assert_abs_diff_eq!(smaller.transform.pixel_height, -120.0);
        assert_eq!(smaller.bounds(), raster.bounds());
    }

    /// Resampled values stay within the source range.
    #[test]
    fn values_stay_in_range() {
        let raster = utm_dem(40, 20);
        let smaller = downsample_raster(&raster, 2).unwrap();
        let (min, max) = raster.min_max().unwrap();
        let (new_min, new_max) = smaller.min_max().unwrap();
        assert!(new_min >= min - 1e-3 && new_max <= max + 1e-3);
        assert!(new_max > new_min);
    }

    #[test]
    fn constant_band() {
        let mut raster = Raster::new(8, 8, 1, SampleType::U16);
        raster.band_mut(0).fill(300.0);
        let smaller = downsample_raster(&raster, 2).unwrap();
        assert!(smaller.band(0).iter().all(|&v| v == 300.0));
    }

    /// Voids are not smeared into valid pixels: every output sample is
    /// either nodata or an elevation from the valid range.
    #[test]
    fn voids_stay_nodata() {
        let mut raster = utm_dem(40, 40);
        raster.sample_type = SampleType::I16;
        raster.nodata = Some(-32768.0);
        raster.set(0, 10, 10, -32768.0);
        let (min, max) = raster.min_max().unwrap();

        let smaller = downsample_raster(&raster, 4).unwrap();

        assert_eq!(smaller.nodata, Some(-32768.0));
        assert!(smaller.is_nodata(smaller.get(0, 2, 2)));
        assert!(!smaller.is_nodata(smaller.get(0, 8, 8)));
        for &value in smaller.band(0) {
            assert!(
                smaller.is_nodata(value)
                    || (value >= min - 1e-3 && value <= max + 1e-3),
                "{} outside {}..{}",
                value,
                min,
                max
            );
        }
    }

    #[test]
    fn fully_void_band() {
        let mut raster = Raster::new(8, 8, 1, SampleType::I16);
        raster.nodata = Some(-9999.0);
        raster.band_mut(0).fill(-9999.0);
        let smaller = downsample_raster(&raster, 2).unwrap();
        assert!(smaller.band(0).iter().all(|&v| v == -9999.0));
    }

    #[test]
    fn factor_larger_than_raster() {
        let raster = Raster::new(3, 3, 1, SampleType::U8);
        assert!(matches!(
            downsample_raster(&raster, 4),
            Err(HillmapError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    /// A factor below 2 is rejected before any output is written.
    #[rstest]
    #[case(0)]
    #[case(1)]
    fn factor_below_two(#[case] factor: u32) {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "dem.png", 16, 16);
        let output = dir.path().join("small.png");

        let result = downsample(&input, &output, factor);
        assert!(matches!(
            result,
            Err(HillmapError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn png_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "dem.png", 64, 32);
        let output = dir.path().join("small.png");

        downsample(&input, &output, 4).unwrap();
        let image = image::open(&output).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
    }

    #[test]
    fn geotiff_to_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_geotiff(dir.path(), "dem.tif", &utm_dem(30, 30));
        let output = dir.path().join("small.tif");

        downsample(&input, &output, 3).unwrap();
        let smaller = crate::geotiff::read(&output).unwrap();
        assert_eq!((smaller.width, smaller.height), (10, 10));
        assert_eq!(smaller.epsg, Some(32613));
    }
}
