use crate::formats::write_raster;
use crate::geotiff::{self, WriteOptions};
use crate::raster::{Raster, SampleType};
use crate::validate::{Checks, PathRole};
use crate::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: WriteOptions,
}

impl ConvertRequest {
    pub fn new(input: &Path, output: &Path) -> Result<ConvertRequest> {
        Checks::new()
            .input("input", input, PathRole::GeoTiff)
            .output("output", output, PathRole::ImageConversion)
            .run()?;

        Ok(ConvertRequest {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            options: WriteOptions::default(),
        })
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self) -> Result<()> {
        let raster = geotiff::read(&self.input)?;
        log::info!(
            "Converting {} to an 8-bit image",
            self.input.display()
        );
        write_raster(&stretch_to_u8(&raster), &self.output, self.options)
    }
}

/// Converts the GeoTIFF at `input` into an 8-bit image (or 8-bit GeoTIFF)
/// that image viewers and the renderer can load.
pub fn to_image(input: &Path, output: &Path) -> Result<()> {
    ConvertRequest::new(input, output)?.run()
}

/// Maps the valid range of all bands linearly onto 0..=255. Nodata samples
/// and rasters holding a single value map to 0.
pub fn stretch_to_u8(raster: &Raster) -> Raster {
    let mut output = raster.clone();
    output.sample_type = SampleType::U8;
    output.nodata = None;

    let (min, max) = match raster.min_max() {
        Some((min, max)) if max > min => (min, max),
        _ => {
            for band in output.bands_mut() {
                band.fill(0.0);
            }
            return output;
        }
    };

    let span = max - min;
    for band in output.bands_mut() {
        for value in band.iter_mut() {
            *value = if raster.is_nodata(*value) {
                0.0
            } else if *value >= max {
                255.0
            } else {
                ((*value - min) * 255.0 / span).floor().max(0.0)
            };
        }
    }
    output
}
