use crate::formats::read_raster;
use crate::geotiff::{self, WriteOptions};
use crate::raster::Raster;
use crate::validate::{Checks, PathRole};
use crate::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct GeoreferenceRequest {
    pub rendered: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
    pub options: WriteOptions,
}

impl GeoreferenceRequest {
    pub fn new(
        rendered: &Path,
        reference: &Path,
        output: &Path,
    ) -> Result<GeoreferenceRequest> {
        Checks::new()
            .input("rendered", rendered, PathRole::Render)
            .input("reference", reference, PathRole::GeoTiff)
            .output("output", output, PathRole::GeoTiff)
            .run()?;

        Ok(GeoreferenceRequest {
            rendered: rendered.to_path_buf(),
            reference: reference.to_path_buf(),
            output: output.to_path_buf(),
            options: WriteOptions::default(),
        })
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self) -> Result<()> {
        let rendered = read_raster(&self.rendered)?;
        let reference = geotiff::read(&self.reference)?;

        log::info!(
            "Georeferencing {} like {}",
            self.rendered.display(),
            self.reference.display()
        );
        let georeferenced = georeference_raster(rendered, &reference);
        geotiff::write(&georeferenced, &self.output, self.options)
    }
}

/// Writes the render at `rendered` as a GeoTIFF at `output` carrying the
/// spatial reference and geotransform of the GeoTIFF at `reference`.
pub fn apply_georeference(
    rendered: &Path,
    reference: &Path,
    output: &Path,
) -> Result<()> {
    GeoreferenceRequest::new(rendered, reference, output)?.run()
}

/// Gives `rendered` the georeferencing of `reference`, keeping its samples
/// and sample type. A render of a different size than the reference covers
/// the same bounds with proportionally larger or smaller pixels.
pub fn georeference_raster(mut rendered: Raster, reference: &Raster) -> Raster {
    rendered.georeference_like(reference);

    if (rendered.width, rendered.height) != (reference.width, reference.height)
    {
        log::warn!(
            "Render is {}x{} but the reference is {}x{}; scaling the pixel size",
            rendered.width,
            rendered.height,
            reference.width,
            reference.height
        );
        rendered.transform = reference.transform.scaled(
            reference.width as f64 / rendered.width as f64,
            reference.height as f64 / rendered.height as f64,
        );
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{HillmapError, ValidationError};
    use crate::raster::SampleType;
    use crate::testing::{utm_dem, write_geotiff, write_png};
    use approx::assert_abs_diff_eq;

    #[test]
    fn copies_reference_georeferencing() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_geotiff(dir.path(), "dem.tif", &utm_dem(40, 30));
        let rendered = write_png(dir.path(), "render.png", 40, 30);
        let output = dir.path().join("render.tif");

        apply_georeference(&rendered, &reference, &output).unwrap();

        let result = geotiff::read(&output).unwrap();
        let expected = utm_dem(40, 30);
        assert_eq!(result.epsg, Some(32613));
        assert_eq!(result.transform, expected.transform);
        assert_eq!(result.sample_type, SampleType::U8);
        assert_eq!(result.get(0, 3, 2), 5.0);
    }

    /// A render at half resolution keeps the reference's bounds.
    #[test]
    fn smaller_render_covers_same_bounds() {
        let reference = utm_dem(200, 100);
        let rendered = Raster::new(100, 50, 3, SampleType::U8);

        let result = georeference_raster(rendered, &reference);

        assert_abs_diff_eq!(result.transform.pixel_width, 60.0);
        assert_abs_diff_eq!(result.transform.pixel_height, -60.0);
        assert_eq!(result.bounds(), reference.bounds());
        assert_eq!(result.band_count(), 3);
    }

    #[test]
    fn reference_must_be_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_png(dir.path(), "dem.png", 10, 10);
        let rendered = write_png(dir.path(), "render.png", 10, 10);

        let result =
            apply_georeference(&rendered, &reference, &dir.path().join("out.tif"));
        assert!(matches!(
            result,
            Err(HillmapError::Validation(
                ValidationError::InvalidExtension { .. }
            ))
        ));
    }
}
