use crate::errors::HillmapError;
use crate::geotiff::{self, WriteOptions};
use crate::raster::Raster;
use crate::staging::StagedOutput;
use crate::validate::has_extension;
use crate::Result;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// File format of an output, decided by the output path's extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tiff,
    Jpeg,
    Bmp,
    Png,
}

impl OutputFormat {
    /// `.tif`/`.tiff` select TIFF, `.jpg`/`.jpeg` JPEG, `.bmp` BMP and
    /// everything else PNG.
    pub fn from_path(path: &Path) -> OutputFormat {
        if has_extension(path, &["tif", "tiff"]) {
            OutputFormat::Tiff
        } else if has_extension(path, &["jpg", "jpeg"]) {
            OutputFormat::Jpeg
        } else if has_extension(path, &["bmp"]) {
            OutputFormat::Bmp
        } else {
            OutputFormat::Png
        }
    }

    /// Whether the format carries georeferencing.
    pub fn is_raster_container(&self) -> bool {
        *self == OutputFormat::Tiff
    }

    /// The name Blender uses for the format in its image settings.
    pub fn blender_name(&self) -> &'static str {
        match self {
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Png => "PNG",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Png => ImageFormat::Png,
        }
    }
}

/// Reads a GeoTIFF with its georeferencing, or a viewable image with one
/// band per channel.
pub fn read_raster(path: &Path) -> Result<Raster> {
    if has_extension(path, &["tif", "tiff"]) {
        return geotiff::read(path);
    }

    let image = image::open(path).map_err(|e| HillmapError::ImageLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Raster::from_image(image)
}

/// Writes a raster in the format its path selects. Only GeoTIFF outputs keep
/// the georeferencing.
pub fn write_raster(
    raster: &Raster,
    path: &Path,
    options: WriteOptions,
) -> Result<()> {
    let format = OutputFormat::from_path(path);
    if format.is_raster_container() {
        return geotiff::write(raster, path, options);
    }

    let mut image = raster.to_image()?;
    if format == OutputFormat::Jpeg {
        image = match image.color().channel_count() {
            1 | 2 => DynamicImage::ImageLuma8(image.to_luma8()),
            _ => DynamicImage::ImageRgb8(image.to_rgb8()),
        };
    }

    let staged = StagedOutput::new(path);
    image.save_with_format(staged.path(), format.image_format())?;
    staged.commit()?;

    log::debug!(
        "Wrote {}: {}x{} {:?}",
        path.display(),
        raster.width,
        raster.height,
        format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SampleType;
    use rstest::rstest;

    #[rstest]
    #[case("out.tif", OutputFormat::Tiff)]
    #[case("out.TIFF", OutputFormat::Tiff)]
    #[case("out.jpg", OutputFormat::Jpeg)]
    #[case("out.jpeg", OutputFormat::Jpeg)]
    #[case("out.bmp", OutputFormat::Bmp)]
    #[case("out.png", OutputFormat::Png)]
    #[case("out.webp", OutputFormat::Png)]
    #[case("out", OutputFormat::Png)]
    fn format_from_extension(#[case] path: &str, #[case] expected: OutputFormat) {
        assert_eq!(OutputFormat::from_path(Path::new(path)), expected);
    }

    /// A PNG written from a raster decodes to the same samples.
    #[test]
    fn png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        let mut raster = Raster::new(5, 4, 1, SampleType::U16);
        raster.set(0, 2, 3, 40_000.0);

        write_raster(&raster, &path, WriteOptions::default()).unwrap();
        let restored = read_raster(&path).unwrap();
        assert_eq!(restored.sample_type, SampleType::U16);
        assert_eq!(restored.get(0, 2, 3), 40_000.0);
    }

    /// JPEG has no alpha channel, so RGBA rasters are written as RGB.
    #[test]
    fn jpeg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.jpg");
        let raster = Raster::new(8, 8, 4, SampleType::U8);
        write_raster(&raster, &path, WriteOptions::default()).unwrap();
        assert_eq!(read_raster(&path).unwrap().band_count(), 3);
    }

    #[test]
    fn unreadable_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(
            read_raster(&path),
            Err(HillmapError::ImageLoad { .. })
        ));
    }
}
