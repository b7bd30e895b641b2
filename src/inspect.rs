use crate::colormap::Colormap;
use crate::geotiff;
use crate::geotransform::Bounds;
use crate::raster::Raster;
use crate::staging::StagedOutput;
use crate::validate::{Checks, PathRole};
use crate::Result;
use image::{ImageFormat, Rgb, RgbImage};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TITLE: &str = "DEM Map";
pub const HISTOGRAM_BINS: usize = 50;

const COLORBAR_GAP: u32 = 4;
const COLORBAR_WIDTH: u32 = 16;
const BIN_WIDTH: u32 = 10;
const HISTOGRAM_HEIGHT: u32 = 200;

/// Summary of a DEM file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemDescription {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    /// `EPSG:<code>`, or `None` when the file carries no EPSG code.
    pub spatial_reference: Option<String>,
    pub bounds: Bounds,
    pub nodata: Option<f64>,
}

/// Describes the GeoTIFF at `input`: value range over all bands, size, band
/// count, spatial reference and extent.
pub fn describe(input: &Path) -> Result<DemDescription> {
    Checks::new()
        .input("input", input, PathRole::GeoTiff)
        .run()?;

    let raster = geotiff::read(input)?;
    Ok(describe_raster(&raster))
}

/// Nodata samples are left out of the value range. A raster without valid
/// samples reports NaN for both.
pub fn describe_raster(raster: &Raster) -> DemDescription {
    let (min_elevation, max_elevation) =
        raster.min_max().unwrap_or((f64::NAN, f64::NAN));
    DemDescription {
        min_elevation,
        max_elevation,
        width: raster.width,
        height: raster.height,
        band_count: raster.band_count(),
        spatial_reference: raster.epsg.map(|epsg| format!("EPSG:{}", epsg)),
        bounds: raster.bounds(),
        nodata: raster.nodata,
    }
}

/// Equal width bins over the range of the values, the last bin including
/// its upper edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn new(values: impl Iterator<Item = f64> + Clone, bins: usize) -> Self {
        let (min, max) = values
            .clone()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
                (min.min(v), max.max(v))
            });
        let (min, max) = if !min.is_finite() {
            (0.0, 1.0)
        } else if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let mut counts = vec![0; bins];
        let width = (max - min) / bins as f64;
        for value in values {
            let bin = (((value - min) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Self { min, max, counts }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// Also draw a histogram of the band 1 values.
    pub histogram: bool,
    pub colormap: Colormap,
    /// Heading of the plot. The map image holds no text, so the title goes
    /// to the log and back to the caller in the [`PlotSummary`].
    pub title: String,
    pub output: PathBuf,
}

impl PlotOptions {
    pub fn new(output: &Path) -> Self {
        Self {
            histogram: true,
            colormap: Colormap::default(),
            title: DEFAULT_TITLE.to_string(),
            output: output.to_path_buf(),
        }
    }
}

/// What `plot` wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSummary {
    pub title: String,
    pub map: PathBuf,
    pub histogram: Option<(PathBuf, Histogram)>,
}

/// Draws band 1 of the GeoTIFF at `input` with the options' colour map and,
/// if asked, a histogram of its values. The plots are for looking at only;
/// nothing else reads them.
pub fn plot(input: &Path, options: &PlotOptions) -> Result<PlotSummary> {
    let histogram_path = histogram_path(&options.output);
    Checks::new()
        .input("input", input, PathRole::GeoTiff)
        .output("output", &options.output, PathRole::Plot)
        .run()?;

    let raster = geotiff::read(input)?;
    log::info!("Plotting \"{}\"", options.title);

    let map = draw_map(&raster, options.colormap);
    save(&map, &options.output)?;
    log::info!(
        "Plotted {} with {} to {}",
        input.display(),
        options.colormap,
        options.output.display()
    );

    let histogram = if options.histogram {
        let values = raster
            .band(0)
            .iter()
            .copied()
            .filter(|&v| !raster.is_nodata(v));
        let histogram = Histogram::new(values, HISTOGRAM_BINS);
        log_histogram(&histogram);
        save(&draw_histogram(&histogram), &histogram_path)?;
        Some((histogram_path, histogram))
    } else {
        None
    };

    Ok(PlotSummary {
        title: options.title.clone(),
        map: options.output.clone(),
        histogram,
    })
}

/// `<stem>_histogram.<ext>` next to the map.
fn histogram_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{}_histogram.{}", stem, ext.to_string_lossy()),
        None => format!("{}_histogram", stem),
    };
    output.with_file_name(name)
}

fn save(image: &RgbImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)?;
    let staged = StagedOutput::new(path);
    image.save_with_format(staged.path(), format)?;
    staged.commit()?;
    Ok(())
}

/// Band 1 coloured by value, with a colour bar on the right running from
/// the lowest value at the bottom to the highest at the top. Nodata pixels
/// are black.
fn draw_map(raster: &Raster, colormap: Colormap) -> RgbImage {
    let (width, height) = (raster.width as u32, raster.height as u32);
    let (min, max) = raster.min_max().unwrap_or((0.0, 0.0));
    let span = max - min;
    let band = raster.band(0);

    RgbImage::from_fn(width + COLORBAR_GAP + COLORBAR_WIDTH, height, |x, y| {
        if x < width {
            let value = band[(y * width + x) as usize];
            if raster.is_nodata(value) {
                return Rgb([0, 0, 0]);
            }
            let t = if span > 0.0 { (value - min) / span } else { 0.0 };
            colormap.color(t)
        } else if x < width + COLORBAR_GAP {
            Rgb([255, 255, 255])
        } else {
            let t = 1.0 - y as f64 / (height.max(2) - 1) as f64;
            colormap.color(t)
        }
    })
}

fn draw_histogram(histogram: &Histogram) -> RgbImage {
    let tallest = histogram.counts.iter().copied().max().unwrap_or(0).max(1);
    let width = histogram.counts.len() as u32 * BIN_WIDTH;

    RgbImage::from_fn(width, HISTOGRAM_HEIGHT, |x, y| {
        let count = histogram.counts[(x / BIN_WIDTH) as usize];
        let bar = (count as f64 / tallest as f64 * HISTOGRAM_HEIGHT as f64)
            .round() as u32;
        let edge = x % BIN_WIDTH == BIN_WIDTH - 1;
        if !edge && HISTOGRAM_HEIGHT - y <= bar {
            Rgb([31, 119, 180])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

fn log_histogram(histogram: &Histogram) {
    log::info!(
        "Histogram of elevation values: {} bins from {} to {}",
        histogram.counts.len(),
        histogram.min,
        histogram.max
    );
    for (index, count) in histogram.counts.iter().enumerate() {
        let low = histogram.min + index as f64 * histogram.bin_width();
        log::debug!(
            "[{:.2}, {:.2}) {}",
            low,
            low + histogram.bin_width(),
            count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HillmapError;
    use crate::testing::{geographic_dem, utm_dem, write_geotiff};

    #[test]
    fn describe_utm_dem() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_geotiff(dir.path(), "dem.tif", &utm_dem(10, 5));
        let description = describe(&input).unwrap();

        assert_eq!(description.min_elevation, 1500.0);
        assert_eq!(description.max_elevation, 1500.0 + 18.0 + 4.0);
        assert_eq!((description.width, description.height), (10, 5));
        assert_eq!(description.band_count, 1);
        assert_eq!(
            description.spatial_reference.as_deref(),
            Some("EPSG:32613")
        );
        assert_eq!(description.bounds.west, 480_000.0);
        assert_eq!(description.bounds.south, 4_430_000.0 - 150.0);
    }

    #[test]
    fn nodata_is_not_described() {
        let mut raster = geographic_dem(4, 4);
        raster.nodata = Some(-5.0);
        let description = describe_raster(&raster);
        assert_eq!(description.min_elevation, 1.0);
    }

    #[test]
    fn description_as_json() {
        let json =
            serde_json::to_value(describe_raster(&utm_dem(2, 2))).unwrap();
        assert_eq!(json["band_count"], 1);
        assert_eq!(json["spatial_reference"], "EPSG:32613");
        assert_eq!(json["bounds"]["north"], 4_430_000.0);
    }

    #[test]
    fn describe_rejects_images() {
        let dir = tempfile::tempdir().unwrap();
        let input = crate::testing::write_png(dir.path(), "dem.png", 4, 4);
        assert!(describe(&input).is_err());
    }

    #[test]
    fn histogram_bins() {
        let values = (0..100).map(|v| v as f64);
        let histogram = Histogram::new(values, 50);
        assert_eq!(histogram.counts.len(), 50);
        assert!(histogram.counts.iter().all(|&count| count == 2));
        assert_eq!(histogram.counts.iter().sum::<usize>(), 100);
    }

    #[test]
    fn histogram_of_constant_values() {
        let histogram = Histogram::new(std::iter::repeat(7.0).take(10), 50);
        assert_eq!(histogram.min, 6.5);
        assert_eq!(histogram.counts.iter().sum::<usize>(), 10);
    }

    #[test]
    fn plot_with_histogram() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_geotiff(dir.path(), "dem.tif", &utm_dem(30, 20));
        let mut options = PlotOptions::new(&dir.path().join("plot.png"));
        options.colormap = Colormap::Terrain;
        options.title = "Front Range".to_string();

        let summary = plot(&input, &options).unwrap();
        assert_eq!(summary.title, "Front Range");
        let map = image::open(&summary.map).unwrap();
        assert_eq!(map.width(), 30 + COLORBAR_GAP + COLORBAR_WIDTH);
        assert_eq!(map.height(), 20);

        let (path, histogram) = summary.histogram.unwrap();
        assert_eq!(path, dir.path().join("plot_histogram.png"));
        assert!(path.exists());
        assert_eq!(histogram.counts.iter().sum::<usize>(), 600);
    }

    #[test]
    fn plot_output_must_be_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_geotiff(dir.path(), "dem.tif", &utm_dem(4, 4));
        let options = PlotOptions::new(&dir.path().join("plot.tif"));
        assert!(matches!(plot(&input, &options), Err(HillmapError::Validation(_))));
    }
}
