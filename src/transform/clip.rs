use crate::errors::HillmapError;
use crate::geometry::read_polygons;
use crate::geotiff::{self, WriteOptions};
use crate::raster::Raster;
use crate::validate::{Checks, PathRole};
use crate::Result;
use geo::{BoundingRect, Contains, MultiPolygon, Point};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub input: PathBuf,
    pub geometry: PathBuf,
    pub output: PathBuf,
    pub crop: bool,
    pub options: WriteOptions,
}

impl ClipRequest {
    /// # Arguments
    ///
    /// * `input` - GeoTIFF to clip.
    /// * `geometry` - GeoJSON or shapefile with the polygons to keep.
    /// * `output` - GeoTIFF to write.
    /// * `crop` - Shrink the output to the polygons' envelope instead of
    ///   keeping the input's extent.
    pub fn new(
        input: &Path,
        geometry: &Path,
        output: &Path,
        crop: bool,
    ) -> Result<ClipRequest> {
        Checks::new()
            .input("input", input, PathRole::GeoTiff)
            .input("geometry", geometry, PathRole::Geometry)
            .output("output", output, PathRole::GeoTiff)
            .run()?;

        Ok(ClipRequest {
            input: input.to_path_buf(),
            geometry: geometry.to_path_buf(),
            output: output.to_path_buf(),
            crop,
            options: WriteOptions::default(),
        })
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self) -> Result<()> {
        let polygons = read_polygons(&self.geometry)?;
        let raster = geotiff::read(&self.input)?;
        log::info!(
            "Clipping {} with {} polygon(s) from {}",
            self.input.display(),
            polygons.0.len(),
            self.geometry.display()
        );

        let clipped = clip_raster(&raster, &polygons, self.crop)?;
        geotiff::write(&clipped, &self.output, self.options)
    }
}

/// Masks the GeoTIFF at `input` with the polygons in `geometry` and writes
/// the result to `output`.
pub fn clip(
    input: &Path,
    geometry: &Path,
    output: &Path,
    crop: bool,
) -> Result<()> {
    ClipRequest::new(input, geometry, output, crop)?.run()
}

/// Pixel window `(col, row, width, height)` covering the polygons'
/// envelope, or `None` when it does not overlap the raster.
fn envelope_window(
    raster: &Raster,
    polygons: &MultiPolygon<f64>,
) -> Option<(usize, usize, usize, usize)> {
    let rect = polygons.bounding_rect()?;
    let (c0, r0) = raster.transform.geo_to_pixel(rect.min().x, rect.min().y);
    let (c1, r1) = raster.transform.geo_to_pixel(rect.max().x, rect.max().y);

    let (width, height) = (raster.width as f64, raster.height as f64);
    let col_start = c0.min(c1).floor().clamp(0.0, width) as usize;
    let col_end = c0.max(c1).ceil().clamp(0.0, width) as usize;
    let row_start = r0.min(r1).floor().clamp(0.0, height) as usize;
    let row_end = r0.max(r1).ceil().clamp(0.0, height) as usize;

    if col_start >= col_end || row_start >= row_end {
        return None;
    }
    Some((col_start, row_start, col_end - col_start, row_end - row_start))
}

/// Keeps the pixels whose centre lies inside one of the polygons and zeroes
/// the others. Negative and nodata samples become 0, which is also the
/// output's nodata value.
///
/// # Arguments
///
/// * `raster` - Raster to clip, in the same spatial reference as the
///   polygons.
/// * `polygons` - The mask.
/// * `crop` - Restrict the output to the pixel window covering the
///   polygons' envelope.
pub fn clip_raster(
    raster: &Raster,
    polygons: &MultiPolygon<f64>,
    crop: bool,
) -> Result<Raster> {
    let window = envelope_window(raster, polygons);
    let (col0, row0, width, height) = if crop {
        window.ok_or(HillmapError::NoOverlap)?
    } else {
        if window.is_none() {
            log::warn!("The clipping geometry does not overlap the raster");
        }
        (0, 0, raster.width, raster.height)
    };

    log::debug!(
        "Clip window {}x{} at pixel ({}, {})",
        width,
        height,
        col0,
        row0
    );

    let mut output =
        Raster::new(width, height, raster.band_count(), raster.sample_type);
    let mut inside_count = 0usize;
    for row in 0..height {
        for col in 0..width {
            let (x, y) = raster.transform.pixel_center(col0 + col, row0 + row);
            if !polygons.contains(&Point::new(x, y)) {
                continue;
            }
            inside_count += 1;

            for band in 0..raster.band_count() {
                let value = raster.get(band, col0 + col, row0 + row);
                let value = if raster.is_nodata(value) {
                    0.0
                } else {
                    value.max(0.0)
                };
                output.set(band, col, row, value);
            }
        }
    }

    log::debug!("{} pixel(s) inside the clipping geometry", inside_count);

    output.transform = raster.transform.window(col0, row0);
    output.epsg = raster.epsg;
    output.model_type = raster.model_type;
    output.nodata = Some(0.0);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{geographic_dem, utm_dem, write_geotiff};
    use geo::{polygon, MultiPolygon};
    use std::fs;

    /// A square covering pixels 2..6 x 1..4 of `utm_dem`.
    fn utm_square() -> MultiPolygon<f64> {
        let (west, north) = (480_000.0 + 2.0 * 30.0, 4_430_000.0 - 30.0);
        let (east, south) = (480_000.0 + 6.0 * 30.0, 4_430_000.0 - 4.0 * 30.0);
        MultiPolygon::new(vec![polygon![
            (x: west, y: south),
            (x: east, y: south),
            (x: east, y: north),
            (x: west, y: north),
            (x: west, y: south),
        ]])
    }

    #[test]
    fn crop_to_envelope() {
        let raster = utm_dem(10, 8);
        let clipped = clip_raster(&raster, &utm_square(), true).unwrap();

        assert_eq!((clipped.width, clipped.height), (4, 3));
        assert_eq!(clipped.transform.origin_x, 480_060.0);
        assert_eq!(clipped.transform.origin_y, 4_429_970.0);
        assert_eq!(clipped.get(0, 0, 0), raster.get(0, 2, 1));
        assert_eq!(clipped.nodata, Some(0.0));
        assert_eq!(clipped.epsg, Some(32613));
    }

    #[test]
    fn keep_extent_without_crop() {
        let raster = utm_dem(10, 8);
        let clipped = clip_raster(&raster, &utm_square(), false).unwrap();

        assert_eq!((clipped.width, clipped.height), (10, 8));
        assert_eq!(clipped.transform, raster.transform);
        assert_eq!(clipped.get(0, 0, 0), 0.0);
        assert_eq!(clipped.get(0, 3, 2), raster.get(0, 3, 2));
        assert_eq!(clipped.get(0, 6, 2), 0.0);
    }

    #[test]
    fn negative_values_become_zero() {
        let raster = geographic_dem(10, 10);
        let everything = MultiPolygon::new(vec![polygon![
            (x: -107.0, y: 38.0),
            (x: -104.0, y: 38.0),
            (x: -104.0, y: 41.0),
            (x: -107.0, y: 41.0),
            (x: -107.0, y: 38.0),
        ]]);
        let clipped = clip_raster(&raster, &everything, true).unwrap();

        assert_eq!((clipped.width, clipped.height), (10, 10));
        assert_eq!(clipped.get(0, 4, 0), 0.0);
        assert_eq!(clipped.get(0, 4, 5), 45.0);
    }

    #[test]
    fn disjoint_geometry() {
        let raster = utm_dem(10, 8);
        let far_away = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);

        assert!(matches!(
            clip_raster(&raster, &far_away, true),
            Err(HillmapError::NoOverlap)
        ));
        let zeroed = clip_raster(&raster, &far_away, false).unwrap();
        assert_eq!(zeroed.min_max(), None);
    }

    #[test]
    fn clip_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_geotiff(dir.path(), "dem.tif", &utm_dem(10, 8));
        let geometry = dir.path().join("square.geojson");
        fs::write(
            &geometry,
            r#"{"type": "Polygon", "coordinates": [[
                [480060, 4429880], [480180, 4429880], [480180, 4429970],
                [480060, 4429970], [480060, 4429880]
            ]]}"#,
        )
        .unwrap();
        let output = dir.path().join("clipped.tif");

        clip(&input, &geometry, &output, true).unwrap();
        let clipped = geotiff::read(&output).unwrap();
        assert_eq!((clipped.width, clipped.height), (4, 3));
    }

    #[test]
    fn geometry_extension_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_geotiff(dir.path(), "dem.tif", &utm_dem(4, 4));
        let geometry = dir.path().join("square.kml");
        fs::write(&geometry, "<kml/>").unwrap();

        let result =
            ClipRequest::new(&input, &geometry, &dir.path().join("o.tif"), true);
        assert!(matches!(
            result,
            Err(HillmapError::Validation(
                crate::errors::ValidationError::InvalidExtension { .. }
            ))
        ));
    }
}
