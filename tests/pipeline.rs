use hillmap::errors::{HillmapError, ValidationError};
use hillmap::georeference::apply_georeference;
use hillmap::inspect::{describe, plot, PlotOptions, DEFAULT_TITLE};
use hillmap::render::{render_with, RenderRequest};
use hillmap::scene::{RenderHost, RenderParameters, SceneDocument};
use hillmap::testing::{geographic_dem, utm_dem, write_geotiff};
use hillmap::transform::{clip, downsample, reproject, to_image};
use std::fs;
use std::path::Path;

/// Writes a flat gray image of the size the scene would render.
struct FlatHost;

impl RenderHost for FlatHost {
    fn render(
        &self,
        document: &SceneDocument,
        output: &Path,
    ) -> hillmap::Result<()> {
        let render = &document.render;
        let width = render.resolution_x * render.resolution_percentage / 100;
        let height = render.resolution_y * render.resolution_percentage / 100;
        image::GrayImage::from_pixel(width, height, image::Luma([128]))
            .save(output)?;
        Ok(())
    }
}

const CLIP_POLYGON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {},
      "geometry": {
        "type": "Polygon",
        "coordinates": [[
          [-105.8, 39.2], [-105.2, 39.2], [-105.2, 39.8],
          [-105.8, 39.8], [-105.8, 39.2]
        ]]
      }
    }
  ]
}"#;

#[test]
fn reprojected_raster_reports_target_system() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_geotiff(dir.path(), "utm.tif", &utm_dem(60, 40));
    let output = dir.path().join("geographic.tif");

    reproject(&input, "EPSG:4326", &output).unwrap();

    let description = describe(&output).unwrap();
    assert_eq!(description.spatial_reference.as_deref(), Some("EPSG:4326"));
    let bounds = description.bounds;
    assert!(bounds.west > -106.0 && bounds.east < -105.0);
    assert!(bounds.south > 39.0 && bounds.north < 41.0);
    assert!(description.min_elevation >= 0.0);
    assert!(description.max_elevation > 1500.0);
    assert!(description.max_elevation <= 1657.0);
}

#[test]
fn fetched_raster_to_georeferenced_render() {
    let dir = tempfile::tempdir().unwrap();
    let dem = write_geotiff(dir.path(), "dem.tif", &geographic_dem(100, 100));

    let polygon = dir.path().join("area.geojson");
    fs::write(&polygon, CLIP_POLYGON).unwrap();
    let clipped = dir.path().join("clipped.tif");
    clip(&dem, &polygon, &clipped, true).unwrap();
    let clipped_description = describe(&clipped).unwrap();
    assert!(clipped_description.width < 100);
    assert!(clipped_description.min_elevation >= 0.0);

    let clipped_image = dir.path().join("clipped.png");
    to_image(&clipped, &clipped_image).unwrap();
    let small = dir.path().join("small.png");
    downsample(&clipped_image, &small, 2).unwrap();
    let (small_width, small_height) = image::image_dimensions(&small).unwrap();
    assert_eq!(small_width as usize, clipped_description.width / 2);
    assert_eq!(small_height as usize, clipped_description.height / 2);

    let render = dir.path().join("render.png");
    let parameters = RenderParameters::new(0.5, 90, 45, 100, 5).unwrap();
    let request = RenderRequest::new(&small, &render, parameters).unwrap();
    render_with(&FlatHost, &request).unwrap();

    let georeferenced = dir.path().join("render.tif");
    apply_georeference(&render, &clipped, &georeferenced).unwrap();

    let description = describe(&georeferenced).unwrap();
    assert_eq!(description.spatial_reference.as_deref(), Some("EPSG:4326"));
    assert_eq!(description.width, small_width as usize);
    assert_eq!(description.min_elevation, 128.0);
    let (bounds, expected) = (description.bounds, clipped_description.bounds);
    assert!((bounds.west - expected.west).abs() < 1e-9);
    assert!((bounds.north - expected.north).abs() < 1e-9);
}

#[test]
fn plot_writes_map_and_histogram() {
    let dir = tempfile::tempdir().unwrap();
    let dem = write_geotiff(dir.path(), "dem.tif", &utm_dem(30, 20));
    let output = dir.path().join("map.png");

    let summary = plot(&dem, &PlotOptions::new(&output)).unwrap();

    assert_eq!(summary.title, DEFAULT_TITLE);
    assert!(summary.map.exists());
    let (histogram_path, histogram) = summary.histogram.unwrap();
    assert_eq!(histogram_path, dir.path().join("map_histogram.png"));
    assert!(histogram_path.exists());
    assert_eq!(histogram.counts.iter().sum::<usize>(), 600);
}

#[test]
fn invalid_input_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.tif");

    let result = reproject(&dir.path().join("missing.tif"), "4326", &output);

    assert!(matches!(
        result,
        Err(HillmapError::Validation(ValidationError::PathNotFound { .. }))
    ));
    assert!(!output.exists());
}
