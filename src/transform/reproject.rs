use crate::crs::{SpatialReference, Transformer};
use crate::errors::HillmapError;
use crate::geotiff::{self, WriteOptions};
use crate::geotransform::{Bounds, GeoTransform};
use crate::raster::{ModelType, Raster};
use crate::validate::{Checks, PathRole};
use crate::Result;
use std::path::{Path, PathBuf};

/// Number of points sampled along each edge of the source extent when
/// computing the extent in the target system.
const EDGE_SAMPLES: usize = 21;

#[derive(Debug, Clone)]
pub struct ReprojectRequest {
    pub input: PathBuf,
    pub target: SpatialReference,
    pub output: PathBuf,
    pub options: WriteOptions,
}

impl ReprojectRequest {
    /// # Arguments
    ///
    /// * `input` - GeoTIFF to reproject.
    /// * `target` - EPSG code of the target system, as `"32613"` or
    ///   `"EPSG:32613"`.
    /// * `output` - GeoTIFF to write.
    pub fn new(
        input: &Path,
        target: &str,
        output: &Path,
    ) -> Result<ReprojectRequest> {
        Checks::new()
            .input("input", input, PathRole::GeoTiff)
            .output("output", output, PathRole::GeoTiff)
            .run()?;

        Ok(ReprojectRequest {
            input: input.to_path_buf(),
            target: SpatialReference::parse(target)?,
            output: output.to_path_buf(),
            options: WriteOptions::default(),
        })
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self) -> Result<()> {
        let source = geotiff::read(&self.input)?;
        log::info!(
            "Reprojecting {} to {}",
            self.input.display(),
            self.target
        );
        let reprojected = reproject_raster(&source, &self.target)?;
        geotiff::write(&reprojected, &self.output, self.options)
    }
}

/// Reprojects the GeoTIFF at `input` into the spatial reference named by
/// `target` and writes the result to `output`.
pub fn reproject(input: &Path, target: &str, output: &Path) -> Result<()> {
    ReprojectRequest::new(input, target, output)?.run()
}

/// Resamples a raster into another spatial reference.
///
/// The output grid covers the envelope of the source extent in the target
/// system, with square pixels sized so the grid's diagonal holds as many
/// pixels as the source's. Samples are interpolated bilinearly; pixels
/// outside the source get the nodata value (or 0 when there is none).
pub fn reproject_raster(
    raster: &Raster,
    target: &SpatialReference,
) -> Result<Raster> {
    let epsg = raster.epsg.ok_or_else(|| {
        HillmapError::InvalidSpatialReference(
            "the input raster has no EPSG code".to_string(),
        )
    })?;
    let source = SpatialReference::from_epsg(epsg)?;
    let forward = Transformer::new(&source, target);

    let envelope = target_envelope(&raster.bounds(), &forward).ok_or_else(
        || {
            HillmapError::InvalidSpatialReference(format!(
                "the raster extent cannot be expressed in {}",
                target
            ))
        },
    )?;

    let source_diagonal = (raster.width as f64).hypot(raster.height as f64);
    let resolution = envelope.width().hypot(envelope.height()) / source_diagonal;
    let cells = |extent: f64| {
        // absorbs rounding when the extent is a whole number of pixels
        ((extent / resolution - 1e-9).ceil() as usize).max(1)
    };
    let (width, height) = (cells(envelope.width()), cells(envelope.height()));
    let transform =
        GeoTransform::new(envelope.west, envelope.north, resolution, -resolution);

    log::debug!(
        "Target grid {}x{} at {} units per pixel, origin ({}, {})",
        width,
        height,
        resolution,
        envelope.west,
        envelope.north
    );

    let fill = raster.nodata.unwrap_or(0.0);
    let inverse = forward.inverse();
    let mut output =
        Raster::new(width, height, raster.band_count(), raster.sample_type);

    for row in 0..height {
        for col in 0..width {
            let (x, y) = transform.pixel_center(col, row);
            let position = inverse
                .transform(x, y)
                .map(|(sx, sy)| raster.transform.geo_to_pixel(sx, sy));

            for band in 0..raster.band_count() {
                let value = position
                    .and_then(|(fc, fr)| bilinear(raster, band, fc, fr))
                    .unwrap_or(fill);
                output.set(band, col, row, value);
            }
        }
    }

    output.transform = transform;
    output.epsg = Some(target.epsg);
    output.model_type = Some(if target.is_geographic() {
        ModelType::Geographic
    } else {
        ModelType::Projected
    });
    output.nodata = raster.nodata;
    Ok(output)
}

/// Envelope of the points sampled along the edges of `bounds` once
/// transformed, or `None` when none of them could be transformed.
fn target_envelope(bounds: &Bounds, transformer: &Transformer) -> Option<Bounds> {
    let mut envelope = Bounds::empty();
    let mut transformed = 0;
    let steps = (EDGE_SAMPLES - 1) as f64;

    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / steps;
        let x = bounds.west + t * bounds.width();
        let y = bounds.south + t * bounds.height();
        let edge_points = [
            (x, bounds.north),
            (x, bounds.south),
            (bounds.west, y),
            (bounds.east, y),
        ];

        for (px, py) in edge_points {
            if let Some((tx, ty)) = transformer.transform(px, py) {
                envelope.include(tx, ty);
                transformed += 1;
            }
        }
    }

    if transformed == 0 || envelope.width() <= 0.0 || envelope.height() <= 0.0 {
        return None;
    }
    Some(envelope)
}

/// Bilinear sample at a fractional pixel position (pixel corners at integer
/// positions). Positions outside the raster give `None`; when a neighbour is
/// nodata the nearest sample is used instead.
fn bilinear(raster: &Raster, band: usize, col: f64, row: f64) -> Option<f64> {
    let (width, height) = (raster.width as f64, raster.height as f64);
    if !(0.0..=width).contains(&col) || !(0.0..=height).contains(&row) {
        return None;
    }

    let u = (col - 0.5).clamp(0.0, width - 1.0);
    let v = (row - 0.5).clamp(0.0, height - 1.0);
    let (c0, r0) = (u.floor() as usize, v.floor() as usize);
    let c1 = (c0 + 1).min(raster.width - 1);
    let r1 = (r0 + 1).min(raster.height - 1);
    let (fu, fv) = (u - c0 as f64, v - r0 as f64);

    let samples = raster.band(band);
    let at = |c: usize, r: usize| samples[r * raster.width + c];
    let corners = [at(c0, r0), at(c1, r0), at(c0, r1), at(c1, r1)];

    if corners.iter().any(|&value| raster.is_nodata(value)) {
        let nearest_col = (col.floor() as usize).min(raster.width - 1);
        let nearest_row = (row.floor() as usize).min(raster.height - 1);
        let value = at(nearest_col, nearest_row);
        return if raster.is_nodata(value) { None } else { Some(value) };
    }

    let top = corners[0] * (1.0 - fu) + corners[1] * fu;
    let bottom = corners[2] * (1.0 - fu) + corners[3] * fu;
    Some(top * (1.0 - fv) + bottom * fv)
}
