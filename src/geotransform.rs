use serde::Serialize;

/// Axis-aligned extent in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Grows the bounds so they include the given point.
    pub fn include(&mut self, x: f64, y: f64) {
        self.west = self.west.min(x);
        self.east = self.east.max(x);
        self.south = self.south.min(y);
        self.north = self.north.max(y);
    }

    pub fn empty() -> Self {
        Self {
            west: f64::INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            north: f64::NEG_INFINITY,
        }
    }
}

/// North-up affine transform from pixel (column, row) to map coordinates.
///
/// `x = origin_x + col * pixel_width`, `y = origin_y + row * pixel_height`,
/// where `pixel_height` is negative for rasters stored top row first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl Default for GeoTransform {
    /// The identity grid used for rasters without georeferencing: one map
    /// unit per pixel, origin at the top-left corner.
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 1.0,
            pixel_height: -1.0,
        }
    }
}

impl GeoTransform {
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Builds the transform from the GeoTIFF `ModelTiepoint` and
    /// `ModelPixelScale` tag values.
    pub fn from_tiepoint(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        if tiepoint.len() < 6 || scale.len() < 2 {
            return None;
        }

        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        Some(Self {
            origin_x: x - i * scale[0],
            origin_y: y + j * scale[1],
            pixel_width: scale[0],
            pixel_height: -scale[1],
        })
    }

    /// The `ModelTiepoint` tag values anchoring the top-left pixel corner.
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }

    /// The `ModelPixelScale` tag values.
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width, -self.pixel_height, 0.0]
    }

    /// Map coordinates of a fractional pixel position. Integer positions
    /// address pixel corners, `+ 0.5` addresses centres.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Map coordinates of the centre of pixel `(col, row)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel position of a map coordinate.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    pub fn bounds(&self, width: usize, height: usize) -> Bounds {
        let (x0, y0) = self.pixel_to_geo(0.0, 0.0);
        let (x1, y1) = self.pixel_to_geo(width as f64, height as f64);
        Bounds {
            west: x0.min(x1),
            south: y0.min(y1),
            east: x0.max(x1),
            north: y0.max(y1),
        }
    }

    /// The transform of a grid covering the same extent with pixels
    /// `factor_x` and `factor_y` times larger.
    pub fn scaled(&self, factor_x: f64, factor_y: f64) -> Self {
        Self {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            pixel_width: self.pixel_width * factor_x,
            pixel_height: self.pixel_height * factor_y,
        }
    }

    /// The transform of the window starting at pixel `(col, row)`.
    pub fn window(&self, col: usize, row: usize) -> Self {
        let (origin_x, origin_y) = self.pixel_to_geo(col as f64, row as f64);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn utm_grid() -> GeoTransform {
        GeoTransform::new(500_000.0, 4_400_000.0, 30.0, -30.0)
    }

    /// Pixel centres lie half a pixel inside the corner.
    #[test]
    fn pixel_center() {
        let (x, y) = utm_grid().pixel_center(0, 0);
        assert_relative_eq!(x, 500_015.0);
        assert_relative_eq!(y, 4_399_985.0);
    }

    #[test]
    fn geo_to_pixel_inverts_pixel_to_geo() {
        let transform = utm_grid();
        let (x, y) = transform.pixel_to_geo(12.25, 7.5);
        let (col, row) = transform.geo_to_pixel(x, y);
        assert_relative_eq!(col, 12.25, epsilon = 1e-9);
        assert_relative_eq!(row, 7.5, epsilon = 1e-9);
    }

    #[test]
    fn bounds_of_grid() {
        let bounds = utm_grid().bounds(100, 50);
        assert_relative_eq!(bounds.west, 500_000.0);
        assert_relative_eq!(bounds.east, 503_000.0);
        assert_relative_eq!(bounds.north, 4_400_000.0);
        assert_relative_eq!(bounds.south, 4_398_500.0);
    }

    /// Tag values written for a transform read back to the same transform.
    #[test]
    fn tiepoint_tags() {
        let transform = utm_grid();
        let restored = GeoTransform::from_tiepoint(
            &transform.tiepoint(),
            &transform.pixel_scale(),
        )
        .unwrap();
        assert_eq!(restored, transform);
    }

    /// A tie point anchored at a pixel other than the corner is moved to
    /// the corner.
    #[test]
    fn tiepoint_away_from_corner() {
        let transform = GeoTransform::from_tiepoint(
            &[10.0, 20.0, 0.0, 1000.0, 2000.0, 0.0],
            &[2.0, 3.0, 0.0],
        )
        .unwrap();
        assert_relative_eq!(transform.origin_x, 980.0);
        assert_relative_eq!(transform.origin_y, 2060.0);
    }

    #[test]
    fn window_moves_origin() {
        let window = utm_grid().window(10, 4);
        assert_relative_eq!(window.origin_x, 500_300.0);
        assert_relative_eq!(window.origin_y, 4_399_880.0);
        assert_relative_eq!(window.pixel_width, 30.0);
    }
}
