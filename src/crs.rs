use crate::errors::HillmapError;
use crate::Result;
use proj4rs::transform::transform;
use proj4rs::Proj;
use std::fmt;

const WGS84_UTM_NORTH: std::ops::RangeInclusive<u16> = 32601..=32660;
const WGS84_UTM_SOUTH: std::ops::RangeInclusive<u16> = 32701..=32760;

/// Definitions used instead of the EPSG registry: the systems DEMs are most
/// often delivered in, written the way proj4rs parses them fastest.
fn builtin_definition(epsg: u16) -> Option<String> {
    match epsg {
        4326 => Some("+proj=longlat +datum=WGS84 +no_defs".to_string()),
        3857 => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 \
            +y_0=0 +k=1 +units=m +no_defs"
                .to_string(),
        ),
        code if WGS84_UTM_NORTH.contains(&code) => Some(format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            code - 32600
        )),
        code if WGS84_UTM_SOUTH.contains(&code) => Some(format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            code - 32700
        )),
        _ => None,
    }
}

/// The proj definition of an EPSG code, looked up in the EPSG registry
/// shipped with `crs-definitions`.
pub fn proj_string(epsg: u16) -> Option<String> {
    builtin_definition(epsg).or_else(|| {
        crs_definitions::from_code(epsg).map(|def| {
            // `+type=crs` is not a projection parameter
            def.proj4.replace(" +type=crs", "")
        })
    })
}

/// A coordinate reference system identified by its EPSG code.
#[derive(Clone)]
pub struct SpatialReference {
    pub epsg: u16,
    proj: Proj,
}

impl fmt::Debug for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialReference")
            .field("epsg", &self.epsg)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl SpatialReference {
    pub fn from_epsg(epsg: u16) -> Result<SpatialReference> {
        let definition = proj_string(epsg).ok_or_else(|| {
            HillmapError::InvalidSpatialReference(format!(
                "EPSG:{} is not supported",
                epsg
            ))
        })?;
        let proj = Proj::from_proj_string(&definition).map_err(|e| {
            HillmapError::InvalidSpatialReference(format!(
                "EPSG:{}: {}",
                epsg, e
            ))
        })?;
        Ok(SpatialReference { epsg, proj })
    }

    /// Resolves `"EPSG:32613"`, `"epsg:32613"` or a bare `"32613"`.
    pub fn parse(text: &str) -> Result<SpatialReference> {
        let trimmed = text.trim();
        let code = match trimmed.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => {
                &trimmed[5..]
            }
            _ => trimmed,
        };
        let epsg = code.parse::<u16>().map_err(|_| {
            HillmapError::InvalidSpatialReference(format!(
                "'{}' is not an EPSG code",
                text
            ))
        })?;
        SpatialReference::from_epsg(epsg)
    }

    /// Whether coordinates are longitude and latitude in degrees.
    pub fn is_geographic(&self) -> bool {
        self.proj.is_latlong()
    }
}

/// Whether an EPSG code names a geographic system. Unknown codes are
/// treated as projected.
pub fn is_geographic(epsg: u16) -> bool {
    SpatialReference::from_epsg(epsg)
        .map(|srs| srs.is_geographic())
        .unwrap_or(false)
}

/// Converts coordinates from one spatial reference to another.
#[derive(Debug, Clone)]
pub struct Transformer {
    source: SpatialReference,
    target: SpatialReference,
}

impl Transformer {
    pub fn new(
        source: &SpatialReference,
        target: &SpatialReference,
    ) -> Transformer {
        Transformer {
            source: source.clone(),
            target: target.clone(),
        }
    }

    /// Transforms one point, returning `None` when it has no image in the
    /// target system.
    pub fn transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.source.epsg == self.target.epsg {
            return Some((x, y));
        }

        let mut point = if self.source.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&self.source.proj, &self.target.proj, &mut point).ok()?;

        let (out_x, out_y) = if self.target.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if out_x.is_finite() && out_y.is_finite() {
            Some((out_x, out_y))
        } else {
            None
        }
    }

    pub fn inverse(&self) -> Transformer {
        Transformer {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}
