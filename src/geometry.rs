use crate::errors::HillmapError;
use crate::validate::has_extension;
use crate::Result;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use geo::{
    Geometry, Intersects, LineString, MultiPolygon, Point, Polygon, Winding,
};
use geojson::GeoJson;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

const SHP_FILE_CODE: i32 = 9994;
const SHP_HEADER_LEN: usize = 100;
const SHP_NULL: i32 = 0;
const SHP_POLYGON: i32 = 5;
const SHP_POLYGON_Z: i32 = 15;
const SHP_POLYGON_M: i32 = 25;

/// Reads the polygons of a GeoJSON (`.json`, `.geojson`) or ESRI shapefile
/// (`.shp`) file. Other geometry kinds are skipped.
///
/// # Arguments
///
/// * `path` - Path to the geometry file. Coordinates are taken as they are,
///   in the spatial reference of the raster they are applied to.
pub fn read_polygons(path: &Path) -> Result<MultiPolygon<f64>> {
    let polygons = if has_extension(path, &["shp"]) {
        read_shapefile(path)?
    } else {
        read_geojson(path)?
    };

    if polygons.0.is_empty() {
        return Err(HillmapError::NoGeometry(path.to_path_buf()));
    }

    log::debug!(
        "Read {} polygon(s) from {}",
        polygons.0.len(),
        path.display()
    );
    Ok(polygons)
}

fn read_geojson(path: &Path) -> Result<MultiPolygon<f64>> {
    let text = fs::read_to_string(path)?;
    let geojson = text.parse::<GeoJson>()?;
    let collection = geo::GeometryCollection::<f64>::try_from(&geojson)?;

    let mut polygons = Vec::new();
    for geometry in collection {
        collect_polygons(geometry, &mut polygons);
    }
    Ok(MultiPolygon::new(polygons))
}

fn collect_polygons(geometry: Geometry<f64>, polygons: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(polygon) => polygons.push(polygon),
        Geometry::MultiPolygon(multi) => polygons.extend(multi),
        Geometry::Rect(rect) => polygons.push(rect.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for inner in collection {
                collect_polygons(inner, polygons);
            }
        }
        other => log::debug!("Skipping non-polygon geometry {:?}", other),
    }
}

fn shapefile_error(reason: impl Into<String>) -> HillmapError {
    HillmapError::Shapefile(reason.into())
}

/// Reads the polygon records of a `.shp` file. Only the geometry file is
/// needed; attributes in the `.dbf` are not used.
fn read_shapefile(path: &Path) -> Result<MultiPolygon<f64>> {
    let data = fs::read(path)?;
    if data.len() < SHP_HEADER_LEN {
        return Err(shapefile_error("file is shorter than its header"));
    }

    let mut header = Cursor::new(&data[..SHP_HEADER_LEN]);
    let file_code = header.read_i32::<BigEndian>()?;
    if file_code != SHP_FILE_CODE {
        return Err(shapefile_error(format!(
            "unexpected file code {}",
            file_code
        )));
    }

    let mut polygons = Vec::new();
    let mut cursor = Cursor::new(&data[SHP_HEADER_LEN..]);
    while (cursor.position() as usize) < data.len() - SHP_HEADER_LEN {
        let record_number = cursor.read_i32::<BigEndian>()?;
        // lengths are counted in 16-bit words
        let content_len = cursor.read_i32::<BigEndian>()?;
        if content_len < 2 {
            return Err(shapefile_error(format!(
                "record {} has length {}",
                record_number, content_len
            )));
        }

        let mut content = vec![0u8; content_len as usize * 2];
        cursor.read_exact(&mut content).map_err(|_| {
            shapefile_error(format!("record {} is truncated", record_number))
        })?;

        let mut record = Cursor::new(content.as_slice());
        match record.read_i32::<LittleEndian>()? {
            SHP_POLYGON | SHP_POLYGON_Z | SHP_POLYGON_M => {
                polygons.extend(read_polygon_record(&mut record)?);
            }
            SHP_NULL => {}
            shape_type => log::debug!(
                "Skipping record {} of shape type {}",
                record_number,
                shape_type
            ),
        }
    }

    Ok(MultiPolygon::new(polygons))
}

/// Decodes a polygon record's rings. Clockwise rings are exteriors, the
/// others are holes of the exterior that contains them.
fn read_polygon_record(
    record: &mut Cursor<&[u8]>,
) -> Result<Vec<Polygon<f64>>> {
    // bounding box
    for _ in 0..4 {
        record.read_f64::<LittleEndian>()?;
    }
    let part_count = record.read_i32::<LittleEndian>()?;
    let point_count = record.read_i32::<LittleEndian>()?;
    if part_count < 0 || point_count < 0 {
        return Err(shapefile_error("negative part or point count"));
    }

    let mut starts = Vec::with_capacity(part_count as usize);
    for _ in 0..part_count {
        starts.push(record.read_i32::<LittleEndian>()? as usize);
    }

    let mut points = Vec::with_capacity(point_count as usize);
    for _ in 0..point_count {
        let x = record.read_f64::<LittleEndian>()?;
        let y = record.read_f64::<LittleEndian>()?;
        points.push((x, y));
    }

    let mut exteriors: Vec<Polygon<f64>> = Vec::new();
    let mut holes: Vec<LineString<f64>> = Vec::new();
    for (index, &start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(points.len());
        if start > end || end > points.len() {
            return Err(shapefile_error("part index out of range"));
        }

        let ring = LineString::from(points[start..end].to_vec());
        if ring.0.len() < 4 {
            continue;
        }
        if ring.is_cw() {
            exteriors.push(Polygon::new(ring, vec![]));
        } else {
            holes.push(ring);
        }
    }

    for hole in holes {
        let first = Point::from(hole.0[0]);
        match exteriors
            .iter_mut()
            .find(|polygon| polygon.intersects(&first))
        {
            Some(polygon) => polygon.interiors_push(hole),
            None => {
                // writers that ignore the winding rule produce these
                log::warn!("Treating an unenclosed hole as an outer ring");
                exteriors.push(Polygon::new(hole, vec![]));
            }
        }
    }

    Ok(exteriors)
}
