use crate::crs;
use crate::errors::HillmapError;
use crate::geotransform::GeoTransform;
use crate::raster::{ModelType, Raster, SampleType};
use crate::staging::StagedOutput;
use crate::Result;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{
    ColorType as EncoderColorType, Gray16, Gray32, Gray32Float, Gray64,
    Gray64Float, Gray8, GrayI16, GrayI32, GrayI64, GrayI8, RGB16, RGB32,
    RGB32Float, RGB64, RGB64Float, RGB8, RGBA16, RGBA32, RGBA32Float, RGBA64,
    RGBA64Float, RGBA8,
};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tiff::ColorType;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Options for writing GeoTIFF files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Also write a `.aux.xml` file with band statistics next to the
    /// output.
    pub sidecar: bool,
}

fn decoding_limits() -> Limits {
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    limits
}

/// Reads a GeoTIFF file with its transform, EPSG code and nodata value.
/// Files without georeferencing tags get the identity grid.
pub fn read(path: &Path) -> Result<Raster> {
    let file = File::open(path)?;
    let mut decoder =
        Decoder::new(BufReader::new(file))?.with_limits(decoding_limits());

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let samples_per_pixel = match decoder.colortype()? {
        ColorType::Gray(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) => 4,
        other => {
            return Err(HillmapError::UnsupportedRaster(format!(
                "color type {:?} in {}",
                other,
                path.display()
            )))
        }
    };

    let mut raster = match decoder.read_image()? {
        DecodingResult::U8(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::U8,
        ),
        DecodingResult::U16(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::U16,
        ),
        DecodingResult::U32(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::U32,
        ),
        DecodingResult::U64(data) => {
            let data: Vec<f64> = data.into_iter().map(|v| v as f64).collect();
            Raster::from_interleaved(
                width,
                height,
                samples_per_pixel,
                &data,
                SampleType::U64,
            )
        }
        DecodingResult::I8(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::I8,
        ),
        DecodingResult::I16(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::I16,
        ),
        DecodingResult::I32(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::I32,
        ),
        DecodingResult::I64(data) => {
            let data: Vec<f64> = data.into_iter().map(|v| v as f64).collect();
            Raster::from_interleaved(
                width,
                height,
                samples_per_pixel,
                &data,
                SampleType::I64,
            )
        }
        DecodingResult::F32(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::F32,
        ),
        DecodingResult::F64(data) => Raster::from_interleaved(
            width,
            height,
            samples_per_pixel,
            &data,
            SampleType::F64,
        ),
    }?;

    if let Some(transform) = read_transform(&mut decoder) {
        raster.transform = transform;
    }
    (raster.epsg, raster.model_type) = read_crs(&mut decoder);
    raster.nodata = read_nodata(&mut decoder);

    log::debug!(
        "Read {}: {}x{} with {} band(s), {:?}, EPSG {:?} ({:?})",
        path.display(),
        raster.width,
        raster.height,
        raster.band_count(),
        raster.sample_type,
        raster.epsg,
        raster.model_type
    );

    Ok(raster)
}

fn read_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
) -> Option<GeoTransform> {
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    GeoTransform::from_tiepoint(&tiepoint, &scale)
}

fn read_crs<R: Read + Seek>(
    decoder: &mut Decoder<R>,
) -> (Option<u16>, Option<ModelType>) {
    match decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) {
        Ok(directory) => crs_from_geokeys(&directory),
        Err(_) => (None, None),
    }
}

/// Finds the EPSG code and model type in a GeoKey directory. The projected
/// system wins over the geographic one it is based on, and a missing
/// `GTModelType` key is inferred from which of the two is present.
fn crs_from_geokeys(directory: &[u16]) -> (Option<u16>, Option<ModelType>) {
    let Some(header) = directory.get(..4) else {
        return (None, None);
    };
    let key_count = header[3] as usize;

    let mut model_type = None;
    let mut geographic = None;
    let mut projected = None;
    for entry in directory[4..].chunks_exact(4).take(key_count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // location 0 means the value is stored in the entry itself
        if location != 0 {
            continue;
        }
        match key {
            GT_MODEL_TYPE => {
                model_type = match value {
                    MODEL_TYPE_PROJECTED => Some(ModelType::Projected),
                    MODEL_TYPE_GEOGRAPHIC => Some(ModelType::Geographic),
                    _ => None,
                }
            }
            _ if value == USER_DEFINED || value == 0 => {}
            PROJECTED_CS_TYPE => projected = Some(value),
            GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }

    let model_type = model_type.or(match (projected, geographic) {
        (Some(_), _) => Some(ModelType::Projected),
        (None, Some(_)) => Some(ModelType::Geographic),
        (None, None) => None,
    });
    (projected.or(geographic), model_type)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    text.trim_matches(char::from(0)).trim().parse().ok()
}

/// Builds the GeoKey directory for a raster. Without a recorded model type
/// the EPSG code is looked up to tell geographic and projected apart.
fn geokey_directory(
    epsg: Option<u16>,
    model_type: Option<ModelType>,
) -> Vec<u16> {
    let mut keys = vec![[GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]];
    if let Some(epsg) = epsg {
        let model_type = model_type.unwrap_or_else(|| {
            if crs::is_geographic(epsg) {
                ModelType::Geographic
            } else {
                ModelType::Projected
            }
        });
        match model_type {
            ModelType::Geographic => {
                keys.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
                keys.push([GEOGRAPHIC_TYPE, 0, 1, epsg]);
            }
            ModelType::Projected => {
                keys.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
                keys.push([PROJECTED_CS_TYPE, 0, 1, epsg]);
            }
        }
    }
    keys.sort_by_key(|key| key[0]);

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    directory: &mut DirectoryEncoder<'_, W, K>,
    raster: &Raster,
) -> Result<()> {
    directory.write_tag(
        Tag::ModelPixelScaleTag,
        &raster.transform.pixel_scale()[..],
    )?;
    directory
        .write_tag(Tag::ModelTiepointTag, &raster.transform.tiepoint()[..])?;
    let geokeys = geokey_directory(raster.epsg, raster.model_type);
    directory.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
    if let Some(nodata) = raster.nodata {
        directory.write_tag(Tag::GdalNodata, nodata.to_string().as_str())?;
    }
    Ok(())
}

fn encode<C, W>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster,
    convert: impl Fn(f64) -> C::Inner,
) -> Result<()>
where
    C: EncoderColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let samples = raster.interleaved(convert);
    let mut image =
        encoder.new_image::<C>(raster.width as u32, raster.height as u32)?;
    write_geo_tags(image.encoder(), raster)?;
    image.write_data(&samples)?;
    Ok(())
}

fn encode_raster<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster,
) -> Result<()> {
    use SampleType::*;

    match (raster.band_count(), raster.sample_type) {
        (1, U8) => encode::<Gray8, _>(encoder, raster, |v| v as u8),
        (1, U16) => encode::<Gray16, _>(encoder, raster, |v| v as u16),
        (1, U32) => encode::<Gray32, _>(encoder, raster, |v| v as u32),
        (1, U64) => encode::<Gray64, _>(encoder, raster, |v| v as u64),
        (1, I8) => encode::<GrayI8, _>(encoder, raster, |v| v as i8),
        (1, I16) => encode::<GrayI16, _>(encoder, raster, |v| v as i16),
        (1, I32) => encode::<GrayI32, _>(encoder, raster, |v| v as i32),
        (1, I64) => encode::<GrayI64, _>(encoder, raster, |v| v as i64),
        (1, F32) => encode::<Gray32Float, _>(encoder, raster, |v| v as f32),
        (1, F64) => encode::<Gray64Float, _>(encoder, raster, |v| v),
        (3, U8) => encode::<RGB8, _>(encoder, raster, |v| v as u8),
        (3, U16) => encode::<RGB16, _>(encoder, raster, |v| v as u16),
        (3, U32) => encode::<RGB32, _>(encoder, raster, |v| v as u32),
        (3, U64) => encode::<RGB64, _>(encoder, raster, |v| v as u64),
        (3, F32) => encode::<RGB32Float, _>(encoder, raster, |v| v as f32),
        (3, F64) => encode::<RGB64Float, _>(encoder, raster, |v| v),
        (4, U8) => encode::<RGBA8, _>(encoder, raster, |v| v as u8),
        (4, U16) => encode::<RGBA16, _>(encoder, raster, |v| v as u16),
        (4, U32) => encode::<RGBA32, _>(encoder, raster, |v| v as u32),
        (4, U64) => encode::<RGBA64, _>(encoder, raster, |v| v as u64),
        (4, F32) => encode::<RGBA32Float, _>(encoder, raster, |v| v as f32),
        (4, F64) => encode::<RGBA64Float, _>(encoder, raster, |v| v),
        (bands, sample_type) => Err(HillmapError::UnsupportedRaster(format!(
            "cannot write {} band(s) of {:?} samples to GeoTIFF",
            bands, sample_type
        ))),
    }
}

/// Writes a raster as an uncompressed GeoTIFF. The file only appears at
/// `path` once it has been written completely.
pub fn write(
    raster: &Raster,
    path: &Path,
    options: WriteOptions,
) -> Result<()> {
    let staged = StagedOutput::new(path);
    {
        let file = File::create(staged.path())?;
        let mut writer = BufWriter::new(file);
        let mut encoder = TiffEncoder::new(&mut writer)?;
        encode_raster(&mut encoder, raster)?;
        writer.flush()?;
    }
    staged.commit()?;

    if options.sidecar {
        write_sidecar(raster, path)?;
    }

    log::debug!(
        "Wrote {}: {}x{} with {} band(s), {:?}",
        path.display(),
        raster.width,
        raster.height,
        raster.band_count(),
        raster.sample_type
    );
    Ok(())
}

/// Writes `<path>.aux.xml` with the minimum, maximum and mean of every band.
fn write_sidecar(raster: &Raster, path: &Path) -> Result<()> {
    let mut xml = String::from("<PAMDataset>\n");
    for (index, band) in raster.bands().iter().enumerate() {
        let valid: Vec<f64> = band
            .iter()
            .copied()
            .filter(|&v| !raster.is_nodata(v))
            .collect();
        if valid.is_empty() {
            continue;
        }
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;

        xml.push_str(&format!(
            "  <PAMRasterBand band=\"{}\">\n    <Metadata>\n",
            index + 1
        ));
        for (key, value) in
            [("MAXIMUM", max), ("MEAN", mean), ("MINIMUM", min)]
        {
            xml.push_str(&format!(
                "      <MDI key=\"STATISTICS_{}\">{}</MDI>\n",
                key, value
            ));
        }
        xml.push_str("    </Metadata>\n  </PAMRasterBand>\n");
    }
    xml.push_str("</PAMDataset>\n");

    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".aux.xml");
    fs::write(sidecar, xml)?;
    Ok(())
}
