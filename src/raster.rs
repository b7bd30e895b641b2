use crate::errors::HillmapError;
use crate::geotransform::{Bounds, GeoTransform};
use crate::Result;
use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};

/// Storage type of the samples of a raster file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl SampleType {
    /// The smallest and largest representable values.
    pub fn range(&self) -> (f64, f64) {
        match self {
            SampleType::U8 => (0.0, u8::MAX as f64),
            SampleType::U16 => (0.0, u16::MAX as f64),
            SampleType::U32 => (0.0, u32::MAX as f64),
            SampleType::U64 => (0.0, u64::MAX as f64),
            SampleType::I8 => (i8::MIN as f64, i8::MAX as f64),
            SampleType::I16 => (i16::MIN as f64, i16::MAX as f64),
            SampleType::I32 => (i32::MIN as f64, i32::MAX as f64),
            SampleType::I64 => (i64::MIN as f64, i64::MAX as f64),
            SampleType::F32 => (f32::MIN as f64, f32::MAX as f64),
            SampleType::F64 => (f64::MIN, f64::MAX),
        }
    }

    /// Rounds and saturates a value to what this type can store.
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            SampleType::F64 => value,
            SampleType::F32 => value as f32 as f64,
            _ => {
                if value.is_nan() {
                    return 0.0;
                }
                let (min, max) = self.range();
                value.round().clamp(min, max)
            }
        }
    }
}

/// Kind of coordinate system a raster is referenced in, as recorded in the
/// GeoTIFF `GTModelType` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Projected,
    Geographic,
}

/// A multi-band raster held in memory, together with its georeferencing.
///
/// Samples are kept as `f64` in row-major order, one vector per band;
/// `sample_type` records the type to use when writing the raster back.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub sample_type: SampleType,
    pub transform: GeoTransform,
    pub epsg: Option<u16>,
    /// Set when known from the source file or the operation that produced
    /// the raster; otherwise derived from `epsg` on writing.
    pub model_type: Option<ModelType>,
    pub nodata: Option<f64>,
    bands: Vec<Vec<f64>>,
}

impl Raster {
    /// Creates a raster filled with zeros.
    pub fn new(
        width: usize,
        height: usize,
        band_count: usize,
        sample_type: SampleType,
    ) -> Raster {
        Raster {
            width,
            height,
            sample_type,
            transform: GeoTransform::default(),
            epsg: None,
            model_type: None,
            nodata: None,
            bands: vec![vec![0.0; width * height]; band_count],
        }
    }

    /// Creates a raster from existing band data.
    pub fn from_bands(
        width: usize,
        height: usize,
        bands: Vec<Vec<f64>>,
        sample_type: SampleType,
    ) -> Result<Raster> {
        if bands.is_empty() {
            return Err(HillmapError::UnsupportedRaster(
                "a raster needs at least one band".to_string(),
            ));
        }
        if let Some(band) = bands.iter().find(|b| b.len() != width * height) {
            return Err(HillmapError::UnsupportedRaster(format!(
                "band holds {} samples, expected {}x{}",
                band.len(),
                width,
                height
            )));
        }

        Ok(Raster {
            width,
            height,
            sample_type,
            transform: GeoTransform::default(),
            epsg: None,
            model_type: None,
            nodata: None,
            bands,
        })
    }

    /// Splits interleaved pixel samples into bands.
    pub fn from_interleaved<T: Copy + Into<f64>>(
        width: usize,
        height: usize,
        samples_per_pixel: usize,
        samples: &[T],
        sample_type: SampleType,
    ) -> Result<Raster> {
        if samples_per_pixel == 0
            || samples.len() != width * height * samples_per_pixel
        {
            return Err(HillmapError::UnsupportedRaster(format!(
                "{} samples do not fill a {}x{} raster with {} bands",
                samples.len(),
                width,
                height,
                samples_per_pixel
            )));
        }

        let mut bands =
            vec![Vec::with_capacity(width * height); samples_per_pixel];
        for pixel in samples.chunks_exact(samples_per_pixel) {
            for (band, &value) in bands.iter_mut().zip(pixel) {
                band.push(value.into());
            }
        }
        Raster::from_bands(width, height, bands, sample_type)
    }

    /// Interleaves the bands into one sample vector, each sample converted
    /// with `convert` after saturating it to the raster's sample type.
    pub fn interleaved<T>(&self, convert: impl Fn(f64) -> T) -> Vec<T> {
        let mut samples =
            Vec::with_capacity(self.width * self.height * self.bands.len());
        for index in 0..self.width * self.height {
            for band in &self.bands {
                samples.push(convert(self.sample_type.cast(band[index])));
            }
        }
        samples
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, band: usize) -> &[f64] {
        &self.bands[band]
    }

    pub fn band_mut(&mut self, band: usize) -> &mut [f64] {
        &mut self.bands[band]
    }

    pub fn bands(&self) -> &[Vec<f64>] {
        &self.bands
    }

    pub fn bands_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.bands
    }

    /// Gets the value of the sample at the given coordinates.
    pub fn get(&self, band: usize, col: usize, row: usize) -> f64 {
        if col >= self.width || row >= self.height {
            panic!("Pixel coordinates out of bounds");
        }

        self.bands[band][row * self.width + col]
    }

    /// Sets the sample at the given coordinates to the given value.
    pub fn set(&mut self, band: usize, col: usize, row: usize, value: f64) {
        if col >= self.width || row >= self.height {
            panic!("Pixel coordinates out of bounds");
        }

        self.bands[band][row * self.width + col] = value;
    }

    pub fn bounds(&self) -> Bounds {
        self.transform.bounds(self.width, self.height)
    }

    /// Whether a sample is missing: NaN or equal to the nodata value.
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.map_or(false, |nodata| value == nodata)
    }

    /// The smallest and largest valid sample over all bands, or `None` when
    /// every sample is nodata.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.bands
            .iter()
            .flat_map(|band| band.iter().copied())
            .filter(|&value| !self.is_nodata(value))
            .fold(None, |acc, value| match acc {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
    }

    /// Copies the georeferencing of another raster.
    pub fn georeference_like(&mut self, other: &Raster) {
        self.transform = other.transform;
        self.epsg = other.epsg;
        self.model_type = other.model_type;
    }

    /// Converts a decoded image into a raster with one band per channel.
    pub fn from_image(image: DynamicImage) -> Result<Raster> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        match image {
            DynamicImage::ImageLuma8(buf) => Raster::from_interleaved(
                width,
                height,
                1,
                buf.as_raw(),
                SampleType::U8,
            ),
            DynamicImage::ImageLumaA8(buf) => Raster::from_interleaved(
                width,
                height,
                2,
                buf.as_raw(),
                SampleType::U8,
            ),
            DynamicImage::ImageRgb8(buf) => Raster::from_interleaved(
                width,
                height,
                3,
                buf.as_raw(),
                SampleType::U8,
            ),
            DynamicImage::ImageRgba8(buf) => Raster::from_interleaved(
                width,
                height,
                4,
                buf.as_raw(),
                SampleType::U8,
            ),
            DynamicImage::ImageLuma16(buf) => Raster::from_interleaved(
                width,
                height,
                1,
                buf.as_raw(),
                SampleType::U16,
            ),
            DynamicImage::ImageLumaA16(buf) => Raster::from_interleaved(
                width,
                height,
                2,
                buf.as_raw(),
                SampleType::U16,
            ),
            DynamicImage::ImageRgb16(buf) => Raster::from_interleaved(
                width,
                height,
                3,
                buf.as_raw(),
                SampleType::U16,
            ),
            DynamicImage::ImageRgba16(buf) => Raster::from_interleaved(
                width,
                height,
                4,
                buf.as_raw(),
                SampleType::U16,
            ),
            DynamicImage::ImageRgb32F(buf) => Raster::from_interleaved(
                width,
                height,
                3,
                buf.as_raw(),
                SampleType::F32,
            ),
            other => Raster::from_interleaved(
                width,
                height,
                4,
                other.to_rgba32f().as_raw(),
                SampleType::F32,
            ),
        }
    }

    /// Converts the raster to an 8 or 16 bit image with one channel per
    /// band. Rasters of other sample types or band counts cannot be shown as
    /// viewable images.
    pub fn to_image(&self) -> Result<DynamicImage> {
        let (width, height) = (self.width as u32, self.height as u32);
        let unsupported = || {
            HillmapError::UnsupportedRaster(format!(
                "{} band {:?} raster cannot be written as an image; \
                convert it to 8 bits first",
                self.band_count(),
                self.sample_type
            ))
        };

        let image = match self.sample_type {
            SampleType::U8 => {
                let samples = self.interleaved(|v| SampleType::U8.cast(v) as u8);
                match self.band_count() {
                    1 => ImageBuffer::<Luma<u8>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageLuma8),
                    2 => ImageBuffer::<LumaA<u8>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageLumaA8),
                    3 => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageRgb8),
                    4 => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageRgba8),
                    _ => None,
                }
            }
            SampleType::U16 => {
                let samples = self.interleaved(|v| SampleType::U16.cast(v) as u16);
                match self.band_count() {
                    1 => ImageBuffer::<Luma<u16>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageLuma16),
                    2 => ImageBuffer::<LumaA<u16>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageLumaA16),
                    3 => ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageRgb16),
                    4 => ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, samples)
                        .map(DynamicImage::ImageRgba16),
                    _ => None,
                }
            }
            _ => None,
        };

        image.ok_or_else(unsupported)
    }
}
