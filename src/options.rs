use clap::{Parser, Subcommand};
use hillmap::colormap::Colormap;
use hillmap::fetch::Dataset;
use std::path::PathBuf;

/// Turns elevation rasters into shaded relief maps.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Also write a .aux.xml sidecar next to every GeoTIFF written.
    #[arg(long, global = true)]
    pub sidecar: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download an elevation raster for a bounding box.
    Fetch {
        #[arg(long, allow_hyphen_values = true)]
        north: f64,
        #[arg(long, allow_hyphen_values = true)]
        south: f64,
        #[arg(long, allow_hyphen_values = true)]
        east: f64,
        #[arg(long, allow_hyphen_values = true)]
        west: f64,

        /// Dataset to download, e.g. SRTMGL1 or COP30.
        #[arg(long, default_value_t = Dataset::default())]
        dataset: Dataset,

        /// Provider API key; defaults to OPENTOPOGRAPHY_API_KEY.
        #[arg(long)]
        api_key: Option<String>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the statistics and georeferencing of a GeoTIFF as JSON.
    Describe { input: PathBuf },

    /// Draw a GeoTIFF with a colour map, and a histogram of its values.
    Plot {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = Colormap::default())]
        colormap: Colormap,

        #[arg(long, default_value = hillmap::inspect::DEFAULT_TITLE)]
        title: String,

        /// Skip the histogram.
        #[arg(long)]
        no_histogram: bool,
    },

    /// Reproject a GeoTIFF to another coordinate system.
    Reproject {
        input: PathBuf,

        /// Target EPSG code, e.g. 32613 or EPSG:4326.
        #[arg(long)]
        target: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Mask a GeoTIFF with the polygons of a GeoJSON file or shapefile.
    Clip {
        input: PathBuf,

        #[arg(long)]
        geometry: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Keep the input's extent instead of cropping to the polygons.
        #[arg(long)]
        no_crop: bool,
    },

    /// Stretch a GeoTIFF to an 8-bit image.
    ToImage {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Shrink a raster or image by an integer factor.
    Downsample {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 2)]
        factor: u32,
    },

    /// Render an elevation image as a shaded relief with Blender.
    Render {
        dem_image: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 0.5)]
        exaggeration: f64,

        /// Sun size in degrees, 0 to 180.
        #[arg(long, default_value_t = 90, allow_hyphen_values = true)]
        shadow_softness: i32,

        /// Sun elevation in degrees.
        #[arg(long, default_value_t = 45, allow_hyphen_values = true)]
        sun_angle: i32,

        /// Render size in percent of the image size.
        #[arg(long, default_value_t = 50)]
        resolution_scale: u32,

        #[arg(long, default_value_t = 5)]
        samples: u32,

        /// Blender executable; defaults to BLENDER_PATH or `blender`.
        #[arg(long)]
        blender: Option<PathBuf>,
    },

    /// Give a rendered image the georeferencing of a GeoTIFF.
    Georeference {
        rendered: PathBuf,

        #[arg(long)]
        reference: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}
