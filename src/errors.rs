use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while checking user input, before any side effect.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{param} is not a valid {expected}: '{value}'")]
    TypeMismatch {
        param: String,
        expected: &'static str,
        value: String,
    },

    #[error("{param} contains invalid characters: '{value}'")]
    InvalidCharacter { param: String, value: String },

    #[error("{param} path '{}' does not exist", .path.display())]
    PathNotFound { param: String, path: PathBuf },

    #[error(
        "{param} '{}' must have one of the extensions {}",
        .path.display(),
        .allowed.join(", ")
    )]
    InvalidExtension {
        param: String,
        path: PathBuf,
        allowed: Vec<&'static str>,
    },

    #[error("{param} is out of range: {reason}")]
    OutOfRange { param: String, reason: String },

    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("unknown colormap '{0}'")]
    UnknownColormap(String),

    #[error("{0} must not be empty")]
    MissingValue(String),
}

/// Classified non-success answer of the elevation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    BadRequest,
    InvalidCredential,
    ProviderOutage,
    Other(u16),
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteFailure::BadRequest => write!(
                f,
                "Bad Request: verify boundaries make a valid bbox and don't \
                exceed area limits"
            ),
            RemoteFailure::InvalidCredential => {
                write!(f, "Unauthorized: the API key is invalid")
            }
            RemoteFailure::ProviderOutage => write!(
                f,
                "Internal Server Error: the elevation provider is down"
            ),
            RemoteFailure::Other(status) => {
                write!(f, "request failed with HTTP status {}", status)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum HillmapError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("remote request failed: {0}")]
    RemoteRequestFailed(RemoteFailure),

    #[error("no elevation data is available for the requested extent")]
    NoDataForExtent,

    #[error("invalid spatial reference: {0}")]
    InvalidSpatialReference(String),

    #[error("scene object '{0}' is missing")]
    HostObjectMissing(String),

    #[error("the clipping geometry does not overlap the raster")]
    NoOverlap,

    #[error("no polygon geometry found in '{}'", .0.display())]
    NoGeometry(PathBuf),

    #[error("unsupported raster: {0}")]
    UnsupportedRaster(String),

    #[error("cannot read shapefile: {0}")]
    Shapefile(String),

    #[error("cannot load image '{}': {reason}", .path.display())]
    ImageLoad { path: PathBuf, reason: String },

    #[error("render failed: {0}")]
    RenderFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
