use crate::config::Config;
use crate::errors::{HillmapError, RemoteFailure, ValidationError};
use crate::staging::StagedOutput;
use crate::validate::{Checks, PathRole};
use crate::Result;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const GLOBAL_DEM_ENDPOINT: &str = "API/globaldem";
const NO_DATA_MARKER: &[u8] = b"No Data";

/// Global elevation datasets offered by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dataset {
    Srtmgl3,
    #[default]
    Srtmgl1,
    Srtmgl1E,
    Aw3d30,
    Aw3d30E,
    Srtm15Plus,
    Nasadem,
    Cop30,
    Cop90,
    EuDtm,
    GediL3,
}

impl Dataset {
    pub const ALL: [Dataset; 11] = [
        Dataset::Srtmgl3,
        Dataset::Srtmgl1,
        Dataset::Srtmgl1E,
        Dataset::Aw3d30,
        Dataset::Aw3d30E,
        Dataset::Srtm15Plus,
        Dataset::Nasadem,
        Dataset::Cop30,
        Dataset::Cop90,
        Dataset::EuDtm,
        Dataset::GediL3,
    ];

    /// The identifier the provider expects in the `demtype` parameter.
    pub fn id(&self) -> &'static str {
        match self {
            Dataset::Srtmgl3 => "SRTMGL3",
            Dataset::Srtmgl1 => "SRTMGL1",
            Dataset::Srtmgl1E => "SRTMGL1_E",
            Dataset::Aw3d30 => "AW3D30",
            Dataset::Aw3d30E => "AW3D30_E",
            Dataset::Srtm15Plus => "SRTM15Plus",
            Dataset::Nasadem => "NASADEM",
            Dataset::Cop30 => "COP30",
            Dataset::Cop90 => "COP90",
            Dataset::EuDtm => "EU_DTM",
            Dataset::GediL3 => "GEDI_L3",
        }
    }
}

impl FromStr for Dataset {
    type Err = ValidationError;

    fn from_str(id: &str) -> std::result::Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|dataset| dataset.id() == id)
            .ok_or_else(|| ValidationError::UnknownDataset(id.to_string()))
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Geographic extent of a request, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Checks the latitudes, then the longitudes.
    pub fn new(
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    ) -> std::result::Result<BoundingBox, ValidationError> {
        Checks::new()
            .within("north", north, -90.0, 90.0)
            .within("south", south, -90.0, 90.0)
            .rule(
                "north",
                north >= south,
                format!("north ({}) is below south ({})", north, south),
            )
            .within("east", east, -180.0, 180.0)
            .within("west", west, -180.0, 180.0)
            .rule(
                "east",
                east >= west,
                format!("east ({}) is west of west ({})", east, west),
            )
            .run()?;

        Ok(BoundingBox {
            north,
            south,
            east,
            west,
        })
    }
}

/// A validated elevation download.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub bbox: BoundingBox,
    pub dataset: Dataset,
    pub api_key: String,
    pub output: PathBuf,
}

impl FetchRequest {
    /// Validates the request: output path first, then the dataset and key,
    /// then the bounding box.
    pub fn new(
        north: f64,
        south: f64,
        east: f64,
        west: f64,
        api_key: &str,
        dataset: &str,
        output: &Path,
    ) -> std::result::Result<FetchRequest, ValidationError> {
        Checks::new()
            .output("output", output, PathRole::GeoTiff)
            .run()?;
        let dataset = dataset.parse::<Dataset>()?;
        if api_key.trim().is_empty() {
            return Err(ValidationError::MissingValue("API key".to_string()));
        }
        let bbox = BoundingBox::new(north, south, east, west)?;

        Ok(FetchRequest {
            bbox,
            dataset,
            api_key: api_key.to_string(),
            output: output.to_path_buf(),
        })
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("demtype", self.dataset.id().to_string()),
            ("south", self.bbox.south.to_string()),
            ("north", self.bbox.north.to_string()),
            ("west", self.bbox.west.to_string()),
            ("east", self.bbox.east.to_string()),
            ("outputFormat", "GTiff".to_string()),
            ("API_Key", self.api_key.clone()),
            ("nullFill", "true".to_string()),
        ]
    }
}

/// Maps the provider's answer to a failure, or `Ok` when the body holds a
/// raster.
pub fn classify_response(status: u16, body: &[u8]) -> Result<()> {
    let failure = match status {
        200..=299 => {
            if body
                .windows(NO_DATA_MARKER.len())
                .any(|window| window == NO_DATA_MARKER)
            {
                return Err(HillmapError::NoDataForExtent);
            }
            return Ok(());
        }
        400 => RemoteFailure::BadRequest,
        401 => RemoteFailure::InvalidCredential,
        500 => RemoteFailure::ProviderOutage,
        other => RemoteFailure::Other(other),
    };
    Err(HillmapError::RemoteRequestFailed(failure))
}

/// Downloads elevation rasters from the provider's global DEM API.
#[derive(Debug, Clone)]
pub struct ElevationFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ElevationFetcher {
    pub fn new(config: &Config) -> Result<ElevationFetcher> {
        // None lifts the blocking client's 30 s default
        let client = reqwest::blocking::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(ElevationFetcher {
            client,
            base_url: config.provider_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issues the request and writes the raster to the request's output
    /// path. Nothing is written when the provider reports a failure.
    pub fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
        let url = format!("{}/{}", self.base_url, GLOBAL_DEM_ENDPOINT);
        log::info!(
            "Fetching {} for N{} S{} E{} W{}",
            request.dataset,
            request.bbox.north,
            request.bbox.south,
            request.bbox.east,
            request.bbox.west
        );

        // the request URL carries the API key, keep it out of errors
        let response = self
            .client
            .get(&url)
            .query(&request.query())
            .send()
            .map_err(reqwest::Error::without_url)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(reqwest::Error::without_url)?;
        classify_response(status, &body)?;

        let staged = StagedOutput::new(&request.output);
        fs::write(staged.path(), &body)?;
        let path = staged.commit()?;

        log::info!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(path)
    }
}

/// Validates the arguments and downloads the elevation raster for the
/// bounding box to `output`, using the provider configured in the
/// environment.
pub fn fetch_elevation(
    north: f64,
    south: f64,
    east: f64,
    west: f64,
    api_key: &str,
    dataset: &str,
    output: &Path,
) -> Result<PathBuf> {
    let request =
        FetchRequest::new(north, south, east, west, api_key, dataset, output)?;
    let config = Config::load()?;
    ElevationFetcher::new(&config)?.fetch(&request)
}
