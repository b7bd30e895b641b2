use crate::errors::ValidationError;
use crate::validate::parse_param;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROVIDER_URL: &str = "https://portal.opentopography.org";
pub const DEFAULT_BLENDER: &str = "blender";

pub const API_KEY_VAR: &str = "OPENTOPOGRAPHY_API_KEY";
pub const PROVIDER_URL_VAR: &str = "HILLMAP_PROVIDER_URL";
pub const HTTP_TIMEOUT_VAR: &str = "HILLMAP_HTTP_TIMEOUT_SECS";
pub const BLENDER_VAR: &str = "BLENDER_PATH";
pub const SIDECAR_VAR: &str = "HILLMAP_WRITE_SIDECAR";

/// Settings taken from the environment (and a `.env` file, if present).
/// Command line flags take precedence over these values.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub provider_url: String,
    /// No timeout by default: requests block until the provider answers.
    pub http_timeout: Option<Duration>,
    pub blender: PathBuf,
    pub write_sidecar: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            http_timeout: None,
            blender: PathBuf::from(DEFAULT_BLENDER),
            write_sidecar: false,
        }
    }
}

impl Config {
    /// Loads `.env` into the process environment, then reads the
    /// configuration from it.
    pub fn load() -> Result<Config, ValidationError> {
        if let Ok(path) = dotenv::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ValidationError> {
        let defaults = Config::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_timeout = match value(HTTP_TIMEOUT_VAR) {
            Some(text) => Some(Duration::from_secs(parse_param::<u64>(
                HTTP_TIMEOUT_VAR,
                "integer",
                &text,
            )?)),
            None => None,
        };

        let write_sidecar = match value(SIDECAR_VAR) {
            Some(text) => parse_flag(SIDECAR_VAR, &text)?,
            None => defaults.write_sidecar,
        };

        Ok(Config {
            api_key: value(API_KEY_VAR),
            provider_url: value(PROVIDER_URL_VAR)
                .unwrap_or(defaults.provider_url),
            http_timeout,
            blender: value(BLENDER_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.blender),
            write_sidecar,
        })
    }
}

fn parse_flag(param: &str, text: &str) -> Result<bool, ValidationError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::TypeMismatch {
            param: param.to_string(),
            expected: "boolean",
            value: text.to_string(),
        }),
    }
}
