use crate::forecast::TemperatureUnit;
use crate::grapher::ChartStyle;

use serde::Deserialize;
use thiserror::Error;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_KEY_VAR: &str = "API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OUTPUT: &str = "forecast.svg";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is missing, set API_KEY in the environment or a .env file")]
    MissingApiKey,
    #[error("Unable to read config file {path:?}: {err}")]
    Read { path: PathBuf, err: std::io::Error },
    #[error("Unable to parse config file {path:?}: {err}")]
    Parse {
        path: PathBuf,
        err: serde_json::Error,
    },
    #[error("Unknown temperature unit {0:?}, expected celsius or fahrenheit")]
    UnknownUnit(String),
    #[error("Unknown chart style {0:?}, expected line or bar")]
    UnknownChartStyle(String),
}

/// Settings read from the optional JSON config file. Anything left out falls back to a default.
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub unit: Option<TemperatureUnit>,
    pub chart: Option<ChartStyle>,
    pub output: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let conf_str = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            err,
        })?;
        serde_json::from_str(&conf_str).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            err,
        })
    }
}

/// Values given on the command line, which take precedence over the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub unit: Option<TemperatureUnit>,
    pub chart: Option<ChartStyle>,
    pub output: Option<PathBuf>,
}

/// Everything needed to serve queries for the lifetime of the process
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub unit: TemperatureUnit,
    pub chart: ChartStyle,
    pub output: PathBuf,
}

impl Config {
    /// Assemble the config from the environment, an optional config file, and CLI overrides.
    ///
    /// A `.env` file in the working directory is loaded first if present. The API key is only ever
    /// taken from the environment.
    pub fn load(config_file: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {path:?}");
        }
        let file = match config_file {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(env::var(API_KEY_VAR).ok(), file, overrides)
    }

    fn resolve(
        api_key: Option<String>,
        file: FileConfig,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Config {
            api_key,
            base_url: file
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            unit: overrides
                .unit
                .or(file.unit)
                .unwrap_or(TemperatureUnit::Celsius),
            chart: overrides.chart.or(file.chart).unwrap_or(ChartStyle::Line),
            output: overrides
                .output
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        })
    }
}
