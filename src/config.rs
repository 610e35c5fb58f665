use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

use crate::fetch::PROVINCE_FEED_URL;
use crate::filter::DEFAULT_DATE_FORMAT;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing config file {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unknown timezone {0:?}")]
    Timezone(String),

    #[error("config value `{0}` must not be empty")]
    Empty(&'static str),
}

/// Everything a run needs, loaded once at startup.
///
/// Layering: built-in defaults, then an optional YAML file, then CLI flags / env vars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON feed of per-province case records.
    pub feed_url: String,
    /// Region name to keep, compared exactly against `denominazione_regione`.
    pub region: String,
    /// `chrono` format of the feed's `data` column.
    pub date_format: String,
    /// Zone the feed's wall-clock dates are read in. The feed carries no offset;
    /// UTC keeps the stored instants equal to the published wall-clock values.
    pub timezone: Tz,
    /// Measurement every point is written under.
    pub measurement: String,
    /// Skip the write instead of sending a zero-point batch when nothing matched.
    pub skip_empty_batch: bool,
    pub influx: InfluxConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: PROVINCE_FEED_URL.to_string(),
            region: "Toscana".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            timezone: Tz::UTC,
            measurement: "all_touscany_case".to_string(),
            skip_empty_batch: false,
            influx: InfluxConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfluxConfig {
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "MyDB".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Command-line / environment overrides, applied on top of the file.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct ConfigOverrides {
    /// Feed URL to fetch case records from
    #[arg(long, env = "CASEFEED_FEED_URL")]
    pub feed_url: Option<String>,

    /// Region to keep (exact match)
    #[arg(long, env = "CASEFEED_REGION")]
    pub region: Option<String>,

    /// Format of the feed's date column
    #[arg(long, env = "CASEFEED_DATE_FORMAT")]
    pub date_format: Option<String>,

    /// IANA timezone the feed's dates are in, e.g. Europe/Rome
    #[arg(long, env = "CASEFEED_TIMEZONE")]
    pub timezone: Option<String>,

    /// Measurement name for written points
    #[arg(long, env = "CASEFEED_MEASUREMENT")]
    pub measurement: Option<String>,

    /// Do not send a write when no record matched
    #[arg(long, env = "CASEFEED_SKIP_EMPTY_BATCH")]
    pub skip_empty_batch: bool,

    /// InfluxDB base URL
    #[arg(long, env = "CASEFEED_INFLUX_URL")]
    pub influx_url: Option<String>,

    /// InfluxDB database name
    #[arg(long, env = "CASEFEED_INFLUX_DATABASE")]
    pub database: Option<String>,

    #[arg(long, env = "CASEFEED_INFLUX_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "CASEFEED_INFLUX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl Config {
    /// Defaults, overlaid with `path` when given. Keys missing from the file keep their default.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        debug!("loading config from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(v) = overrides.feed_url {
            self.feed_url = v;
        }
        if let Some(v) = overrides.region {
            self.region = v;
        }
        if let Some(v) = overrides.date_format {
            self.date_format = v;
        }
        if let Some(name) = overrides.timezone {
            self.timezone = name.parse().map_err(|_| ConfigError::Timezone(name))?;
        }
        if let Some(v) = overrides.measurement {
            self.measurement = v;
        }
        if overrides.skip_empty_batch {
            self.skip_empty_batch = true;
        }
        if let Some(v) = overrides.influx_url {
            self.influx.url = v;
        }
        if let Some(v) = overrides.database {
            self.influx.database = v;
        }
        if overrides.username.is_some() {
            self.influx.username = overrides.username;
        }
        if overrides.password.is_some() {
            self.influx.password = overrides.password;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("feed_url", &self.feed_url),
            ("region", &self.region),
            ("date_format", &self.date_format),
            ("measurement", &self.measurement),
            ("influx.url", &self.influx.url),
            ("influx.database", &self.influx.database),
        ];
        match required.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((key, _)) => Err(ConfigError::Empty(*key)),
            None => Ok(()),
        }
    }
}
