//! Runtime configuration from environment variables (and `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::export::DEFAULT_EXPORT_ROW_LIMIT;
use crate::ingest::SourceDescriptor;

pub const ENV_DATA_DIR: &str = "PATRIMONIO_DATA_DIR";
pub const ENV_DATA_URLS: &str = "PATRIMONIO_DATA_URLS";
pub const ENV_AUTO_LOAD: &str = "PATRIMONIO_AUTO_LOAD";
pub const ENV_CACHE_TTL: &str = "PATRIMONIO_CACHE_TTL_SECS";
pub const ENV_EXPORT_ROW_LIMIT: &str = "PATRIMONIO_EXPORT_ROW_LIMIT";
pub const ENV_PORT: &str = "PATRIMONIO_PORT";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Folder scanned for `*.csv` on auto-load
    pub data_dir: PathBuf,
    /// Remote CSVs loaded after the folder
    pub data_urls: Vec<String>,
    /// Load `data_dir` and `data_urls` when the server starts
    pub auto_load: bool,
    /// Query cache time-to-live; zero disables the cache
    pub cache_ttl: Duration,
    pub export_row_limit: usize,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            data_urls: Vec::new(),
            auto_load: true,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            export_row_limit: DEFAULT_EXPORT_ROW_LIMIT,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Read the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or blank variables keep
    /// their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            data_dir: get(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(defaults.data_dir),
            data_urls: get(ENV_DATA_URLS)
                .map(|v| split_urls(&v))
                .unwrap_or_default(),
            auto_load: match get(ENV_AUTO_LOAD) {
                Some(v) => parse_bool(ENV_AUTO_LOAD, &v)?,
                None => defaults.auto_load,
            },
            cache_ttl: match get(ENV_CACHE_TTL) {
                Some(v) => Duration::from_secs(parse_number(ENV_CACHE_TTL, &v)?),
                None => defaults.cache_ttl,
            },
            export_row_limit: match get(ENV_EXPORT_ROW_LIMIT) {
                Some(v) => parse_number(ENV_EXPORT_ROW_LIMIT, &v)?,
                None => defaults.export_row_limit,
            },
            port: match get(ENV_PORT) {
                Some(v) => parse_number(ENV_PORT, &v)?,
                None => defaults.port,
            },
        })
    }

    /// Sources loaded at startup: the data folder, then each URL.
    pub fn auto_load_sources(&self) -> Vec<SourceDescriptor> {
        let mut sources = Vec::with_capacity(1 + self.data_urls.len());
        if self.data_dir.is_dir() {
            sources.push(SourceDescriptor::Folder(self.data_dir.clone()));
        }
        sources.extend(self.data_urls.iter().cloned().map(SourceDescriptor::Url));
        sources
    }
}

fn split_urls(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
