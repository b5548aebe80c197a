use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DB_PATH: &str = "seikyu.sqlite";
const DEFAULT_CURRENCY: &str = "JPY";
const DEFAULT_BATCH_SIZE: usize = 3;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub drive_access_token: Option<String>,
    pub default_currency: String,
    pub batch_size: usize,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let batch_size = parse_var("SEIKYU_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let timeout_secs = parse_var("SEIKYU_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Config {
            db_path: env::var("SEIKYU_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH)),
            gemini_api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .ok()
                .filter(|key| !key.trim().is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .ok()
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            drive_access_token: env::var("DRIVE_ACCESS_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            default_currency: env::var("SEIKYU_CURRENCY")
                .ok()
                .filter(|currency| !currency.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            batch_size: batch_size.max(1),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn require_gemini_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))
    }

    pub fn require_drive_token(&self) -> Result<&str, ConfigError> {
        self.drive_access_token
            .as_deref()
            .ok_or(ConfigError::Missing("DRIVE_ACCESS_TOKEN"))
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}
