//! Configuration Module
//!
//! Deployment settings read from the environment with local defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

pub const BASE_URL_VAR: &str = "CRM_API_BASE_URL";
pub const DATA_DIR_VAR: &str = "CRM_DATA_DIR";
pub const TIMEOUT_VAR: &str = "CRM_TIMEOUT_MS";

const APP_DIR_NAME: &str = "CrmDesktop";

#[derive(Debug, Clone)]
pub struct Config {
    /// API root every resource path is appended to
    pub api_base_url: String,
    pub timeout: Duration,
    /// Holds local storage and logs
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(BASE_URL_VAR) {
            let url = url.trim().trim_end_matches('/').to_string();
            reqwest::Url::parse(&url).map_err(|e| ConfigError::Invalid {
                name: BASE_URL_VAR,
                reason: e.to_string(),
            })?;
            config.api_base_url = url;
        }

        if let Some(ms) = get(TIMEOUT_VAR) {
            let ms: u64 = ms.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: TIMEOUT_VAR,
                    reason: e.to_string(),
                }
            })?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    name: TIMEOUT_VAR,
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.timeout = Duration::from_millis(ms);
        }

        if let Some(dir) = get(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
