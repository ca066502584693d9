use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use audit_core::{CoreOptions, MAX_POLL_ATTEMPTS, POLL_INTERVAL, SUCCESS_NOTICE_DURATION};
use audit_engine::{ClientSettings, EngineConfig, PollSettings, DEFAULT_BASE_URL};
use audit_logging::audit_debug;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use thiserror::Error;
use url::Url;

pub const CONFIG_FILENAME: &str = "audit_client.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid base url {0:?}: {1}")]
    BaseUrl(String, url::ParseError),
}

/// Settings read from `audit_client.ron`; every field may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub auto_download: bool,
    pub notice_secs: u64,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_mib: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("downloads"),
            auto_download: true,
            notice_secs: SUCCESS_NOTICE_DURATION.as_secs(),
            poll_interval_secs: POLL_INTERVAL.as_secs(),
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            max_download_mib: client.max_download_bytes / (1024 * 1024),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn core_options(&self) -> CoreOptions {
        CoreOptions {
            notice_duration: Duration::from_secs(self.notice_secs),
            auto_download: self.auto_download,
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|err| ConfigError::BaseUrl(self.base_url.clone(), err))?;
        Ok(EngineConfig {
            client: ClientSettings {
                base_url,
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                max_download_bytes: self.max_download_mib.saturating_mul(1024 * 1024),
            },
            poll: PollSettings {
                interval: Duration::from_secs(self.poll_interval_secs),
                max_attempts: self.max_poll_attempts,
            },
            output_dir: self.output_dir.clone(),
            clock: Arc::new(Utc::now),
        })
    }

    /// Unrecognized levels fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

/// `Ok(None)` when the file does not exist.
pub fn read_config(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    ron::from_str(&content)
        .map(Some)
        .map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

/// Config from `path`; defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = read_config(path)?;
    if config.is_some() {
        audit_debug!("Loaded config from {:?}", path);
    }
    Ok(config.unwrap_or_default())
}
