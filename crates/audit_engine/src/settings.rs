use std::time::Duration;

use audit_core::{MAX_POLL_ATTEMPTS, POLL_INTERVAL};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://brand-camp-api.vercel.app/api/";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Root of the audit API; endpoint paths are appended to it.
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound for a downloaded result file.
    pub max_download_bytes: u64,
}

impl ClientSettings {
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_download_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}
