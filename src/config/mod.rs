use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod loader;
pub mod validator;

pub use loader::DEFAULT_CONFIG_FILE;
pub use validator::validate;

pub const NSE_BASE_URL: &str = "https://www.nseindia.com";
pub const NSE_API_BASE: &str = "https://www.nseindia.com/api";

/// Upstream host settings and the body markers that distinguish the two soft 403s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Landing page hit during the cookie handshake.
    pub base_url: String,
    pub api_base: String,
    pub session_expired_marker: String,
    pub access_restricted_marker: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: NSE_BASE_URL.to_string(),
            api_base: NSE_API_BASE.to_string(),
            session_expired_marker: "Cookie expired".to_string(),
            access_restricted_marker: "Access Restricted".to_string(),
            timeout_secs: 30,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub rate_limit_cooldown_secs: u64,
    pub transport_retry_delay_secs: u64,
    /// Length of one backoff unit in `2^attempt + uniform(0, 1)`.
    pub backoff_unit_millis: u64,
    pub max_renewals: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_cooldown_secs: 60,
            transport_retry_delay_secs: 1,
            backoff_unit_millis: 1_000,
            max_renewals: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub concurrency_limit: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            concurrency_limit: crate::fetch::FETCH_CONCURRENCY_LIMIT,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub cookie_file: PathBuf,
    pub snapshot_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cookie_file: PathBuf::from("cookie.json"),
            snapshot_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub retry: RetryConfig,
    pub poll: PollConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn builtin() -> Self {
        Self::default()
    }
}
