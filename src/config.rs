use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub parks: Vec<ParkConfig>,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Status sync configuration
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Parks eligible for polling and display.
    pub fn visible_parks(&self) -> impl Iterator<Item = &ParkConfig> {
        self.parks.iter().filter(|p| p.visible)
    }
}

/// A tracked theme park. Identity and visibility are configuration;
/// favorite/selected state lives in the favorites store.
#[derive(Debug, Clone, Deserialize)]
pub struct ParkConfig {
    /// themeparks.wiki entity id
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Whether the park shows up in the park picker (default: true)
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Configuration for the status poll loop
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Interval in seconds between foreground poll cycles (default: 60)
    #[serde(default = "SyncConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// Per-request timeout in seconds for a single park fetch (default: 20)
    #[serde(default = "SyncConfig::default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Overall budget in seconds for one background refresh (default: 25)
    #[serde(default = "SyncConfig::default_background_budget_secs")]
    pub background_budget_secs: u64,
    /// Maximum concurrent requests to the status API (default: 10)
    #[serde(default = "SyncConfig::default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// How many recent status transitions to retain for debugging (default: 200)
    #[serde(default = "SyncConfig::default_transition_log_size")]
    pub transition_log_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            fetch_timeout_secs: Self::default_fetch_timeout_secs(),
            background_budget_secs: Self::default_background_budget_secs(),
            max_concurrent_requests: Self::default_max_concurrent_requests(),
            transition_log_size: Self::default_transition_log_size(),
        }
    }
}

impl SyncConfig {
    fn default_interval_secs() -> u64 {
        60
    }
    fn default_fetch_timeout_secs() -> u64 {
        20
    }
    fn default_background_budget_secs() -> u64 {
        25
    }
    fn default_max_concurrent_requests() -> usize {
        10
    }
    fn default_transition_log_size() -> usize {
        200
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn background_budget(&self) -> Duration {
        Duration::from_secs(self.background_budget_secs)
    }
}
