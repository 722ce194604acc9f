use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::http_cache::{DiskCache, MemoryCache, NoCache, ResponseCache};

pub const DEFAULT_BASE_URL: &str = "https://api.football-data.org/v4";
pub const TOKEN_ENV: &str = "FOOTBALL_DATA_API_KEY";

const DEFAULT_MAX_RETRIES: u32 = 4;
const DEFAULT_BACKOFF: f64 = 1.7;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FOOTBALL_DATA_API_KEY not set; pass --token or add it to .env")]
    MissingToken,
    #[error("unsupported CACHE_MODE={0}, expected memory, disk or off")]
    CacheMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Memory,
    Disk,
    Off,
}

impl CacheMode {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            "off" | "none" => Ok(Self::Off),
            other => Err(ConfigError::CacheMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub cache_mode: CacheMode,
    pub cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var(TOKEN_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let base_url = env::var("FOOTBALL_DATA_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let max_retries = env::var("HTTP_MAX_RETRIES")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES)
            .clamp(1, 10);
        let backoff = env::var("HTTP_BACKOFF")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_BACKOFF)
            .clamp(1.0, 5.0);
        let timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(1);
        let cache_mode = CacheMode::parse(&env::var("CACHE_MODE").unwrap_or_default())?;
        let cache_ttl_secs = env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Ok(Self {
            client: ClientConfig {
                token,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
                max_retries,
                backoff,
            },
            cache_mode,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }

    /// Replaces the env token with an explicit one when it is non-empty.
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        if let Some(t) = token.map(str::trim).filter(|t| !t.is_empty()) {
            self.client.token = Some(t.to_string());
        }
        self
    }

    pub fn build_cache(&self) -> Box<dyn ResponseCache> {
        match self.cache_mode {
            CacheMode::Memory => Box::new(MemoryCache::new(self.cache_ttl)),
            CacheMode::Disk => Box::new(DiskCache::new(self.cache_ttl)),
            CacheMode::Off => Box::new(NoCache),
        }
    }
}
