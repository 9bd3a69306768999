//! Cache and API configuration.
//!
//! [`CacheConfig`] and [`ApiConfig`] are plain builders with sensible
//! defaults. [`Config`] loads both from a TOML file:
//!
//! ```toml
//! [cache]
//! ttl_secs = 300
//! request_window_ms = 1000
//! response_window_ms = 100
//! batch_size = 100
//!
//! [api]
//! base_url = "https://api.glitch.com"
//! timeout_secs = 30
//! page_size = 100
//! token = "..."        # optional, falls back to RESCACHE_API_TOKEN
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{CacheError, Result};

/// Default freshness of written data.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default window for accumulating fetch requests before dispatch.
pub const DEFAULT_REQUEST_WINDOW: Duration = Duration::from_millis(1000);

/// Default window for batching responses into one store mutation.
pub const DEFAULT_RESPONSE_WINDOW: Duration = Duration::from_millis(100);

/// Maximum ids per entity fetch (practical ceiling for an id-list query).
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Items requested per relation page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub const DEFAULT_BASE_URL: &str = "https://api.glitch.com";

/// Environment variable consulted when no API token is configured.
pub const TOKEN_ENV_VAR: &str = "RESCACHE_API_TOKEN";

/// Cache behaviour settings.
///
/// ```rust
/// # use rescache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(60))
///     .request_window(Duration::from_millis(250));
/// assert_eq!(config.batch_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long written data stays fresh. Default: 5 minutes.
    pub ttl: Duration,
    /// Request accumulation window. Default: 1s.
    pub request_window: Duration,
    /// Response apply window. Default: 100ms.
    pub response_window: Duration,
    /// Maximum ids per entity fetch. Default: 100.
    pub batch_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            request_window: DEFAULT_REQUEST_WINDOW,
            response_window: DEFAULT_RESPONSE_WINDOW,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn request_window(mut self, window: Duration) -> Self {
        self.request_window = window;
        self
    }

    pub fn response_window(mut self, window: Duration) -> Self {
        self.response_window = window;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CacheError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// REST API connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout. Default: 30s.
    pub timeout: Duration,
    /// Sent verbatim as the `Authorization` header.
    pub token: Option<String>,
    /// Items per relation page. Default: 100.
    pub page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn page_size(mut self, n: usize) -> Self {
        self.page_size = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CacheError::Configuration(
                "page_size must be at least 1".to_string(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CacheError::Configuration(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        Ok(())
    }
}

/// Combined settings loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub cache: CacheConfig,
    pub api: ApiConfig,
}

impl Config {
    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content)
            .map_err(|e| CacheError::Configuration(format!("Failed to parse config: {e}")))?;
        let config = file.into_config();
        config.cache.validate()?;
        config.api.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CacheError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content)
    }
}

// ============================================================================
// On-disk format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    cache: CacheSection,
    #[serde(default)]
    api: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    ttl_secs: Option<u64>,
    request_window_ms: Option<u64>,
    response_window_ms: Option<u64>,
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    token: Option<String>,
    page_size: Option<usize>,
}

impl FileConfig {
    fn into_config(self) -> Config {
        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            ttl: self
                .cache
                .ttl_secs
                .map_or(cache_defaults.ttl, Duration::from_secs),
            request_window: self
                .cache
                .request_window_ms
                .map_or(cache_defaults.request_window, Duration::from_millis),
            response_window: self
                .cache
                .response_window_ms
                .map_or(cache_defaults.response_window, Duration::from_millis),
            batch_size: self.cache.batch_size.unwrap_or(cache_defaults.batch_size),
        };

        let api_defaults = ApiConfig::default();
        let api = ApiConfig {
            base_url: self.api.base_url.unwrap_or(api_defaults.base_url),
            timeout: self
                .api
                .timeout_secs
                .map_or(api_defaults.timeout, Duration::from_secs),
            token: self
                .api
                .token
                .or_else(|| std::env::var(TOKEN_ENV_VAR).ok()),
            page_size: self.api.page_size.unwrap_or(api_defaults.page_size),
        };

        Config { cache, api }
    }
}
