use std::time::Duration;

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
/// Padding applied around fitted viewports, in pixels.
pub const DEFAULT_FIT_PADDING_PX: u32 = 50;

pub const API_URL_ENV: &str = "MAP_QUERY_API_URL";
pub const TIMEOUT_ENV: &str = "MAP_QUERY_TIMEOUT_MS";

/// Connection settings for the spatial-index service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service base path without a trailing slash, e.g. `http://localhost:3000/api`.
    pub base_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read overrides from `MAP_QUERY_API_URL` and `MAP_QUERY_TIMEOUT_MS`.
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let request_timeout = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis);

        Self::new(base_url).with_timeout(request_timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Presentation settings for query results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub fit_padding_px: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fit_padding_px: DEFAULT_FIT_PADDING_PX,
        }
    }
}
