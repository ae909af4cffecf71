//! Backend base-URL resolution.
//!
//! The URL is resolved once at startup and injected into the HTTP client.
//! Sources are consulted in [`BASE_URL_PRECEDENCE`] order; the first one
//! that yields a value wins.

use std::fmt;

pub const ENV_API_URL: &str = "AHF_API_URL";
pub const ENV_DEV: &str = "AHF_DEV";

pub const DEV_DEFAULT_URL: &str = "http://localhost:8000";
pub const FALLBACK_URL: &str = "https://api.hedge-fund.louisleng.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseUrlSource {
    /// Dev mode is on: always talk to the local backend.
    DevDefault,
    /// `AHF_API_URL` is set.
    EnvOverride,
    /// Hardcoded production endpoint.
    Fallback,
    /// Supplied directly by the caller (e.g. `--api-url`); bypasses the list.
    Explicit,
}

impl BaseUrlSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseUrlSource::DevDefault => "dev_default",
            BaseUrlSource::EnvOverride => "env_override",
            BaseUrlSource::Fallback => "fallback",
            BaseUrlSource::Explicit => "explicit",
        }
    }
}

impl fmt::Display for BaseUrlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const BASE_URL_PRECEDENCE: [BaseUrlSource; 3] = [
    BaseUrlSource::DevDefault,
    BaseUrlSource::EnvOverride,
    BaseUrlSource::Fallback,
];

/// Raw inputs to resolution, captured from the environment (or built by tests).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseUrlInputs {
    pub dev_mode: bool,
    pub env_override: Option<String>,
}

impl BaseUrlInputs {
    pub fn from_env() -> Self {
        let dev_mode = std::env::var(ENV_DEV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            dev_mode,
            env_override: std::env::var(ENV_API_URL).ok(),
        }
    }

    fn value_for(&self, source: BaseUrlSource) -> Option<String> {
        match source {
            BaseUrlSource::DevDefault => self.dev_mode.then(|| DEV_DEFAULT_URL.to_string()),
            BaseUrlSource::EnvOverride => self
                .env_override
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            BaseUrlSource::Fallback => Some(FALLBACK_URL.to_string()),
            BaseUrlSource::Explicit => None,
        }
    }
}

/// Resolved backend location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub source: BaseUrlSource,
}

impl ApiConfig {
    pub fn resolve(inputs: &BaseUrlInputs) -> Self {
        for source in BASE_URL_PRECEDENCE {
            if let Some(url) = inputs.value_for(source) {
                return Self {
                    base_url: trim_url(&url),
                    source,
                };
            }
        }
        // Fallback always yields a value; kept for totality.
        Self {
            base_url: FALLBACK_URL.to_string(),
            source: BaseUrlSource::Fallback,
        }
    }

    pub fn from_env() -> Self {
        Self::resolve(&BaseUrlInputs::from_env())
    }

    pub fn explicit(url: &str) -> Self {
        Self {
            base_url: trim_url(url),
            source: BaseUrlSource::Explicit,
        }
    }

    /// Join a route path (`/portfolio/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
