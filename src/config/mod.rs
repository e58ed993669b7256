//! Client configuration (layered: defaults < config file < environment).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::store::default_clinic_dir;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5025/api";
pub const DEFAULT_REFRESH_ENDPOINT: &str = "/auth/refresh-token";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_REFRESH_LOOKAHEAD_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for [`ApiClient`](crate::client::ApiClient).
///
/// # Example
/// ```
/// use clinic_client::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://api.example/api")
///     .refresh_lookahead_secs(120)
///     .build();
/// assert_eq!(config.url_for("/patients/7"), "https://api.example/api/patients/7");
/// assert_eq!(config.login_route, "/login");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix joined with every endpoint, e.g. `https://host/api`.
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    #[builder(into, default = DEFAULT_REFRESH_ENDPOINT.to_string())]
    pub refresh_endpoint: String,
    /// Where the navigator is sent once the session is lost.
    #[builder(into, default = DEFAULT_LOGIN_ROUTE.to_string())]
    pub login_route: String,
    /// Refresh access tokens expiring within this many seconds.
    #[builder(default = DEFAULT_REFRESH_LOOKAHEAD_SECS)]
    pub refresh_lookahead_secs: u64,
    /// Client-side request timeout; unset means the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Full URL for an endpoint path (which may carry a query string).
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url.trim_end_matches('/'))
    }

    pub fn refresh_lookahead(&self) -> chrono::Duration {
        i64::try_from(self.refresh_lookahead_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Defaults overridden by environment variables (and `.env`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults < `~/.clinic/config.toml` (if present) < environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let path = Self::default_path();
        let base = if path.exists() {
            Self::load_file(&path)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn default_path() -> PathBuf {
        default_clinic_dir().join("config.toml")
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("CLINIC_BACKEND_URL").or_else(|| lookup("BACKEND_URL")) {
            self.base_url = url;
        }
        if let Some(route) = lookup("CLINIC_LOGIN_ROUTE") {
            self.login_route = route;
        }
        if let Some(secs) = parse_secs(&lookup, "CLINIC_REFRESH_LOOKAHEAD_SECS") {
            self.refresh_lookahead_secs = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "CLINIC_TIMEOUT_SECS") {
            self.timeout_secs = Some(secs);
        }
        self
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring non-numeric setting");
            None
        }
    }
}
