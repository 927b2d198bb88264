//! Search engine connection configuration.
//!
//! Configuration is environment-style: defaults, optionally a TOML file, then
//! environment variable overrides.
//!
//! | Field | Env var | Default |
//! |-------|---------|---------|
//! | `host` | `ELASTICSEARCH_HOST` | `localhost` |
//! | `port` | `ELASTICSEARCH_PORT` | `9200` |
//! | `scheme` | `ELASTICSEARCH_SCHEME` | `http` |
//! | `username` | `ELASTICSEARCH_USERNAME` | none |
//! | `password` | `ELASTICSEARCH_PASSWORD` | none |
//! | `index` | `ELASTICSEARCH_INDEX` | `clips` |
//! | `environment` | `CLIPDEX_ENV` | `development` |
//! | `request_timeout_secs` | `ELASTICSEARCH_TIMEOUT_SECS` | `30` |

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment name in which certificate validation stays strict.
pub const PRODUCTION: &str = "production";

/// Connection and paging settings for the external search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine host name.
    pub host: String,
    /// Engine port.
    pub port: u16,
    /// `http` or `https`.
    pub scheme: String,
    /// Basic-auth user name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic-auth password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Name of the clip index.
    pub index: String,
    /// Deployment environment (`production` enforces certificate validation).
    pub environment: String,
    /// Per-request deadline in seconds.
    pub request_timeout_secs: u64,
    /// Lifetime of a scroll cursor between page requests.
    pub scroll_keep_alive_secs: u64,
    /// Page size for scroll listing (the engine's single-query cap).
    pub page_size: usize,
    /// Maximum number of distinct facet values returned.
    pub facet_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            scheme: "http".to_string(),
            username: None,
            password: None,
            index: "clips".to_string(),
            environment: "development".to_string(),
            request_timeout_secs: 30,
            scroll_keep_alive_secs: 300,
            page_size: 1000,
            facet_size: 1000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment-style lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ELASTICSEARCH_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("ELASTICSEARCH_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("ELASTICSEARCH_PORT '{port}': {e}")))?;
        }
        if let Some(scheme) = lookup("ELASTICSEARCH_SCHEME") {
            self.scheme = scheme.to_lowercase();
        }
        if let Some(username) = lookup("ELASTICSEARCH_USERNAME") {
            self.username = Some(username).filter(|u| !u.is_empty());
        }
        if let Some(password) = lookup("ELASTICSEARCH_PASSWORD") {
            self.password = Some(password).filter(|p| !p.is_empty());
        }
        if let Some(index) = lookup("ELASTICSEARCH_INDEX") {
            self.index = index;
        }
        if let Some(environment) = lookup("CLIPDEX_ENV") {
            self.environment = environment;
        }
        if let Some(timeout) = lookup("ELASTICSEARCH_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout.trim().parse().map_err(|e| {
                Error::config(format!("ELASTICSEARCH_TIMEOUT_SECS '{timeout}': {e}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(Error::config(format!(
                "scheme must be http or https, got '{}'",
                self.scheme
            )));
        }
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.index.trim().is_empty() {
            return Err(Error::config("index must not be empty"));
        }
        if self.page_size == 0 || self.facet_size == 0 {
            return Err(Error::config("page_size and facet_size must be positive"));
        }
        Ok(())
    }

    /// Base URL of the engine, e.g. `http://localhost:9200`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Basic-auth credentials, only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    /// Relax certificate validation outside production.
    pub fn accept_invalid_certs(&self) -> bool {
        !self.environment.eq_ignore_ascii_case(PRODUCTION)
    }

    /// Per-request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Scroll cursor lifetime.
    pub fn scroll_keep_alive(&self) -> Duration {
        Duration::from_secs(self.scroll_keep_alive_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
