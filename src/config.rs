use std::net::SocketAddr;

use serde::Serialize;

use crate::pipeline_config::PipelineConfig;

/// Application-level constants
pub const APP_NAME: &str = "RedactLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sanitization backend on the developer machine.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Where the dashboard API listens unless told otherwise.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Environment variable overriding the backend base URL.
pub const BACKEND_URL_ENV: &str = "REDACTLENS_BACKEND_URL";

/// Environment variable overriding the dashboard bind address.
pub const BIND_ADDR_ENV: &str = "REDACTLENS_BIND";

/// Tracing filter used when `RUST_LOG` is not set.
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "redactlens=debug,redactlens_lib=debug,tower_http=debug"
    } else {
        "redactlens=info,redactlens_lib=info"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid bind address '{value}': {reason}")]
    InvalidBindAddr { value: String, reason: String },

    #[error("Invalid backend URL '{0}': must start with http:// or https://")]
    InvalidBackendUrl(String),
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardConfig {
    /// Base URL of the sanitization backend, without trailing slash.
    pub backend_url: String,
    /// Address the dashboard API binds to.
    pub bind_addr: SocketAddr,
    pub pipeline: PipelineConfig,
}

impl DashboardConfig {
    /// Resolve from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup(BACKEND_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let bind = lookup(BIND_ADDR_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            backend_url: normalize_backend_url(&backend_url)?,
            bind_addr: parse_bind_addr(&bind)?,
            pipeline: PipelineConfig::default(),
        })
    }

    /// Replace the backend URL (CLI flag takes precedence over env).
    pub fn with_backend_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.backend_url = normalize_backend_url(url)?;
        Ok(self)
    }

    /// Replace the bind address (CLI flag takes precedence over env).
    pub fn with_bind_addr(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_addr = parse_bind_addr(addr)?;
        Ok(self)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            pipeline: PipelineConfig::default(),
        }
    }
}

fn normalize_backend_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBackendUrl(trimmed.to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn parse_bind_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBindAddr {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = DashboardConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn env_overrides_backend_and_bind() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            (BACKEND_URL_ENV, "http://10.0.0.5:9000/"),
            (BIND_ADDR_ENV, "0.0.0.0:9999"),
        ]))
        .unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.5:9000");
        assert_eq!(config.bind_addr.port(), 9999);
    }

    #[test]
    fn blank_env_value_falls_back_to_default() {
        let config =
            DashboardConfig::from_lookup(lookup_from(&[(BACKEND_URL_ENV, "   ")])).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn rejects_non_http_backend() {
        let err = DashboardConfig::from_lookup(lookup_from(&[(BACKEND_URL_ENV, "ftp://x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBackendUrl(_)));
    }

    #[test]
    fn rejects_bad_bind_addr() {
        let err = DashboardConfig::default()
            .with_bind_addr("localhost")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }

    #[test]
    fn cli_flag_replaces_backend_url() {
        let config = DashboardConfig::default()
            .with_backend_url("https://sanitizer.internal/")
            .unwrap();
        assert_eq!(config.backend_url, "https://sanitizer.internal");
    }

    #[test]
    fn verbose_filter_enables_debug() {
        assert!(default_log_filter(true).contains("debug"));
        assert!(!default_log_filter(false).contains("debug"));
    }

    #[test]
    fn app_name_is_redactlens() {
        assert_eq!(APP_NAME, "RedactLens");
    }
}
