//! Dashboard configuration.
//!
//! Configuration is loaded from environment variables. Every variable has a
//! default, so an empty environment yields a working configuration. Empty
//! values are treated as unset.

use crate::poller::{PollerSettings, DEFAULT_EVENT_CAPACITY, DEFAULT_LATENCY_CAPACITY};
use crate::probe::{ProbeTarget, DEFAULT_TIMEOUT_MS};
use crate::render::DashboardView;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default monitored host.
pub const DEFAULT_SERVER_HOST: &str = "localhost";

/// Default monitored port.
pub const DEFAULT_SERVER_PORT: u16 = 25565;

/// Default poll interval in milliseconds.
pub const DEFAULT_REFRESH_MS: u64 = 60_000;

/// Default display time zone.
pub const DEFAULT_SERVER_TZ: &str = "America/Los_Angeles";

/// Default web port.
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// Largest accepted history capacity.
pub const MAX_HISTORY_SIZE: usize = 10_000;

/// Default page title.
pub const DEFAULT_DASHBOARD_TITLE: &str = "Minecraft Server Dashboard";

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Monitored server host (default: "localhost").
    pub server_host: String,

    /// Monitored server port (default: 25565).
    pub server_port: u16,

    /// Time between poll cycles (default: 60 s).
    pub refresh_interval: Duration,

    /// Upper bound for one probe (default: 3 s).
    pub query_timeout: Duration,

    /// Zone used to display timestamps.
    pub display_tz: Tz,

    /// Web server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Latency samples kept (default: 15).
    pub latency_history_size: usize,

    /// Presence events kept (default: 20).
    pub event_history_size: usize,

    /// Base URL of the fallback status API, if any.
    pub fallback_status_url: Option<String>,

    /// Title shown on the dashboard page.
    pub dashboard_title: String,

    /// Seconds to wait after a shutdown signal before stopping the server.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid interval configuration: {0}")]
    InvalidInterval(String),

    #[error("Invalid time zone configuration: {0}")]
    InvalidTimezone(String),

    #[error("Invalid history size configuration: {0}")]
    InvalidHistorySize(String),

    #[error("Invalid fallback URL configuration: {0}")]
    InvalidFallbackUrl(String),

    #[error("Invalid drain configuration: {0}")]
    InvalidDrain(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let server_host = get("SERVER_HOST")
            .unwrap_or(DEFAULT_SERVER_HOST)
            .to_string();

        let server_port = match get("SERVER_PORT") {
            Some(value) => parse_port("SERVER_PORT", value)?,
            None => DEFAULT_SERVER_PORT,
        };

        let refresh_ms = match get("REFRESH_MS") {
            Some(value) => parse_positive("REFRESH_MS", value, ConfigError::InvalidInterval)?,
            None => DEFAULT_REFRESH_MS,
        };

        let query_timeout_ms = match get("QUERY_TIMEOUT_MS") {
            Some(value) => {
                parse_positive("QUERY_TIMEOUT_MS", value, ConfigError::InvalidInterval)?
            }
            None => DEFAULT_TIMEOUT_MS,
        };

        let tz_name = get("SERVER_TZ").unwrap_or(DEFAULT_SERVER_TZ);
        let display_tz: Tz = tz_name.parse().map_err(|_| {
            ConfigError::InvalidTimezone(format!(
                "SERVER_TZ must be an IANA time zone name, got '{}'",
                tz_name
            ))
        })?;

        // BIND_ADDRESS wins over PORT
        let bind_address = match get("BIND_ADDRESS") {
            Some(address) => address.to_string(),
            None => {
                let port = match get("PORT") {
                    Some(value) => parse_port("PORT", value)?,
                    None => DEFAULT_WEB_PORT,
                };
                format!("0.0.0.0:{}", port)
            }
        };

        let latency_history_size = match get("LATENCY_HISTORY_SIZE") {
            Some(value) => parse_history_size("LATENCY_HISTORY_SIZE", value)?,
            None => DEFAULT_LATENCY_CAPACITY,
        };

        let event_history_size = match get("EVENT_HISTORY_SIZE") {
            Some(value) => parse_history_size("EVENT_HISTORY_SIZE", value)?,
            None => DEFAULT_EVENT_CAPACITY,
        };

        let fallback_status_url = match get("FALLBACK_STATUS_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(url.trim_end_matches('/').to_string())
            }
            Some(url) => {
                return Err(ConfigError::InvalidFallbackUrl(format!(
                    "FALLBACK_STATUS_URL must start with http:// or https://, got '{}'",
                    url
                )));
            }
            None => None,
        };

        let dashboard_title = get("DASHBOARD_TITLE")
            .unwrap_or(DEFAULT_DASHBOARD_TITLE)
            .to_string();

        let drain_seconds = match get("DASHBOARD_DRAIN_SECONDS") {
            Some(value) => value.parse().map_err(|e| {
                ConfigError::InvalidDrain(format!(
                    "DASHBOARD_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value, e
                ))
            })?,
            None => 0,
        };

        Ok(Config {
            server_host,
            server_port,
            refresh_interval: Duration::from_millis(refresh_ms),
            query_timeout: Duration::from_millis(query_timeout_ms),
            display_tz,
            bind_address,
            latency_history_size,
            event_history_size,
            fallback_status_url,
            dashboard_title,
            drain_seconds,
        })
    }

    /// Target handed to the probes.
    pub fn probe_target(&self) -> ProbeTarget {
        ProbeTarget::new(self.server_host.clone(), self.server_port)
            .with_timeout(self.query_timeout)
    }

    /// Settings handed to the orchestrator.
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            target: self.probe_target(),
            latency_capacity: self.latency_history_size,
            event_capacity: self.event_history_size,
        }
    }

    /// Static settings for the rendered page.
    pub fn dashboard_view(&self) -> DashboardView {
        DashboardView {
            title: self.dashboard_title.clone(),
            address: format!("{}:{}", self.server_host, self.server_port),
            refresh_interval: self.refresh_interval,
            tz: self.display_tz,
        }
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    let port: u16 = value.parse().map_err(|e| {
        ConfigError::InvalidPort(format!(
            "{} must be an integer between 1 and 65535, got '{}': {}",
            key, value, e
        ))
    })?;

    if port == 0 {
        return Err(ConfigError::InvalidPort(format!(
            "{} must be greater than 0",
            key
        )));
    }

    Ok(port)
}

fn parse_positive(
    key: &str,
    value: &str,
    err: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    let parsed: u64 = value.parse().map_err(|e| {
        err(format!(
            "{} must be a valid positive integer, got '{}': {}",
            key, value, e
        ))
    })?;

    if parsed == 0 {
        return Err(err(format!("{} must be greater than 0", key)));
    }

    Ok(parsed)
}

fn parse_history_size(key: &str, value: &str) -> Result<usize, ConfigError> {
    let parsed = parse_positive(key, value, ConfigError::InvalidHistorySize)?;
    match usize::try_from(parsed) {
        Ok(size) if size <= MAX_HISTORY_SIZE => Ok(size),
        _ => Err(ConfigError::InvalidHistorySize(format!(
            "{} must be at most {}, got {}",
            key, MAX_HISTORY_SIZE, parsed
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config.server_host, "localhost");
        assert_eq!(config.server_port, 25565);
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.query_timeout, Duration::from_millis(3000));
        assert_eq!(config.display_tz, chrono_tz::America::Los_Angeles);
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.latency_history_size, 15);
        assert_eq!(config.event_history_size, 20);
        assert_eq!(config.fallback_status_url, None);
        assert_eq!(config.dashboard_title, "Minecraft Server Dashboard");
        assert_eq!(config.drain_seconds, 0);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let config = Config::from_vars(&vars(&[
            ("SERVER_HOST", "mc.example.org"),
            ("SERVER_PORT", "25566"),
            ("REFRESH_MS", "15000"),
            ("QUERY_TIMEOUT_MS", "1500"),
            ("SERVER_TZ", "Europe/Berlin"),
            ("PORT", "9000"),
            ("LATENCY_HISTORY_SIZE", "30"),
            ("EVENT_HISTORY_SIZE", "50"),
            ("FALLBACK_STATUS_URL", "https://api.mcsrvstat.us/3/"),
            ("DASHBOARD_TITLE", "Survival World"),
            ("DASHBOARD_DRAIN_SECONDS", "5"),
        ]))
        .expect("Config should load successfully");

        assert_eq!(config.server_host, "mc.example.org");
        assert_eq!(config.server_port, 25566);
        assert_eq!(config.refresh_interval, Duration::from_secs(15));
        assert_eq!(config.query_timeout, Duration::from_millis(1500));
        assert_eq!(config.display_tz, chrono_tz::Europe::Berlin);
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.latency_history_size, 30);
        assert_eq!(config.event_history_size, 50);
        assert_eq!(
            config.fallback_status_url.as_deref(),
            Some("https://api.mcsrvstat.us/3")
        );
        assert_eq!(config.dashboard_title, "Survival World");
        assert_eq!(config.drain_seconds, 5);
    }

    #[test]
    fn test_bind_address_overrides_port() {
        let config = Config::from_vars(&vars(&[
            ("PORT", "9000"),
            ("BIND_ADDRESS", "127.0.0.1:3000"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = Config::from_vars(&vars(&[("SERVER_HOST", ""), ("REFRESH_MS", "  ")]))
            .unwrap();

        assert_eq!(config.server_host, "localhost");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_server_port_rejects_zero() {
        let result = Config::from_vars(&vars(&[("SERVER_PORT", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_server_port_rejects_out_of_range() {
        let result = Config::from_vars(&vars(&[("SERVER_PORT", "70000")]));
        assert!(matches!(result, Err(ConfigError::InvalidPort(msg)) if msg.contains("SERVER_PORT")));
    }

    #[test]
    fn test_refresh_rejects_zero() {
        let result = Config::from_vars(&vars(&[("REFRESH_MS", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidInterval(_))));
    }

    #[test]
    fn test_timeout_rejects_non_numeric() {
        let result = Config::from_vars(&vars(&[("QUERY_TIMEOUT_MS", "fast")]));
        assert!(
            matches!(result, Err(ConfigError::InvalidInterval(msg)) if msg.contains("QUERY_TIMEOUT_MS"))
        );
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let result = Config::from_vars(&vars(&[("SERVER_TZ", "Mars/Olympus_Mons")]));
        assert!(matches!(result, Err(ConfigError::InvalidTimezone(_))));
    }

    #[test]
    fn test_history_size_rejects_zero() {
        let result = Config::from_vars(&vars(&[("EVENT_HISTORY_SIZE", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidHistorySize(_))));
    }

    #[test]
    fn test_history_size_rejects_above_maximum() {
        let result = Config::from_vars(&vars(&[("LATENCY_HISTORY_SIZE", "1000000000000000000")]));
        assert!(matches!(result, Err(ConfigError::InvalidHistorySize(_))));

        let result = Config::from_vars(&vars(&[("EVENT_HISTORY_SIZE", "10001")]));
        assert!(matches!(result, Err(ConfigError::InvalidHistorySize(_))));
    }

    #[test]
    fn test_history_size_accepts_maximum() {
        let config = Config::from_vars(&vars(&[("LATENCY_HISTORY_SIZE", "10000")])).unwrap();
        assert_eq!(config.latency_history_size, MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_fallback_url_requires_http_scheme() {
        let result = Config::from_vars(&vars(&[("FALLBACK_STATUS_URL", "api.mcsrvstat.us")]));
        assert!(matches!(result, Err(ConfigError::InvalidFallbackUrl(_))));
    }

    #[test]
    fn test_drain_rejects_negative() {
        let result = Config::from_vars(&vars(&[("DASHBOARD_DRAIN_SECONDS", "-1")]));
        assert!(matches!(result, Err(ConfigError::InvalidDrain(_))));
    }

    #[test]
    fn test_poller_settings_from_config() {
        let config = Config::from_vars(&vars(&[
            ("SERVER_HOST", "mc.example.org"),
            ("QUERY_TIMEOUT_MS", "500"),
            ("LATENCY_HISTORY_SIZE", "5"),
        ]))
        .unwrap();

        let settings = config.poller_settings();

        assert_eq!(settings.target.address(), "mc.example.org:25565");
        assert_eq!(settings.target.timeout, Duration::from_millis(500));
        assert_eq!(settings.latency_capacity, 5);
        assert_eq!(settings.event_capacity, 20);
    }

    #[test]
    fn test_dashboard_view_from_config() {
        let config = Config::from_vars(&vars(&[
            ("SERVER_HOST", "mc.example.org"),
            ("REFRESH_MS", "30000"),
            ("SERVER_TZ", "UTC"),
        ]))
        .unwrap();

        let view = config.dashboard_view();

        assert_eq!(view.address, "mc.example.org:25565");
        assert_eq!(view.refresh_seconds(), 30);
        assert_eq!(view.tz, chrono_tz::UTC);
        assert_eq!(view.title, "Minecraft Server Dashboard");
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidPort("SERVER_PORT must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid server port configuration: SERVER_PORT must be greater than 0"
        );
    }
}
