//! Server and runtime settings from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::TimeWindow;

/// Invalid or unusable environment settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}

/// Runtime settings for the hotspot server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Quiet period before a viewport change triggers a refresh.
    pub debounce: Duration,
    /// `None` disables polling.
    pub poll_interval: Option<Duration>,
    pub time_window: TimeWindow,
    /// File used to persist the map view between runs.
    pub view_state_path: Option<PathBuf>,
    /// Explicit `hotspots.toml`; otherwise the default locations are searched.
    pub repository_config: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            debounce: Duration::from_millis(500),
            poll_interval: Some(Duration::from_secs(30)),
            time_window: TimeWindow::Today,
            view_state_path: None,
            repository_config: None,
        }
    }
}

impl ServerConfig {
    /// Read settings from the process environment.
    ///
    /// - `HOST` (default `0.0.0.0`), `PORT` (default 8080)
    /// - `HOTSPOT_DEBOUNCE_MS` (default 500)
    /// - `HOTSPOT_POLL_SECS` (default 30, `0` disables polling)
    /// - `HOTSPOT_TIME_WINDOW` (`today` or `last_hour`)
    /// - `HOTSPOT_VIEW_STATE_PATH`, `HOTSPOT_CONFIG`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = parse_var(&get, "PORT")?.unwrap_or(defaults.port);
        let debounce = parse_var::<u64>(&get, "HOTSPOT_DEBOUNCE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.debounce);
        let poll_interval = match parse_var::<u64>(&get, "HOTSPOT_POLL_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.poll_interval,
        };
        let time_window = parse_var(&get, "HOTSPOT_TIME_WINDOW")?.unwrap_or(defaults.time_window);

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            debounce,
            poll_interval,
            time_window,
            view_state_path: get("HOTSPOT_VIEW_STATE_PATH").map(PathBuf::from),
            repository_config: get("HOTSPOT_CONFIG").map(PathBuf::from),
        })
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        None => Ok(None),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map(Some).map_err(|e| ConfigError::InvalidValue {
                name,
                reason: e.to_string(),
                value,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address().unwrap().port(), 8080);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9090"),
            ("HOTSPOT_DEBOUNCE_MS", "250"),
            ("HOTSPOT_POLL_SECS", "0"),
            ("HOTSPOT_TIME_WINDOW", "last_hour"),
            ("HOTSPOT_VIEW_STATE_PATH", "/tmp/view.json"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.poll_interval, None);
        assert_eq!(config.time_window, TimeWindow::LastHour);
        assert_eq!(config.view_state_path, Some(PathBuf::from("/tmp/view.json")));
        assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:9090");
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "PORT", .. }));

        let err =
            ServerConfig::from_lookup(lookup(&[("HOTSPOT_POLL_SECS", "-1")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "HOTSPOT_POLL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_time_window() {
        assert!(ServerConfig::from_lookup(lookup(&[("HOTSPOT_TIME_WINDOW", "week")])).is_err());
    }
}
