//! Server configuration read from environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_SIGNALING_PORT: u16 = 8080;
pub const DEFAULT_HEALTH_PORT: u16 = 8081;
const DEFAULT_PING_INTERVAL_SECS: u64 = 30;
const DEFAULT_PONG_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub health_port: u16,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_SIGNALING_PORT,
            health_port: DEFAULT_HEALTH_PORT,
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            pong_timeout: Duration::from_secs(DEFAULT_PONG_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Read `HOST`, `PORT`, `HEALTH_PORT`, `PING_INTERVAL_SECS` and
    /// `PONG_TIMEOUT_SECS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or(defaults.host);

        Ok(Self {
            host,
            port: parse(&lookup, "PORT", defaults.port)?,
            health_port: parse(&lookup, "HEALTH_PORT", defaults.health_port)?,
            ping_interval: parse_secs(&lookup, "PING_INTERVAL_SECS", defaults.ping_interval)?,
            pong_timeout: parse_secs(&lookup, "PONG_TIMEOUT_SECS", defaults.pong_timeout)?,
        })
    }

    pub fn signaling_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn health_addr(&self) -> String {
        format!("{}:{}", self.host, self.health_port)
    }

    /// Startup banner. `/health` is not served on the WebSocket port, so
    /// the banner names both listeners.
    pub fn banner(&self) -> String {
        [
            "   Tandem Signaling Server".to_string(),
            format!("   WebSocket on ws://{}", self.signaling_addr()),
            format!(
                "   Health on http://{}/health (HEALTH_PORT, not the WebSocket PORT)",
                self.health_addr()
            ),
            "   Press Ctrl+C to stop\n".to_string(),
        ]
        .join("\n")
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Whole seconds, strictly positive
fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs: u64 = parse(lookup, key, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.signaling_addr(), "0.0.0.0:8080");
        assert_eq!(config.health_addr(), "0.0.0.0:8081");
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("HEALTH_PORT", "9001"),
            ("PING_INTERVAL_SECS", "5"),
            ("PONG_TIMEOUT_SECS", "2"),
        ])
        .unwrap();
        assert_eq!(config.signaling_addr(), "127.0.0.1:9000");
        assert_eq!(config.health_addr(), "127.0.0.1:9001");
        assert_eq!(config.ping_interval, Duration::from_secs(5));
        assert_eq!(config.pong_timeout, Duration::from_secs(2));
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), r#"invalid value for PORT: "eighty""#);
        assert!(config_from(&[("HEALTH_PORT", "70000")]).is_err());
    }

    #[test]
    fn rejects_zero_ping_interval() {
        assert!(config_from(&[("PING_INTERVAL_SECS", "0")]).is_err());
        assert!(config_from(&[("PONG_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn banner_names_separate_health_port() {
        let config = config_from(&[("PORT", "9000"), ("HEALTH_PORT", "9001")]).unwrap();
        let banner = config.banner();
        assert!(banner.contains("ws://0.0.0.0:9000"));
        assert!(banner.contains("http://0.0.0.0:9001/health"));
        assert!(banner.contains("not the WebSocket PORT"));
        assert!(!banner.contains(":9000/health"));
    }

    #[test]
    fn blank_host_falls_back_to_default() {
        let config = config_from(&[("HOST", "  ")]).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
    }
}
