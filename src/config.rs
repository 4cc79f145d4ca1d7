//! Environment-driven runtime configuration.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Address the HTTP/websocket listener binds to.
pub const ADDR_ENV: &str = "CHATWAVE_ADDR";
/// Interval between server-initiated keepalive pings, in humantime form
/// (`30s`, `2min`, ...).
pub const PING_INTERVAL_ENV: &str = "CHATWAVE_PING_INTERVAL";

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub ping_interval: Duration,
}

/// A variable that is set but unparseable is a startup error, not a silent
/// fallback.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CHATWAVE_ADDR is not a valid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),
    #[error("CHATWAVE_PING_INTERVAL is not a valid duration: {0}")]
    PingInterval(#[from] humantime::DurationError),
}

impl Config {
    /// Read the configuration once, at startup. Unset variables fall back to
    /// the defaults (`127.0.0.1:3030`, `30s`).
    pub fn from_env() -> Result<Config, ConfigError> {
        let addr = match env::var(ADDR_ENV).ok() {
            Some(raw) => raw.parse()?,
            None => SocketAddr::from(([127, 0, 0, 1], 3030)),
        };
        let ping_interval = match env::var(PING_INTERVAL_ENV).ok() {
            Some(raw) => humantime::parse_duration(&raw)?,
            None => DEFAULT_PING_INTERVAL,
        };
        Ok(Config {
            addr,
            ping_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // one test so the process environment is never touched concurrently
    #[test]
    fn from_env_defaults_overrides_and_errors() {
        env::remove_var(ADDR_ENV);
        env::remove_var(PING_INTERVAL_ENV);
        let config = Config::from_env().unwrap();
        assert_eq!(config.addr, SocketAddr::from(([127, 0, 0, 1], 3030)));
        assert_eq!(config.ping_interval, Duration::from_secs(30));

        env::set_var(ADDR_ENV, "0.0.0.0:8080");
        env::set_var(PING_INTERVAL_ENV, "1min 30s");
        let config = Config::from_env().unwrap();
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.ping_interval, Duration::from_secs(90));

        env::set_var(ADDR_ENV, "not-an-address");
        assert!(Config::from_env().is_err());
        env::remove_var(ADDR_ENV);

        env::set_var(PING_INTERVAL_ENV, "soon");
        assert!(Config::from_env().is_err());
        env::remove_var(PING_INTERVAL_ENV);
    }
}
