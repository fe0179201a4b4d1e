//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `LOCK_WAIT_MS` — per-item lock wait budget (default: `5000`)
/// - `LOCK_LEASE_MS` — lock lease before takeover (default: `10000`)
/// - `CURRENCY` — gateway currency code (default: `"usd"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub lock_wait: Duration,
    pub lock_lease: Duration,
    pub currency: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            lock_wait: Duration::from_millis(env_millis("LOCK_WAIT_MS", 5000)),
            lock_lease: Duration::from_millis(env_millis("LOCK_LEASE_MS", 10_000)),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_millis(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            lock_wait: Duration::from_millis(5000),
            lock_lease: Duration::from_millis(10_000),
            currency: "usd".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.lock_wait, Duration::from_secs(5));
        assert_eq!(config.lock_lease, Duration::from_secs(10));
        assert_eq!(config.currency, "usd");
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
