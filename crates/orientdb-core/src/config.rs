//! Connection configuration.
//!
//! Resolution order: environment variables → config file → builder defaults.
//!
//! Config file location:
//!   1. $ORIENTDB_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/orientdb-client/config.toml
//!   3. ~/.config/orientdb-client/config.toml

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum protocol version this client accepts from a server (§6).
pub const MIN_PROTOCOL_VERSION: u16 = 28;
/// Protocol version this client advertises during handshake (§6).
pub const ADVERTISED_PROTOCOL_VERSION: i16 = 33;

/// Connection parameters for a session (§10.3). Constructed via `Default`
/// plus field assignment, or loaded from the environment/a TOML file with
/// [`ConnectionConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub username: String,
    pub password: String,
    /// Protocol version advertised in the handshake.
    pub protocol_version: i16,
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Cap on outstanding requests before new calls fail with `QueueFull`.
    /// `0` means unbounded (§5 Backpressure).
    pub queue_depth: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2424,
            tls: false,
            username: String::new(),
            password: String::new(),
            protocol_version: ADVERTISED_PROTOCOL_VERSION,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            queue_depth: 0,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
}

impl ConnectionConfig {
    /// Port used when `tls` is true and the caller hasn't set an explicit
    /// port (defaults swap to 2434 the way OrientDB's own clients do).
    pub fn default_tls() -> Self {
        Self { tls: true, port: 2434, ..Self::default() }
    }

    /// Loads configuration: builder defaults, overridden by an optional
    /// TOML file, overridden by `ORIENTDB_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            ConnectionConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn file_path() -> PathBuf {
        std::env::var("ORIENTDB_CONFIG").map(PathBuf::from).unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ORIENTDB_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("ORIENTDB_PORT") {
            if let Ok(p) = v.parse() {
                self.port = p;
            }
        }
        if let Ok(v) = std::env::var("ORIENTDB_USER") {
            self.username = v;
        }
        if let Ok(v) = std::env::var("ORIENTDB_PASSWORD") {
            self.password = v;
        }
        if let Ok(v) = std::env::var("ORIENTDB_TLS") {
            self.tls = v == "true" || v == "1";
        }
    }
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("orientdb-client")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_floor() {
        let config = ConnectionConfig::default();
        assert_eq!(config.port, 2424);
        assert_eq!(config.protocol_version, ADVERTISED_PROTOCOL_VERSION);
        assert!(!config.tls);
    }

    #[test]
    fn default_tls_config_uses_tls_port() {
        let config = ConnectionConfig::default_tls();
        assert!(config.tls);
        assert_eq!(config.port, 2434);
    }

    #[test]
    fn env_overrides_apply_over_defaults() {
        let mut config = ConnectionConfig::default();
        config.host = "10.0.0.5".to_string();
        config.apply_env_overrides();
        // No env vars set in this process by the test itself, so nothing
        // should have changed from the manual assignment above.
        assert_eq!(config.host, "10.0.0.5");
    }
}
