//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::queue::DEFAULT_CAPACITY;

/// Default listen port
pub const DEFAULT_PORT: u16 = 42;

const DEFAULT_RELAY_TIMEOUT_MS: u64 = 5_000;

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn default_queue_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_relay_timeout_ms() -> u64 {
    DEFAULT_RELAY_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

/// Configuration for the coordinator server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Capacity of the movement command queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Timeout for a single device relay call, in milliseconds
    #[serde(default = "default_relay_timeout_ms")]
    pub relay_timeout_ms: u64,

    /// Run the dispatcher that relays queued commands to devices
    #[serde(default = "default_true")]
    pub enable_dispatch: bool,

    /// Enable request logging
    #[serde(default = "default_true")]
    pub enable_request_logging: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            queue_capacity: DEFAULT_CAPACITY,
            relay_timeout_ms: DEFAULT_RELAY_TIMEOUT_MS,
            enable_dispatch: true,
            enable_request_logging: true,
        }
    }
}

impl CoordinatorConfig {
    /// Create a new config builder
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }

    /// Relay timeout as a duration
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue_capacity".to_string(),
                reason: "Queue must hold at least 1 command".to_string(),
            });
        }

        if self.relay_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "relay_timeout_ms".to_string(),
                reason: "Timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Some(addr) = env_var("BOTFLEET_BIND_ADDRESS") {
            builder = builder.bind_address_str(&addr)?;
        }
        if let Some(capacity) = env_var("BOTFLEET_QUEUE_CAPACITY") {
            builder = builder.queue_capacity(parse_env("BOTFLEET_QUEUE_CAPACITY", &capacity)?);
        }
        if let Some(timeout) = env_var("BOTFLEET_RELAY_TIMEOUT_MS") {
            builder = builder.relay_timeout_ms(parse_env("BOTFLEET_RELAY_TIMEOUT_MS", &timeout)?);
        }
        if let Some(logging) = env_var("BOTFLEET_REQUEST_LOGGING") {
            builder =
                builder.enable_request_logging(parse_env("BOTFLEET_REQUEST_LOGGING", &logging)?);
        }

        builder.build()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of a loaded configuration
    ///
    /// Set overrides win over whatever the file or environment provided.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(host) = overrides.host {
            self.bind_address.set_ip(host);
        }
        if let Some(port) = overrides.port {
            self.bind_address.set_port(port);
        }
        if let Some(capacity) = overrides.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(timeout) = overrides.relay_timeout_ms {
            self.relay_timeout_ms = timeout;
        }
        if overrides.disable_dispatch {
            self.enable_dispatch = false;
        }
        if overrides.disable_request_logging {
            self.enable_request_logging = false;
        }

        self.validate()?;
        Ok(self)
    }
}

/// Command-line overrides for a loaded configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub queue_capacity: Option<usize>,
    pub relay_timeout_ms: Option<u64>,
    pub disable_dispatch: bool,
    pub disable_request_logging: bool,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: key.to_string(),
        reason: format!("Cannot parse '{value}'"),
    })
}

/// Builder for CoordinatorConfig
#[derive(Debug, Default)]
pub struct CoordinatorConfigBuilder {
    bind_address: Option<SocketAddr>,
    queue_capacity: Option<usize>,
    relay_timeout_ms: Option<u64>,
    enable_dispatch: Option<bool>,
    enable_request_logging: Option<bool>,
}

impl CoordinatorConfigBuilder {
    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_address = Some(addr.parse().map_err(|_| ConfigError::InvalidValue {
            field: "bind_address".to_string(),
            reason: format!("Invalid address: {addr}"),
        })?);
        Ok(self)
    }

    /// Set only the port, keeping the host
    pub fn port(mut self, port: u16) -> Self {
        let mut addr = self.bind_address.unwrap_or_else(default_bind_address);
        addr.set_port(port);
        self.bind_address = Some(addr);
        self
    }

    /// Set queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set relay timeout
    pub fn relay_timeout_ms(mut self, ms: u64) -> Self {
        self.relay_timeout_ms = Some(ms);
        self
    }

    /// Enable/disable the dispatcher
    pub fn enable_dispatch(mut self, enable: bool) -> Self {
        self.enable_dispatch = Some(enable);
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<CoordinatorConfig, ConfigError> {
        let config = CoordinatorConfig {
            bind_address: self.bind_address.unwrap_or_else(default_bind_address),
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_CAPACITY),
            relay_timeout_ms: self.relay_timeout_ms.unwrap_or(DEFAULT_RELAY_TIMEOUT_MS),
            enable_dispatch: self.enable_dispatch.unwrap_or(true),
            enable_request_logging: self.enable_request_logging.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cannot read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Cannot parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address.port(), 42);
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:42");
    }

    #[test]
    fn test_config_builder() {
        let config = CoordinatorConfig::builder()
            .queue_capacity(8)
            .relay_timeout_ms(250)
            .enable_dispatch(false)
            .build()
            .unwrap();

        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.relay_timeout(), Duration::from_millis(250));
        assert!(!config.enable_dispatch);
    }

    #[test]
    fn test_config_validation_fails() {
        let result = CoordinatorConfig::builder().queue_capacity(0).build();
        assert!(result.is_err());

        let result = CoordinatorConfig::builder().relay_timeout_ms(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_builder_with_address() {
        let config = CoordinatorConfig::builder()
            .bind_address_str("127.0.0.1:9000")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.bind_address.port(), 9000);
        assert!(CoordinatorConfig::builder().bind_address_str("nope").is_err());
    }

    #[test]
    fn test_port_override_keeps_host() {
        let config = CoordinatorConfig::builder()
            .bind_address_str("127.0.0.1:9000")
            .unwrap()
            .port(8081)
            .build()
            .unwrap();

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8081");
    }

    #[test]
    fn test_overrides_replace_loaded_values() {
        let loaded = CoordinatorConfig::builder()
            .bind_address_str("127.0.0.1:9000")
            .unwrap()
            .queue_capacity(8)
            .build()
            .unwrap();

        let config = loaded
            .with_overrides(&ConfigOverrides {
                port: Some(8042),
                queue_capacity: Some(3),
                disable_dispatch: true,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8042");
        assert_eq!(config.queue_capacity, 3);
        assert!(!config.enable_dispatch);
        assert!(config.enable_request_logging);
        assert_eq!(config.relay_timeout_ms, DEFAULT_RELAY_TIMEOUT_MS);
    }

    #[test]
    fn test_port_override_replaces_default_port() {
        let config = CoordinatorConfig::default()
            .with_overrides(&ConfigOverrides {
                port: Some(8080),
                host: Some(IpAddr::from([127, 0, 0, 1])),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let config = CoordinatorConfig::default()
            .with_overrides(&ConfigOverrides::default())
            .unwrap();
        assert_eq!(config, CoordinatorConfig::default());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let result = CoordinatorConfig::default().with_overrides(&ConfigOverrides {
            queue_capacity: Some(0),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CoordinatorConfig = toml::from_str("queue_capacity = 4").unwrap();

        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.bind_address.port(), DEFAULT_PORT);
        assert!(config.enable_dispatch);
    }
}
