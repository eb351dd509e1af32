//! Configuration system for the Vaultdrop CLI.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vaultdrop_signal::ServerConfig;
use vaultdrop_transfer::TransferConfig;

/// Vaultdrop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Signaling server configuration
    pub server: ServerSection,
    /// Session lifetime configuration
    pub sessions: SessionsSection,
    /// Transfer configuration
    pub transfer: TransferSection,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Signaling server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address
    pub listen_addr: String,
    /// Per-peer outbound queue capacity
    pub outbound_queue_capacity: usize,
}

/// Session lifetime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    /// Session TTL in seconds
    pub ttl_secs: u64,
    /// Expiry sweep interval in seconds
    pub sweep_interval_secs: u64,
}

/// Transfer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TransferSection {
    /// Delay between chunk frames in milliseconds
    pub pacing_millis: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            outbound_queue_capacity: vaultdrop_signal::DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            ttl_secs: vaultdrop_signal::DEFAULT_SESSION_TTL.as_secs(),
            sweep_interval_secs: vaultdrop_signal::DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("vaultdrop/config.toml")
    }

    /// Load config from `path`, falling back to defaults if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse listen address as `SocketAddr`
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn parse_listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.parse_listen_addr()?;

        if self.server.outbound_queue_capacity == 0 || self.server.outbound_queue_capacity > 4096 {
            anyhow::bail!("Outbound queue capacity must be between 1 and 4096");
        }

        if self.sessions.ttl_secs == 0 {
            anyhow::bail!("Session TTL must be at least 1 second");
        }

        if self.sessions.sweep_interval_secs == 0 {
            anyhow::bail!("Sweep interval must be at least 1 second");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Build the signaling server configuration, with an optional listen
    /// address override.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be parsed.
    pub fn server_config(&self, listen_override: Option<SocketAddr>) -> anyhow::Result<ServerConfig> {
        let listen_addr = match listen_override {
            Some(addr) => addr,
            None => self.parse_listen_addr()?,
        };

        Ok(ServerConfig {
            listen_addr,
            outbound_queue_capacity: self.server.outbound_queue_capacity,
            session_ttl: Duration::from_secs(self.sessions.ttl_secs),
            sweep_interval: Duration::from_secs(self.sessions.sweep_interval_secs),
        })
    }

    /// Build the transfer engine configuration
    #[must_use]
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            pacing: Duration::from_millis(self.transfer.pacing_millis),
        }
    }
}
