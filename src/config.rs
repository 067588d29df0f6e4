//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TelemetryError};
use crate::sentence::encoder::SentenceKind;
use crate::transport::TransportKind;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Link selection
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_transport_kind")]
    pub kind: TransportKind,
}

/// Serial-profile link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Broadcast configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_sentence")]
    pub sentence: SentenceKind,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_stats_interval_sentences")]
    pub stats_interval_sentences: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to daily-rotated files in this directory
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_transport_kind() -> TransportKind { TransportKind::Ble }

fn default_serial_port() -> String { "/dev/rfcomm0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_sentence() -> SentenceKind { SentenceKind::Lk8ex1 }
fn default_interval_ms() -> u64 { 500 }
fn default_stats_interval_sentences() -> u64 { 120 }

fn default_log_level() -> String { "info".to_string() }

impl Default for TransportConfig {
    fn default() -> Self {
        Self { kind: default_transport_kind() }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sentence: default_sentence(),
            interval_ms: default_interval_ms(),
            stats_interval_sentences: default_stats_interval_sentences(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

impl SerialConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

impl TelemetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vario_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.transport.kind == TransportKind::Serial && self.serial.port.is_empty() {
            return Err(TelemetryError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600].contains(&self.serial.baud_rate) {
            return Err(TelemetryError::Config(
                toml::de::Error::custom("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600")
            ));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(TelemetryError::Config(
                toml::de::Error::custom("reconnect_interval_ms must be between 1 and 60000")
            ));
        }

        if self.telemetry.interval_ms < 50 || self.telemetry.interval_ms > 60000 {
            return Err(TelemetryError::Config(
                toml::de::Error::custom("interval_ms must be between 50 and 60000")
            ));
        }

        if self.telemetry.stats_interval_sentences == 0 {
            return Err(TelemetryError::Config(
                toml::de::Error::custom("stats_interval_sentences must be greater than 0")
            ));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(TelemetryError::Config(
                toml::de::Error::custom("logging level must be one of: trace, debug, info, warn, error")
            ));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(TelemetryError::Config(
                toml::de::Error::custom("logging dir cannot be empty when set")
            ));
        }

        Ok(())
    }
}
