//! # Error Types
//!
//! Custom error types for Vario Telemetry using `thiserror`.
//!
//! Only link setup and the surrounding plumbing (config, feed, serial open, BLE stack)
//! can fail. Transmitting a sentence never produces an error.

use thiserror::Error;

/// Main error type for Vario Telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial channel errors (open, write, flush)
    #[error("Serial error: {0}")]
    Serial(String),

    /// Wireless stack refused a setup step or a notification
    #[error("BLE error: {0}")]
    Ble(String),

    /// Malformed reading snapshot on the feed
    #[error("Feed error: {0}")]
    Feed(#[from] serde_json::Error),
}

/// Result type alias for Vario Telemetry
pub type Result<T> = std::result::Result<T, TelemetryError>;
