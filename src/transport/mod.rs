//! # Transport Module
//!
//! Delivers encoded sentences to a companion device.
//!
//! This module handles:
//! - A single [`Transport`] capability set shared by all link variants
//! - BLE GATT notifications ([`ble`])
//! - Serial-profile streams ([`serial`])
//! - Choosing the variant at startup from configuration
//!
//! Transmitting is best-effort: no acknowledgement, no retry, and no error
//! is surfaced when nobody is listening.

pub mod ble;
pub mod serial;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::link::LinkStatus;

/// Link variant selected in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// BLE GATT notify channel
    Ble,
    /// Classic serial-profile channel
    Serial,
}

/// Outcome of a transmit call
///
/// Informational only; none of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Bytes handed to the stack
    Sent,
    /// No peer connected, nothing sent
    Skipped,
    /// The stack rejected the bytes; they are not retried
    Dropped,
}

/// A telemetry link
#[async_trait]
pub trait Transport: Send {
    /// Link variant
    fn kind(&self) -> TransportKind;

    /// Configure identity, security and observers, then start accepting a peer
    ///
    /// # Errors
    ///
    /// Returns error if the underlying stack refuses to start. Callers log it
    /// and carry on without telemetry.
    async fn setup(&mut self) -> crate::error::Result<()>;

    /// Send a sentence if a peer is connected
    async fn transmit(&mut self, sentence: &[u8]) -> Delivery;

    /// Current link status
    fn link_status(&self) -> LinkStatus;

    /// Periodic housekeeping (reconnect attempts)
    async fn maintain(&mut self) {}
}

/// Build the transport selected in `config`
pub fn from_config(config: &Config) -> Box<dyn Transport> {
    match config.transport.kind {
        TransportKind::Ble => Box::new(ble::default_transport()),
        TransportKind::Serial => Box::new(serial::SerialTransport::new(
            serial::TokioSerialConnector::new(&config.serial.port, config.serial.baud_rate),
            config.serial.reconnect_interval(),
        )),
    }
}
