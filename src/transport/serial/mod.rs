//! # Serial Transport
//!
//! Streams sentences over a serial-profile channel (Bluetooth SPP exposed as
//! a tty, or a plain UART).
//!
//! This module handles:
//! - Opening the channel with tokio-serial (8N1, no flow control)
//! - Writing each sentence while the channel is open
//! - Treating a failed write as the peer dropping
//! - Reopening the channel at a bounded rate

mod port_trait;

pub use port_trait::{SerialConnector, SerialPortIO, TokioSerialConnector, TokioSerialPort};

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use super::{Delivery, Transport, TransportKind};
use crate::error::Result;
use crate::link::{LinkMonitor, LinkObserver, LinkStatus, ReconnectPolicy};

/// Serial link: Connected while the channel is open, no advertising phase
pub struct SerialTransport<C: SerialConnector> {
    connector: C,
    port: Option<C::Port>,
    monitor: Arc<LinkMonitor>,
    reconnect_interval: Duration,
    last_attempt: Option<Instant>,
}

impl<C: SerialConnector> std::fmt::Debug for SerialTransport<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device", &self.connector.describe())
            .field("status", &self.monitor.status())
            .finish_non_exhaustive()
    }
}

impl<C: SerialConnector> SerialTransport<C> {
    pub fn new(connector: C, reconnect_interval: Duration) -> Self {
        Self {
            connector,
            port: None,
            monitor: LinkMonitor::new(ReconnectPolicy::AwaitReopen),
            reconnect_interval,
            last_attempt: None,
        }
    }

    fn open(&mut self) -> Result<()> {
        self.last_attempt = Some(Instant::now());
        let port = self.connector.connect()?;
        self.port = Some(port);
        self.monitor.peer_connected();
        Ok(())
    }

    fn reconnect_due(&self) -> bool {
        self.last_attempt
            .map_or(true, |at| at.elapsed() >= self.reconnect_interval)
    }

    async fn write(port: &mut C::Port, sentence: &[u8]) -> std::io::Result<()> {
        port.write_all(sentence).await?;
        port.flush().await
    }
}

#[async_trait]
impl<C: SerialConnector> Transport for SerialTransport<C> {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    /// Open the channel if the peer is already there
    ///
    /// A missing peer is not an error: the link stays Disconnected and
    /// [`maintain`](Transport::maintain) keeps trying to reopen it.
    ///
    /// # Errors
    ///
    /// Returns error only if the connection settings are unusable.
    async fn setup(&mut self) -> Result<()> {
        self.connector.validate()?;

        match self.open() {
            Ok(()) => info!("Serial link open on {}", self.connector.describe()),
            Err(e) => info!("No serial peer yet, will retry: {}", e),
        }
        Ok(())
    }

    async fn transmit(&mut self, sentence: &[u8]) -> Delivery {
        let Some(port) = self.port.as_mut() else {
            trace!("Serial link closed, skipping {} bytes", sentence.len());
            return Delivery::Skipped;
        };
        if !self.monitor.is_connected() {
            return Delivery::Skipped;
        }

        match Self::write(port, sentence).await {
            Ok(()) => {
                debug!("Wrote {} bytes", sentence.len());
                Delivery::Sent
            }
            Err(e) => {
                warn!("Serial write failed, closing link: {}", e);
                self.port = None;
                self.monitor.peer_disconnected();
                Delivery::Dropped
            }
        }
    }

    fn link_status(&self) -> LinkStatus {
        self.monitor.status()
    }

    async fn maintain(&mut self) {
        if self.port.is_some() || !self.reconnect_due() {
            return;
        }

        match self.open() {
            Ok(()) => info!("Serial link reopened on {}", self.connector.describe()),
            Err(e) => debug!("Serial reopen failed: {}", e),
        }
    }
}
