//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use tracing::debug;

use crate::error::{Result, TelemetryError};

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Opens the serial channel, again after every drop
pub trait SerialConnector: Send {
    type Port: SerialPortIO;

    /// Device description for logs
    fn describe(&self) -> String;

    /// Check the connection settings without touching the device
    ///
    /// # Errors
    ///
    /// Returns error if the settings can never open a channel
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Open the channel
    ///
    /// # Errors
    ///
    /// Returns error if the device is missing or refuses to open
    fn connect(&mut self) -> Result<Self::Port>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}

/// Opens a serial-profile device (e.g. `/dev/rfcomm0`) with tokio-serial, 8N1
#[derive(Debug, Clone)]
pub struct TokioSerialConnector {
    path: String,
    baud_rate: u32,
}

impl TokioSerialConnector {
    pub fn new(path: &str, baud_rate: u32) -> Self {
        Self {
            path: path.to_string(),
            baud_rate,
        }
    }
}

impl SerialConnector for TokioSerialConnector {
    type Port = TokioSerialPort;

    fn describe(&self) -> String {
        self.path.clone()
    }

    fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(TelemetryError::Serial("serial port path is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(TelemetryError::Serial(format!(
                "invalid baud rate {} for {}",
                self.baud_rate, self.path
            )));
        }
        Ok(())
    }

    fn connect(&mut self) -> Result<TokioSerialPort> {
        use tokio_serial::SerialPortBuilderExt;

        debug!("Opening serial port {} at {} baud", self.path, self.baud_rate);
        let port = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TelemetryError::Serial(format!("Failed to open {}: {}", self.path, e)))?;

        Ok(TokioSerialPort::new(port))
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock serial port for testing
    #[derive(Clone)]
    pub struct MockSerialPort {
        pub written_data: Arc<Mutex<Vec<Vec<u8>>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub flush_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSerialPort {
        pub fn new() -> Self {
            Self {
                written_data: Arc::new(Mutex::new(Vec::new())),
                write_error: Arc::new(Mutex::new(None)),
                flush_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn get_written_data(&self) -> Vec<Vec<u8>> {
            self.written_data.lock().unwrap().clone()
        }

        pub fn set_write_error(&self, error: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(error);
        }

        pub fn clear_write_error(&self) {
            *self.write_error.lock().unwrap() = None;
        }

        pub fn set_flush_error(&self, error: io::ErrorKind) {
            *self.flush_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl SerialPortIO for MockSerialPort {
        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            if let Some(error) = *self.write_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock write error"));
            }
            self.written_data.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            if let Some(error) = *self.flush_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock flush error"));
            }
            Ok(())
        }
    }

    /// Connector handing out clones of one mock port; fails while `available` is false
    #[derive(Clone)]
    pub struct MockConnector {
        pub port: MockSerialPort,
        pub available: Arc<Mutex<bool>>,
        pub attempts: Arc<Mutex<usize>>,
    }

    impl MockConnector {
        pub fn new(available: bool) -> Self {
            Self {
                port: MockSerialPort::new(),
                available: Arc::new(Mutex::new(available)),
                attempts: Arc::new(Mutex::new(0)),
            }
        }

        pub fn set_available(&self, available: bool) {
            *self.available.lock().unwrap() = available;
        }

        pub fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    impl SerialConnector for MockConnector {
        type Port = MockSerialPort;

        fn describe(&self) -> String {
            "mock".to_string()
        }

        fn connect(&mut self) -> Result<MockSerialPort> {
            *self.attempts.lock().unwrap() += 1;
            if *self.available.lock().unwrap() {
                Ok(self.port.clone())
            } else {
                Err(TelemetryError::Serial("mock device unavailable".to_string()))
            }
        }
    }
}
