//! # BLE Transport
//!
//! Sends sentences as GATT notifications on a single characteristic.
//!
//! Link lifecycle:
//! - Disconnected until setup completes, then advertising
//! - Connected while a peer is subscribed
//! - Back to advertising when the peer drops

pub mod stack;
#[cfg(feature = "bluez")]
pub mod bluez;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, trace};

use self::stack::{GattStack, IoCapability, SecurityConfig};
use super::{Delivery, Transport, TransportKind};
use crate::error::Result;
use crate::link::{LinkMonitor, LinkObserver, LinkStatus, ReconnectPolicy};

/// Advertised device name
pub const DEVICE_NAME: &str = "ESP32-BT-Vario";

/// Telemetry service UUID (Nordic UART Service)
pub const SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

/// Notify characteristic UUID (Nordic UART TX)
pub const CHARACTERISTIC_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// Largest ATT MTU, so a full sentence fits in one notification
pub const PREFERRED_MTU: u16 = 512;

/// Fixed pairing passkey
pub const PASSKEY: u32 = 123_456;

/// Bonding with MITM protection and secure connections, passkey shown on
/// the instrument
pub const SECURITY: SecurityConfig = SecurityConfig {
    bonding: true,
    mitm: true,
    secure_connections: true,
    passkey: PASSKEY,
    io_capability: IoCapability::DisplayOnly,
};

/// BLE link on top of a [`GattStack`]
pub struct BleTransport<S: GattStack> {
    stack: S,
    monitor: Arc<LinkMonitor>,
}

impl<S: GattStack> std::fmt::Debug for BleTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("status", &self.monitor.status())
            .finish_non_exhaustive()
    }
}

impl<S: GattStack> BleTransport<S> {
    pub fn new(stack: S) -> Self {
        Self {
            stack,
            monitor: LinkMonitor::new(ReconnectPolicy::Readvertise),
        }
    }

    /// Observer the stack reports connection events to
    pub fn observer(&self) -> Arc<dyn LinkObserver> {
        self.monitor.clone()
    }
}

#[async_trait]
impl<S: GattStack> Transport for BleTransport<S> {
    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }

    async fn setup(&mut self) -> Result<()> {
        self.stack.init(DEVICE_NAME, PREFERRED_MTU).await?;
        self.stack.configure_security(SECURITY).await?;
        self.stack
            .register_service(SERVICE_UUID, CHARACTERISTIC_UUID, self.observer())
            .await?;
        self.stack.start_advertising(SERVICE_UUID).await?;

        self.monitor.begin_advertising();
        info!("BLE initialized as '{}' (service {})", DEVICE_NAME, SERVICE_UUID);
        Ok(())
    }

    async fn transmit(&mut self, sentence: &[u8]) -> Delivery {
        if !self.monitor.is_connected() {
            trace!("No BLE peer, skipping {} bytes", sentence.len());
            return Delivery::Skipped;
        }

        match self.stack.notify(sentence).await {
            Ok(()) => {
                debug!("Notified {} bytes", sentence.len());
                Delivery::Sent
            }
            Err(e) => {
                debug!("Notification dropped: {}", e);
                Delivery::Dropped
            }
        }
    }

    fn link_status(&self) -> LinkStatus {
        self.monitor.status()
    }
}

/// Stand-in stack for builds without a BLE backend; every setup fails
#[cfg(not(feature = "bluez"))]
#[derive(Debug, Default)]
pub struct UnavailableStack;

#[cfg(not(feature = "bluez"))]
#[async_trait]
impl GattStack for UnavailableStack {
    async fn init(&mut self, _device_name: &str, _mtu: u16) -> Result<()> {
        Err(crate::error::TelemetryError::Ble(
            "built without a BLE backend (enable the `bluez` feature)".to_string(),
        ))
    }

    async fn configure_security(&mut self, _security: SecurityConfig) -> Result<()> {
        Ok(())
    }

    async fn register_service(
        &mut self,
        _service_uuid: &str,
        _characteristic_uuid: &str,
        _observer: Arc<dyn LinkObserver>,
    ) -> Result<()> {
        Ok(())
    }

    async fn start_advertising(&mut self, _service_uuid: &str) -> Result<()> {
        Ok(())
    }

    async fn notify(&mut self, _value: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// BLE transport on the backend compiled into this build
#[cfg(feature = "bluez")]
pub fn default_transport() -> BleTransport<bluez::BluezStack> {
    BleTransport::new(bluez::BluezStack::new())
}

/// BLE transport on the backend compiled into this build
#[cfg(not(feature = "bluez"))]
pub fn default_transport() -> BleTransport<UnavailableStack> {
    BleTransport::new(UnavailableStack)
}

#[cfg(test)]
mod tests {
    use super::stack::MockGattStack;
    use super::*;
    use crate::error::TelemetryError;
    use crate::link::ReconnectAction;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::sync::Mutex;

    const SENTENCE: &[u8] = b"$LK8EX1,999999,120,-50,99,3.7*0E\r\n";

    /// Mock that accepts every setup step and hands out the registered observer
    fn ready_stack(observer_slot: Arc<Mutex<Option<Arc<dyn LinkObserver>>>>) -> MockGattStack {
        let mut stack = MockGattStack::new();
        stack.expect_init().returning(|_, _| Ok(()));
        stack.expect_configure_security().returning(|_| Ok(()));
        stack
            .expect_register_service()
            .returning(move |_, _, observer| {
                *observer_slot.lock().unwrap() = Some(observer);
                Ok(())
            });
        stack.expect_start_advertising().returning(|_| Ok(()));
        stack
    }

    #[tokio::test]
    async fn test_setup_sequence() {
        let mut seq = Sequence::new();
        let mut stack = MockGattStack::new();

        stack
            .expect_init()
            .withf(|name, mtu| name == DEVICE_NAME && *mtu == PREFERRED_MTU)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        stack
            .expect_configure_security()
            .with(eq(SECURITY))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        stack
            .expect_register_service()
            .withf(|service, characteristic, _| {
                service == SERVICE_UUID && characteristic == CHARACTERISTIC_UUID
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        stack
            .expect_start_advertising()
            .withf(|service| service == SERVICE_UUID)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut transport = BleTransport::new(stack);
        assert_eq!(transport.link_status(), LinkStatus::Disconnected);

        transport.setup().await.unwrap();
        assert_eq!(transport.link_status(), LinkStatus::Advertising);
    }

    #[tokio::test]
    async fn test_setup_failure_is_reported() {
        let mut stack = MockGattStack::new();
        stack
            .expect_init()
            .returning(|_, _| Err(TelemetryError::Ble("adapter missing".to_string())));
        stack.expect_start_advertising().never();

        let mut transport = BleTransport::new(stack);
        let result = transport.setup().await;

        assert!(matches!(result, Err(TelemetryError::Ble(_))));
        assert_eq!(transport.link_status(), LinkStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_transmit_while_disconnected_never_notifies() {
        let mut stack = MockGattStack::new();
        stack.expect_notify().never();

        let mut transport = BleTransport::new(stack);
        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Skipped);
    }

    #[tokio::test]
    async fn test_transmit_while_advertising_never_notifies() {
        let slot = Arc::new(Mutex::new(None));
        let mut stack = ready_stack(slot.clone());
        stack.expect_notify().never();

        let mut transport = BleTransport::new(stack);
        transport.setup().await.unwrap();

        assert_eq!(transport.link_status(), LinkStatus::Advertising);
        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Skipped);
        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Skipped);
    }

    #[tokio::test]
    async fn test_transmit_while_connected_notifies_once_per_call() {
        let slot = Arc::new(Mutex::new(None));
        let mut stack = ready_stack(slot.clone());
        stack
            .expect_notify()
            .withf(|value| value == SENTENCE)
            .times(2)
            .returning(|_| Ok(()));

        let mut transport = BleTransport::new(stack);
        transport.setup().await.unwrap();

        let observer = slot.lock().unwrap().clone().unwrap();
        observer.peer_connected();

        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Sent);
        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_disconnect_returns_to_advertising() {
        let slot = Arc::new(Mutex::new(None));
        let mut stack = ready_stack(slot.clone());
        stack.expect_notify().times(1).returning(|_| Ok(()));

        let mut transport = BleTransport::new(stack);
        transport.setup().await.unwrap();
        let observer = slot.lock().unwrap().clone().unwrap();

        observer.peer_connected();
        assert_eq!(transport.link_status(), LinkStatus::Connected);

        assert_eq!(observer.peer_disconnected(), ReconnectAction::Advertise);
        assert_eq!(transport.link_status(), LinkStatus::Advertising);
        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Skipped);

        observer.peer_connected();
        assert_eq!(transport.link_status(), LinkStatus::Connected);
        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_notify_failure_is_silent() {
        let slot = Arc::new(Mutex::new(None));
        let mut stack = ready_stack(slot.clone());
        stack
            .expect_notify()
            .times(1)
            .returning(|_| Err(TelemetryError::Ble("queue full".to_string())));

        let mut transport = BleTransport::new(stack);
        transport.setup().await.unwrap();
        slot.lock().unwrap().clone().unwrap().peer_connected();

        assert_eq!(transport.transmit(SENTENCE).await, Delivery::Dropped);
        // No retry, link state untouched
        assert_eq!(transport.link_status(), LinkStatus::Connected);
    }

    #[test]
    fn test_security_prompts_display_passkey_only() {
        let prompts = SECURITY.io_capability.pairing_prompts();

        assert!(prompts.display);
        assert!(!prompts.keyboard);
        assert!(!prompts.confirm);
        assert!(SECURITY.requires_authenticated_peer());
    }

    #[test]
    fn test_identity_constants() {
        assert_eq!(DEVICE_NAME, "ESP32-BT-Vario");
        assert_eq!(PREFERRED_MTU, 512);
        assert_eq!(SECURITY.passkey, 123456);
        assert!(SECURITY.bonding);
        assert_eq!(SECURITY.io_capability, IoCapability::DisplayOnly);
        assert_ne!(SERVICE_UUID, CHARACTERISTIC_UUID);
    }

    #[cfg(not(feature = "bluez"))]
    #[test]
    fn test_default_transport_without_backend_fails_setup() {
        let mut transport = default_transport();
        let result = tokio_test::block_on(transport.setup());

        assert!(matches!(result, Err(TelemetryError::Ble(_))));
        assert_eq!(transport.link_status(), LinkStatus::Disconnected);
    }
}
