//! Trait abstraction for the BLE GATT stack to enable testing

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::link::LinkObserver;

/// IO capability announced during pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    NoInputNoOutput,
}

/// Pairing prompts an agent has to offer to announce an [`IoCapability`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairingPrompts {
    /// Show a passkey or PIN to the user
    pub display: bool,
    /// Let the user type a passkey or PIN
    pub keyboard: bool,
    /// Ask the user to confirm a numeric comparison
    pub confirm: bool,
}

impl IoCapability {
    /// Prompts matching this capability and no others
    pub fn pairing_prompts(self) -> PairingPrompts {
        match self {
            IoCapability::DisplayOnly => PairingPrompts {
                display: true,
                ..PairingPrompts::default()
            },
            IoCapability::DisplayYesNo => PairingPrompts {
                display: true,
                confirm: true,
                ..PairingPrompts::default()
            },
            IoCapability::KeyboardOnly => PairingPrompts {
                keyboard: true,
                ..PairingPrompts::default()
            },
            IoCapability::NoInputNoOutput => PairingPrompts::default(),
        }
    }
}

/// Link security posture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Store keys so the peer can reconnect without pairing again
    pub bonding: bool,
    /// Require man-in-the-middle protection (passkey entry)
    pub mitm: bool,
    /// Require LE Secure Connections
    pub secure_connections: bool,
    /// Fixed 6-digit passkey shown to the user
    pub passkey: u32,
    pub io_capability: IoCapability,
}

impl SecurityConfig {
    /// Whether telemetry may only flow to a peer that completed pairing
    pub fn requires_authenticated_peer(&self) -> bool {
        self.mitm || self.bonding
    }
}

/// Operations the BLE transport needs from a GATT peripheral stack
///
/// Setup calls run once, in order: [`init`](Self::init),
/// [`configure_security`](Self::configure_security),
/// [`register_service`](Self::register_service),
/// [`start_advertising`](Self::start_advertising).
///
/// The stack reports connects and disconnects to the observer handed to
/// `register_service`. After a disconnect it must carry out the
/// [`ReconnectAction`](crate::link::ReconnectAction) the observer returns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GattStack: Send {
    /// Bring the stack up under `device_name`, requesting `mtu` bytes per ATT packet
    async fn init(&mut self, device_name: &str, mtu: u16) -> Result<()>;

    /// Apply pairing and bonding requirements
    async fn configure_security(&mut self, security: SecurityConfig) -> Result<()>;

    /// Create the service with one read + notify characteristic
    async fn register_service(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        observer: Arc<dyn LinkObserver>,
    ) -> Result<()>;

    /// Start advertising `service_uuid`
    async fn start_advertising(&mut self, service_uuid: &str) -> Result<()>;

    /// Set the characteristic value and notify the subscribed peer
    async fn notify(&mut self, value: &[u8]) -> Result<()>;
}
