//! BlueZ GATT backend on top of `bluer`
//!
//! A notification session started by the peer counts as a connect. A
//! session that has stopped, or a notify that fails, counts as a
//! disconnect; it is noticed on the next notify.
//!
//! BlueZ picks the pairing method from the agent's IO capability, which
//! bluer derives from the callbacks the agent sets. With a display-only
//! agent the daemon generates the passkey and the agent shows it; a fixed
//! passkey is only handed out when the capability includes a keyboard.
//! MITM and Secure Connections are enforced by the kernel SMP layer
//! (`bluetoothd` `main.conf`), not per application.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::agent::{
    Agent, AgentHandle, DisplayPasskey, DisplayPinCode, ReqResult, RequestConfirmation,
    RequestPasskey, RequestPinCode,
};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, Service,
};
use bluer::{Adapter, Session, Uuid};
use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use super::stack::{GattStack, SecurityConfig};
use super::SECURITY;
use crate::error::{Result, TelemetryError};
use crate::link::{LinkObserver, ReconnectAction};

fn ble_err(e: bluer::Error) -> TelemetryError {
    TelemetryError::Ble(e.to_string())
}

fn parse_uuid(uuid: &str) -> Result<Uuid> {
    Uuid::parse_str(uuid).map_err(|e| TelemetryError::Ble(format!("Invalid UUID {}: {}", uuid, e)))
}

/// Agent offering exactly the prompts of the configured IO capability
fn build_agent(security: &SecurityConfig) -> Agent {
    let prompts = security.io_capability.pairing_prompts();
    let passkey = security.passkey;
    let mut agent = Agent {
        request_default: true,
        ..Default::default()
    };

    if prompts.display {
        agent.display_passkey = Some(Box::new(|req: DisplayPasskey| {
            async move {
                info!("Pairing with {}: passkey {:06}", req.device, req.passkey);
                ReqResult::Ok(())
            }
            .boxed()
        }));
        agent.display_pin_code = Some(Box::new(|req: DisplayPinCode| {
            async move {
                info!("Pairing with {}: PIN {}", req.device, req.pincode);
                ReqResult::Ok(())
            }
            .boxed()
        }));
    }

    if prompts.keyboard {
        agent.request_passkey = Some(Box::new(move |_req: RequestPasskey| {
            async move { ReqResult::Ok(passkey) }.boxed()
        }));
        agent.request_pin_code = Some(Box::new(move |_req: RequestPinCode| {
            async move { ReqResult::Ok(format!("{:06}", passkey)) }.boxed()
        }));
    }

    if prompts.confirm {
        // Numeric comparison: the same value is shown on the peer
        agent.request_confirmation = Some(Box::new(|req: RequestConfirmation| {
            async move {
                info!("Pairing with {}: confirm passkey {:06}", req.device, req.passkey);
                ReqResult::Ok(())
            }
            .boxed()
        }));
    }

    agent
}

/// Whether any connected device has completed pairing
async fn paired_peer_connected(adapter: &Adapter) -> bool {
    let addresses = match adapter.device_addresses().await {
        Ok(addresses) => addresses,
        Err(e) => {
            warn!("Cannot list devices: {}", e);
            return false;
        }
    };

    for address in addresses {
        let Ok(device) = adapter.device(address) else {
            continue;
        };
        let connected = device.is_connected().await.unwrap_or(false);
        let paired = device.is_paired().await.unwrap_or(false);
        if connected && paired {
            return true;
        }
    }
    false
}

/// GATT peripheral on the default BlueZ adapter
#[derive(Default)]
pub struct BluezStack {
    session: Option<Session>,
    adapter: Option<Adapter>,
    device_name: String,
    service_uuid: Option<Uuid>,
    security: Option<SecurityConfig>,
    agent: Option<AgentHandle>,
    application: Option<ApplicationHandle>,
    advertisement: Option<AdvertisementHandle>,
    notifier: Arc<tokio::sync::Mutex<Option<CharacteristicNotifier>>>,
    value: Arc<Mutex<Vec<u8>>>,
    observer: Option<Arc<dyn LinkObserver>>,
}

impl std::fmt::Debug for BluezStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BluezStack")
            .field("device_name", &self.device_name)
            .field("advertising", &self.advertisement.is_some())
            .finish_non_exhaustive()
    }
}

impl BluezStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn adapter(&self) -> Result<&Adapter> {
        self.adapter
            .as_ref()
            .ok_or_else(|| TelemetryError::Ble("stack not initialized".to_string()))
    }

    async fn advertise(&mut self, service_uuid: Uuid) -> Result<()> {
        // Unregister the previous advertisement before registering a new one
        self.advertisement = None;

        let advertisement = Advertisement {
            service_uuids: [service_uuid].into_iter().collect(),
            discoverable: Some(true),
            local_name: Some(self.device_name.clone()),
            ..Default::default()
        };

        let handle = self.adapter()?.advertise(advertisement).await.map_err(ble_err)?;
        self.advertisement = Some(handle);
        Ok(())
    }

    async fn peer_lost(&mut self) {
        let Some(observer) = self.observer.clone() else {
            return;
        };

        if observer.peer_disconnected() == ReconnectAction::Advertise {
            if let Some(service_uuid) = self.service_uuid {
                if let Err(e) = self.advertise(service_uuid).await {
                    error!("Failed to restart advertising: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl GattStack for BluezStack {
    async fn init(&mut self, device_name: &str, mtu: u16) -> Result<()> {
        let session = Session::new().await.map_err(ble_err)?;
        let adapter = session.default_adapter().await.map_err(ble_err)?;

        adapter.set_powered(true).await.map_err(ble_err)?;
        adapter
            .set_alias(device_name.to_string())
            .await
            .map_err(ble_err)?;

        // BlueZ negotiates the ATT MTU per connection up to its own maximum
        debug!("Requested ATT MTU {} on {}", mtu, adapter.name());

        self.device_name = device_name.to_string();
        self.session = Some(session);
        self.adapter = Some(adapter);
        Ok(())
    }

    async fn configure_security(&mut self, security: SecurityConfig) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| TelemetryError::Ble("stack not initialized".to_string()))?;

        let agent = session
            .register_agent(build_agent(&security))
            .await
            .map_err(ble_err)?;
        self.agent = Some(agent);

        let adapter = self.adapter()?;
        adapter.set_pairable(security.bonding).await.map_err(ble_err)?;
        if security.bonding {
            // Stay pairable for as long as the instrument runs
            adapter.set_pairable_timeout(0).await.map_err(ble_err)?;
        }

        debug!(
            "Security: bonding={} mitm={} sc={} io={:?}",
            security.bonding, security.mitm, security.secure_connections, security.io_capability
        );
        self.security = Some(security);
        Ok(())
    }

    async fn register_service(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        observer: Arc<dyn LinkObserver>,
    ) -> Result<()> {
        let service_uuid = parse_uuid(service_uuid)?;
        let characteristic_uuid = parse_uuid(characteristic_uuid)?;

        let security = self.security.unwrap_or(SECURITY);
        let value = self.value.clone();
        let read = CharacteristicRead {
            read: true,
            encrypt_read: true,
            encrypt_authenticated_read: security.mitm,
            secure_read: security.secure_connections,
            fun: Box::new(move |_req| {
                let value = value.lock().unwrap_or_else(PoisonError::into_inner).clone();
                async move { Ok(value) }.boxed()
            }),
            ..Default::default()
        };

        let slot = self.notifier.clone();
        let session_observer = observer.clone();
        let adapter = self.adapter()?.clone();
        let require_pairing = security.requires_authenticated_peer();
        let notify = CharacteristicNotify {
            notify: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
                let slot = slot.clone();
                let observer = session_observer.clone();
                let adapter = adapter.clone();
                async move {
                    if require_pairing && !paired_peer_connected(&adapter).await {
                        // Dropping the notifier ends the session
                        warn!("Rejecting notification session from an unpaired peer");
                        return;
                    }
                    *slot.lock().await = Some(notifier);
                    observer.peer_connected();
                }
                .boxed()
            })),
            ..Default::default()
        };

        let application = Application {
            services: vec![Service {
                uuid: service_uuid,
                primary: true,
                characteristics: vec![Characteristic {
                    uuid: characteristic_uuid,
                    read: Some(read),
                    notify: Some(notify),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let handle = self
            .adapter()?
            .serve_gatt_application(application)
            .await
            .map_err(ble_err)?;

        self.application = Some(handle);
        self.service_uuid = Some(service_uuid);
        self.observer = Some(observer);
        Ok(())
    }

    async fn start_advertising(&mut self, service_uuid: &str) -> Result<()> {
        let service_uuid = parse_uuid(service_uuid)?;
        self.advertise(service_uuid).await
    }

    async fn notify(&mut self, value: &[u8]) -> Result<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value.to_vec();

        let slot = self.notifier.clone();
        let mut session = slot.lock().await;
        let result = match session.as_mut() {
            Some(notifier) if !notifier.is_stopped() => {
                notifier.notify(value.to_vec()).await.map_err(ble_err)
            }
            Some(_) => Err(TelemetryError::Ble("notification session stopped".to_string())),
            None => Err(TelemetryError::Ble("no notification session".to_string())),
        };

        if result.is_err() && session.take().is_some() {
            drop(session);
            warn!("Notification session ended");
            self.peer_lost().await;
        }

        result
    }
}
