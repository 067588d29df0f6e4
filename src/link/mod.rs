//! # Link State Module
//!
//! Tracks whether a peer is listening on the telemetry link.
//!
//! The wireless stack reports connects and disconnects from its own context
//! while the broadcast loop reads the state before every transmit, so the
//! state lives in an atomic shared between both sides. Only the two
//! [`LinkObserver`] events (plus the one-off move to advertising after
//! setup) change it.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

/// Connection status of the telemetry link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkStatus {
    /// No peer and not discoverable
    Disconnected = 0,
    /// Discoverable, waiting for a peer
    Advertising = 1,
    /// A peer is listening
    Connected = 2,
}

impl LinkStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LinkStatus::Advertising,
            2 => LinkStatus::Connected,
            _ => LinkStatus::Disconnected,
        }
    }

    /// Whether a peer is listening
    pub fn is_connected(self) -> bool {
        self == LinkStatus::Connected
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkStatus::Disconnected => "disconnected",
            LinkStatus::Advertising => "advertising",
            LinkStatus::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// What the stack should do after a peer has dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Restart advertising so a new peer can connect
    Advertise,
    /// Nothing to do, the peer reopens the channel
    WaitForPeer,
}

/// How a link recovers from a dropped peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Wireless: go back to advertising
    Readvertise,
    /// Serial: stay disconnected until the channel is reopened
    AwaitReopen,
}

/// Connection events reported by the underlying stack
///
/// Called from the stack's own execution context. Implementations must not
/// block.
pub trait LinkObserver: Send + Sync {
    /// A peer connected or subscribed
    fn peer_connected(&self);

    /// The peer went away. The stack carries out the returned action.
    fn peer_disconnected(&self) -> ReconnectAction;
}

/// Link state owned by a transport and updated through [`LinkObserver`]
///
/// Starts [`Disconnected`](LinkStatus::Disconnected).
#[derive(Debug)]
pub struct LinkMonitor {
    status: AtomicU8,
    policy: ReconnectPolicy,
}

impl LinkMonitor {
    /// Shared monitor starting Disconnected, recovering per `policy`
    pub fn new(policy: ReconnectPolicy) -> Arc<Self> {
        Arc::new(Self {
            status: AtomicU8::new(LinkStatus::Disconnected as u8),
            policy,
        })
    }

    /// Current link status
    pub fn status(&self) -> LinkStatus {
        LinkStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Enter discoverability once setup has completed
    ///
    /// Has no effect if a peer connected in the meantime.
    pub fn begin_advertising(&self) {
        let result = self.status.compare_exchange(
            LinkStatus::Disconnected as u8,
            LinkStatus::Advertising as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if result.is_ok() {
            info!("Link advertising");
        }
    }

    fn transition(&self, next: LinkStatus) -> LinkStatus {
        LinkStatus::from_u8(self.status.swap(next as u8, Ordering::AcqRel))
    }
}

impl LinkObserver for LinkMonitor {
    fn peer_connected(&self) {
        let previous = self.transition(LinkStatus::Connected);
        if previous == LinkStatus::Connected {
            debug!("Peer connect reported while already connected");
        } else {
            info!("Peer connected (was {})", previous);
        }
    }

    fn peer_disconnected(&self) -> ReconnectAction {
        let (next, action) = match self.policy {
            ReconnectPolicy::Readvertise => (LinkStatus::Advertising, ReconnectAction::Advertise),
            ReconnectPolicy::AwaitReopen => {
                (LinkStatus::Disconnected, ReconnectAction::WaitForPeer)
            }
        };

        let previous = self.transition(next);
        info!("Peer disconnected (was {}, now {})", previous, next);
        action
    }
}
