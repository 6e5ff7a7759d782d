//! Bluetooth Low Energy central subsystem.
//!
//! This module drives up to [`MAX_CLIENTS`](crate::config::MAX_CLIENTS)
//! peer links in **Central** role:
//!
//! 1. **Connection table** - fixed-capacity slots addressed by the bonded
//!    device's stable index, looked up by connection handle.
//! 2. **Discovery adapter** - starts the discovery walk and resolves the
//!    LED Button Service characteristics from its result.
//! 3. **Client state machine** - discover, enable notifications, run.
//! 4. **Router** - demultiplexes transport events to slots and forwards
//!    every event to the discovery engine.
//!
//! Collaborators (transport writes, bonding, the notification consumer)
//! are reached through the traits defined here.

pub mod client;
pub mod discovery;
pub mod dispatch;
pub mod router;
pub mod table;


use heapless::Vec;

use crate::config::ATT_PAYLOAD_MAX;
use crate::error::{GattError, SecurityError};

/// Transport-assigned connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// Attribute handle on the peer's GATT server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttHandle(pub u16);

/// Bonded-peer reference issued by the security subsystem.
///
/// Stable across reconnects.  `slot` is the connection-table index
/// reserved for this peer; `peer` is the bonding module's own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceIdentity {
    slot: u8,
    peer: u16,
}

impl DeviceIdentity {
    pub const fn new(slot: u8, peer: u16) -> Self {
        Self { slot, peer }
    }

    /// Index of the connection-table slot reserved for this peer.
    pub const fn slot_index(&self) -> usize {
        self.slot as usize
    }

    pub const fn peer(&self) -> u16 {
        self.peer
    }
}

/// Attribute UUID as reported by the discovery engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uuid {
    /// Bluetooth SIG assigned 16-bit UUID.
    Sig(u16),
    /// 16-bit alias inside a registered vendor base.
    /// `base` is the type returned by the stack when the base was registered.
    Vendor { base: u8, uuid: u16 },
}

/// ATT status carried by a write response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattStatus {
    Success,
    InsufficientAuthentication,
    InsufficientEncryption,
    /// Any other stack status code.
    Other(u16),
}

impl GattStatus {
    /// The write was refused until the link is secured.
    pub fn is_insufficient_security(&self) -> bool {
        matches!(
            self,
            GattStatus::InsufficientAuthentication | GattStatus::InsufficientEncryption
        )
    }
}

impl From<u16> for GattStatus {
    /// Maps SoftDevice GATT status codes (`0x0100 | ATT error`).
    fn from(code: u16) -> Self {
        match code {
            0x0000 => GattStatus::Success,
            0x0105 => GattStatus::InsufficientAuthentication,
            0x010F => GattStatus::InsufficientEncryption,
            other => GattStatus::Other(other),
        }
    }
}

/// Kind of server-initiated value push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HvxKind {
    Notification,
    Indication,
}

/// What expired when the transport reports a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutSource {
    /// ATT transaction timeout (30 s without a response).
    Protocol,
    /// Any other source; owned by the transport, not handled here.
    Other(u8),
}

/// Outcome of a link security procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityStatus {
    /// Bonding/encryption completed; the link is secured.
    Secured,
    /// The procedure failed with the given stack status.
    Failed(u8),
}

/// ATT write flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteOp {
    /// Write Request - acknowledged by a write response event.
    Request,
    /// Write Command - fire-and-forget.
    Command,
}

/// Inbound event from the transport, tagged with its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportEvent {
    pub conn: ConnHandle,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportEventKind {
    WriteResponse {
        handle: AttHandle,
        status: GattStatus,
    },
    Notification {
        handle: AttHandle,
        kind: HvxKind,
        data: Vec<u8, ATT_PAYLOAD_MAX>,
    },
    Timeout {
        source: TimeoutSource,
    },
    Disconnected,
    SecurityStatusChanged {
        status: SecurityStatus,
    },
}

impl TransportEvent {
    pub fn new(conn: ConnHandle, kind: TransportEventKind) -> Self {
        Self { conn, kind }
    }

    pub fn write_response(conn: ConnHandle, handle: AttHandle, status: GattStatus) -> Self {
        Self::new(conn, TransportEventKind::WriteResponse { handle, status })
    }

    /// Build a notification event.  Payloads longer than
    /// [`ATT_PAYLOAD_MAX`] are truncated.
    pub fn notification(conn: ConnHandle, handle: AttHandle, kind: HvxKind, data: &[u8]) -> Self {
        let data = data.get(..ATT_PAYLOAD_MAX).unwrap_or(data);
        let mut payload = Vec::new();
        // Cannot fail: the slice was clamped to the capacity above.
        let _ = payload.extend_from_slice(data);
        Self::new(
            conn,
            TransportEventKind::Notification {
                handle,
                kind,
                data: payload,
            },
        )
    }

    pub fn timeout(conn: ConnHandle, source: TimeoutSource) -> Self {
        Self::new(conn, TransportEventKind::Timeout { source })
    }

    pub fn disconnected(conn: ConnHandle) -> Self {
        Self::new(conn, TransportEventKind::Disconnected)
    }

    pub fn security_changed(conn: ConnHandle, status: SecurityStatus) -> Self {
        Self::new(conn, TransportEventKind::SecurityStatusChanged { status })
    }
}

/// Outbound attribute writes, implemented by the transport.
///
/// Writes only enqueue; for [`WriteOp::Request`] the outcome arrives later
/// as a [`TransportEventKind::WriteResponse`].  Implementations must not
/// deliver that response from inside this call.
pub trait GattClient {
    fn write(
        &mut self,
        conn: ConnHandle,
        op: WriteOp,
        handle: AttHandle,
        value: &[u8],
    ) -> Result<(), GattError>;
}

/// Link security upgrades, implemented by the bonding subsystem.
///
/// Completion is reported as a
/// [`TransportEventKind::SecurityStatusChanged`] on the peer's connection.
pub trait SecurityManager {
    fn request_upgrade(&mut self, identity: DeviceIdentity) -> Result<(), SecurityError>;
}

/// Application consumer of notification values.
///
/// Called synchronously from event dispatch; must not block.
pub trait NotificationSink {
    fn on_notification(&mut self, value: u8, kind: HvxKind);
}

impl<F> NotificationSink for F
where
    F: FnMut(u8, HvxKind),
{
    fn on_notification(&mut self, value: u8, kind: HvxKind) {
        self(value, kind)
    }
}
