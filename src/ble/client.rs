//! Per-connection GATT client state machine.
//!
//! A slot moves through:
//!
//! ```text
//! Idle -> DiscoveringServices -> EnablingNotifications -> Running
//!                 \                       |    ^
//!                  \                      |    | link secured
//!                   \                     v    | (after insufficient-security reject)
//!                    +-----------------> Error
//! ```
//!
//! The machine is pure: [`ClientSlot::on_event`] updates the slot and
//! returns at most one [`Action`] for the caller to carry out.  Responses to
//! an action always come back as a later event, never synchronously.

use crate::ble::discovery::ServiceHandles;
use crate::ble::{
    AttHandle, ConnHandle, DeviceIdentity, GattStatus, HvxKind, SecurityStatus, TimeoutSource,
};

/// Public view of a slot's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientState {
    Idle,
    DiscoveringServices,
    EnablingNotifications,
    Running,
    Error,
}

/// The peer a non-idle slot is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Link {
    pub identity: DeviceIdentity,
    pub conn: ConnHandle,
}

/// One connection-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientSlot {
    Idle,
    DiscoveringServices(Link),
    EnablingNotifications {
        link: Link,
        handles: ServiceHandles,
        /// The last CCCD write was refused for insufficient security and
        /// is waiting for the link to be secured.
        security_pending: bool,
    },
    Running {
        link: Link,
        handles: ServiceHandles,
    },
    Error(Link),
}

/// Input to the state machine, already resolved to this slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent<'a> {
    /// Discovery finished; `None` if the target characteristics are missing.
    DiscoveryComplete(Option<ServiceHandles>),
    WriteResponse {
        handle: AttHandle,
        status: GattStatus,
    },
    Notification {
        handle: AttHandle,
        kind: HvxKind,
        data: &'a [u8],
    },
    Timeout(TimeoutSource),
    SecurityStatusChanged(SecurityStatus),
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Write-request the notification-enable value to `cccd`.
    EnableNotifications { conn: ConnHandle, cccd: AttHandle },
    /// Ask the bonding subsystem to secure the peer's link.
    RequestSecurity(DeviceIdentity),
    /// Hand a notification value to the application sink.
    Deliver { value: u8, kind: HvxKind },
}

impl ClientSlot {
    /// A slot that has just been bound to a connection.
    pub const fn discovering(identity: DeviceIdentity, conn: ConnHandle) -> Self {
        ClientSlot::DiscoveringServices(Link { identity, conn })
    }

    pub fn state(&self) -> ClientState {
        match self {
            ClientSlot::Idle => ClientState::Idle,
            ClientSlot::DiscoveringServices(_) => ClientState::DiscoveringServices,
            ClientSlot::EnablingNotifications { .. } => ClientState::EnablingNotifications,
            ClientSlot::Running { .. } => ClientState::Running,
            ClientSlot::Error(_) => ClientState::Error,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ClientSlot::Idle)
    }

    pub fn link(&self) -> Option<&Link> {
        match self {
            ClientSlot::Idle => None,
            ClientSlot::DiscoveringServices(link)
            | ClientSlot::EnablingNotifications { link, .. }
            | ClientSlot::Running { link, .. }
            | ClientSlot::Error(link) => Some(link),
        }
    }

    pub fn connection(&self) -> Option<ConnHandle> {
        self.link().map(|l| l.conn)
    }

    /// Discovered handles, once discovery succeeded and while the slot is healthy.
    pub fn handles(&self) -> Option<&ServiceHandles> {
        match self {
            ClientSlot::EnablingNotifications { handles, .. } | ClientSlot::Running { handles, .. } => {
                Some(handles)
            }
            _ => None,
        }
    }

    /// Abandon the protocol sequence after a failed side effect.
    pub fn fail(&mut self) {
        if let Some(&link) = self.link() {
            *self = ClientSlot::Error(link);
        }
    }

    /// Feed one event into the machine.
    pub fn on_event(&mut self, event: ClientEvent<'_>) -> Option<Action> {
        let before = self.state();
        let (next, action) = core::mem::replace(self, ClientSlot::Idle).step(event);
        *self = next;

        let after = self.state();
        if before != after {
            debug!(
                "conn {:?}: {:?} -> {:?}",
                self.connection().map(|c| c.0),
                before,
                after
            );
        }
        action
    }

    fn step(self, event: ClientEvent<'_>) -> (Self, Option<Action>) {
        use ClientEvent as E;
        use ClientSlot as S;

        match (self, event) {
            (S::Idle, _) => (S::Idle, None),

            (S::DiscoveringServices(link), E::DiscoveryComplete(Some(handles))) => (
                S::EnablingNotifications {
                    link,
                    handles,
                    security_pending: false,
                },
                Some(Action::EnableNotifications {
                    conn: link.conn,
                    cccd: handles.cccd,
                }),
            ),
            (S::DiscoveringServices(link), E::DiscoveryComplete(None)) => {
                warn!("conn {}: peer service or characteristics missing", link.conn.0);
                (S::Error(link), None)
            }

            (S::EnablingNotifications { link, handles, .. }, E::WriteResponse { handle, status }) => {
                if handle != handles.cccd {
                    warn!(
                        "conn {}: write response for {} while expecting {}",
                        link.conn.0,
                        handle.0,
                        handles.cccd.0
                    );
                    (S::Error(link), None)
                } else if status.is_insufficient_security() {
                    info!("conn {}: CCCD write needs a secured link", link.conn.0);
                    (
                        S::EnablingNotifications {
                            link,
                            handles,
                            security_pending: true,
                        },
                        Some(Action::RequestSecurity(link.identity)),
                    )
                } else if status == GattStatus::Success {
                    (S::Running { link, handles }, None)
                } else {
                    warn!("conn {}: CCCD write failed: {:?}", link.conn.0, status);
                    (S::Error(link), None)
                }
            }

            (
                S::EnablingNotifications {
                    link,
                    handles,
                    security_pending,
                },
                E::SecurityStatusChanged(status),
            ) => match status {
                // Resend on every upgrade; the link may be secured before the
                // rejected write response arrives.
                SecurityStatus::Secured => (
                    S::EnablingNotifications {
                        link,
                        handles,
                        security_pending: false,
                    },
                    Some(Action::EnableNotifications {
                        conn: link.conn,
                        cccd: handles.cccd,
                    }),
                ),
                SecurityStatus::Failed(code) => {
                    warn!("conn {}: link security failed ({})", link.conn.0, code);
                    (
                        S::EnablingNotifications {
                            link,
                            handles,
                            security_pending,
                        },
                        None,
                    )
                }
            },

            (S::Running { link, handles }, E::Notification { handle, kind, data }) => {
                let action = match data {
                    [value] if handle == handles.data => Some(Action::Deliver { value: *value, kind }),
                    _ => {
                        // Treated as noise, not desynchronization.
                        trace!(
                            "conn {}: ignoring hvx on {} ({} bytes)",
                            link.conn.0,
                            handle.0,
                            data.len()
                        );
                        None
                    }
                };
                (S::Running { link, handles }, action)
            }

            (slot, E::Timeout(TimeoutSource::Protocol)) => match slot.link() {
                Some(&link) => {
                    warn!("conn {}: ATT protocol timeout", link.conn.0);
                    (S::Error(link), None)
                }
                None => (slot, None),
            },
            (slot, E::Timeout(TimeoutSource::Other(source))) => {
                trace!("ignoring non-protocol timeout (source {})", source);
                (slot, None)
            }

            (slot, _) => (slot, None),
        }
    }
}
