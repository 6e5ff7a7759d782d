//! Event router and owned central context.
//!
//! [`Central`] owns the connection table and every collaborator.  All
//! entry points take `&mut self`, so dispatch is serialized by the borrow
//! checker; there is no global state.
//!
//! Each transport event is seen by two observers in a fixed order: the
//! client state machine of the slot owning the connection (if any), then
//! the discovery engine, which tracks its own sub-protocol on every
//! connection.

use crate::ble::client::{Action, ClientEvent, ClientState};
use crate::ble::discovery::{DiscoveryAdapter, DiscoveryEngine, DiscoveryOutcome};
use crate::ble::table::ClientTable;
use crate::ble::{
    ConnHandle, DeviceIdentity, GattClient, NotificationSink, SecurityManager, TransportEvent,
    TransportEventKind, WriteOp,
};
use crate::config::{CCCD_ENABLE_NOTIFICATIONS, MAX_CLIENTS};
use crate::error::Error;
use crate::indicator::SlotIndicator;

pub struct Central<G, D, S, K, I, const N: usize = MAX_CLIENTS> {
    table: ClientTable<N>,
    discovery: DiscoveryAdapter<D>,
    gatt: G,
    security: S,
    sink: K,
    indicators: I,
}

impl<G, D, S, K, I, const N: usize> Central<G, D, S, K, I, N>
where
    G: GattClient,
    D: DiscoveryEngine,
    S: SecurityManager,
    K: NotificationSink,
    I: SlotIndicator,
{
    /// Build an empty table and register the peer service with the
    /// discovery engine.
    ///
    /// `vendor_base` is the UUID type the stack assigned when
    /// [`LBS_PEER_UUID_BASE`](crate::config::LBS_PEER_UUID_BASE) was registered.
    pub fn init(
        gatt: G,
        discovery: D,
        security: S,
        sink: K,
        indicators: I,
        vendor_base: u8,
    ) -> Result<Self, Error> {
        let discovery = DiscoveryAdapter::init(discovery, vendor_base)?;
        info!("central ready ({} slots)", N);
        Ok(Self {
            table: ClientTable::new(),
            discovery,
            gatt,
            security,
            sink,
            indicators,
        })
    }

    // Lifecycle

    /// Bind the identity's slot to a new connection and start discovery.
    ///
    /// If the discovery engine refuses the walk the slot is released again
    /// and the error is returned.
    pub fn create(&mut self, identity: DeviceIdentity, conn: ConnHandle) -> Result<usize, Error> {
        let index = self.table.create(identity, conn)?;

        if let Err(e) = self.discovery.start(conn) {
            error!("slot {}: discovery start failed: {:?}", index, e);
            self.table.destroy(identity)?;
            return Err(e.into());
        }

        info!(
            "slot {}: peer {} on conn {}, discovering ({} active)",
            index,
            identity.peer(),
            conn.0,
            self.table.count()
        );
        Ok(index)
    }

    /// Release the identity's slot, abandoning any in-flight exchange.
    pub fn destroy(&mut self, identity: DeviceIdentity) -> Result<(), Error> {
        let index = self.table.destroy(identity)?;
        self.indicators.release(index);
        info!("slot {}: destroyed ({} active)", index, self.table.count());
        Ok(())
    }

    pub fn count(&self) -> u8 {
        self.table.count()
    }

    pub fn state(&self, index: usize) -> ClientState {
        self.table.state(index)
    }

    pub fn slot_for_connection(&self, conn: ConnHandle) -> Option<usize> {
        self.table.find_by_connection(conn)
    }

    /// Read-only view of the connection table.
    pub fn table(&self) -> &ClientTable<N> {
        &self.table
    }

    /// Write `value` to the peer's control-point characteristic without
    /// waiting for a response.
    pub fn write_data(&mut self, conn: ConnHandle, value: u8) -> Result<(), Error> {
        let index = self
            .table
            .find_by_connection(conn)
            .ok_or(Error::UnknownConnection)?;
        let handle = self
            .table
            .slot(index)
            .and_then(|slot| slot.handles())
            .and_then(|handles| handles.control_point)
            .ok_or(Error::CharacteristicUnresolved)?;

        self.gatt.write(conn, WriteOp::Command, handle, &[value])?;
        Ok(())
    }

    /// Write `value` to every running peer that exposes a control point.
    ///
    /// Returns the number of peers the write was queued for.
    pub fn broadcast_data(&mut self, value: u8) -> usize {
        let mut sent = 0;
        for index in 0..N {
            let Some(slot) = self.table.slot(index) else {
                continue;
            };
            if slot.state() != ClientState::Running {
                continue;
            }
            let (Some(conn), Some(handle)) = (
                slot.connection(),
                slot.handles().and_then(|h| h.control_point),
            ) else {
                continue;
            };

            match self.gatt.write(conn, WriteOp::Command, handle, &[value]) {
                Ok(()) => sent += 1,
                Err(e) => warn!("slot {}: data write failed: {:?}", index, e),
            }
        }
        sent
    }

    // Dispatch

    /// Route one transport event.
    pub fn dispatch(&mut self, event: &TransportEvent) {
        match self.table.find_by_connection(event.conn) {
            Some(index) => self.dispatch_to_slot(index, event),
            None => trace!("conn {}: unmanaged, core ignores event", event.conn.0),
        }

        self.discovery.observe(event);
    }

    /// Deliver a discovery walk result.
    pub fn on_discovery_complete(&mut self, outcome: &DiscoveryOutcome) {
        let Some(index) = self.table.find_by_connection(outcome.conn) else {
            trace!("conn {}: discovery result for unmanaged connection", outcome.conn.0);
            return;
        };
        let handles = self.discovery.resolve(outcome);
        self.step(index, ClientEvent::DiscoveryComplete(handles));
    }

    fn dispatch_to_slot(&mut self, index: usize, event: &TransportEvent) {
        let client_event = match &event.kind {
            TransportEventKind::WriteResponse { handle, status } => ClientEvent::WriteResponse {
                handle: *handle,
                status: *status,
            },
            TransportEventKind::Notification { handle, kind, data } => ClientEvent::Notification {
                handle: *handle,
                kind: *kind,
                data: data.as_slice(),
            },
            TransportEventKind::Timeout { source } => ClientEvent::Timeout(*source),
            TransportEventKind::SecurityStatusChanged { status } => {
                ClientEvent::SecurityStatusChanged(*status)
            }
            TransportEventKind::Disconnected => {
                let identity = self.table.slot(index).and_then(|s| s.link()).map(|l| l.identity);
                if let Some(identity) = identity {
                    if let Err(e) = self.destroy(identity) {
                        error!("slot {}: destroy on disconnect failed: {:?}", index, e);
                    }
                }
                return;
            }
        };
        self.step(index, client_event);
    }

    fn step(&mut self, index: usize, event: ClientEvent<'_>) {
        let Some(slot) = self.table.slot_mut(index) else {
            return;
        };
        if let Some(action) = slot.on_event(event) {
            self.apply(index, action);
        }
    }

    fn apply(&mut self, index: usize, action: Action) {
        let result = match action {
            Action::EnableNotifications { conn, cccd } => {
                debug!("slot {}: enabling notifications via {}", index, cccd.0);
                self.gatt
                    .write(conn, WriteOp::Request, cccd, &CCCD_ENABLE_NOTIFICATIONS)
                    .map_err(Error::from)
            }
            Action::RequestSecurity(identity) => self
                .security
                .request_upgrade(identity)
                .map_err(Error::from),
            Action::Deliver { value, kind } => {
                self.sink.on_notification(value, kind);
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("slot {}: {:?} failed: {:?}", index, action, e);
            if let Some(slot) = self.table.slot_mut(index) {
                slot.fail();
            }
        }
    }

    // Collaborator access

    pub fn gatt(&self) -> &G {
        &self.gatt
    }

    pub fn gatt_mut(&mut self) -> &mut G {
        &mut self.gatt
    }

    pub fn security(&self) -> &S {
        &self.security
    }

    pub fn security_mut(&mut self) -> &mut S {
        &mut self.security
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn indicators(&self) -> &I {
        &self.indicators
    }

    pub fn discovery(&self) -> &D {
        self.discovery.engine()
    }

    pub fn discovery_mut(&mut self) -> &mut D {
        self.discovery.engine_mut()
    }
}
