//! Discovery adapter - glue to the external GATT discovery engine.
//!
//! The engine walks the peer's attribute table on its own and reports the
//! characteristics of the registered service once per walk.  This module
//! only starts walks, forwards transport events the engine needs for its
//! internal sub-protocol, and resolves the handles the client needs from
//! the reported characteristic set.

use heapless::Vec;

use crate::ble::{AttHandle, ConnHandle, TransportEvent, Uuid};
use crate::config::{
    LBS_PEER_BUTTON_CHAR_UUID, LBS_PEER_LED_CHAR_UUID, LBS_PEER_SERVICE_UUID, MAX_DISCOVERED_CHARS,
};
use crate::error::DiscoveryError;

/// A characteristic reported by the discovery walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveredChar {
    pub uuid: Uuid,
    pub value_handle: AttHandle,
    /// Client Characteristic Configuration Descriptor, if the walk found one.
    pub cccd_handle: Option<AttHandle>,
}

/// Completion of one discovery walk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveryOutcome {
    pub conn: ConnHandle,
    /// `false` when the registered service is absent on the peer.
    pub found: bool,
    pub characteristics: Vec<DiscoveredChar, MAX_DISCOVERED_CHARS>,
}

impl DiscoveryOutcome {
    pub fn complete(conn: ConnHandle, characteristics: Vec<DiscoveredChar, MAX_DISCOVERED_CHARS>) -> Self {
        Self {
            conn,
            found: true,
            characteristics,
        }
    }

    pub fn not_found(conn: ConnHandle) -> Self {
        Self {
            conn,
            found: false,
            characteristics: Vec::new(),
        }
    }
}

/// Handles the client state machine works with after discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceHandles {
    /// CCCD of the data characteristic; written to enable notifications.
    pub cccd: AttHandle,
    /// Value handle of the data (button) characteristic.
    pub data: AttHandle,
    /// Value handle of the control-point (LED) characteristic, if present.
    pub control_point: Option<AttHandle>,
}

impl ServiceHandles {
    /// Pick the LED Button Service characteristics out of a walk result.
    ///
    /// The data characteristic and its CCCD are required.  The control
    /// point is optional.  UUIDs must carry the registered vendor `base`.
    pub fn resolve(outcome: &DiscoveryOutcome, base: u8) -> Option<Self> {
        if !outcome.found {
            return None;
        }

        let find = |uuid: u16| {
            outcome
                .characteristics
                .iter()
                .find(|c| c.uuid == Uuid::Vendor { base, uuid })
        };

        let data = find(LBS_PEER_BUTTON_CHAR_UUID)?;
        let cccd = data.cccd_handle?;
        let control_point = find(LBS_PEER_LED_CHAR_UUID).map(|c| c.value_handle);

        Some(Self {
            cccd,
            data: data.value_handle,
            control_point,
        })
    }
}

/// External service-discovery engine.
pub trait DiscoveryEngine {
    /// Register interest in a service; results for it are reported as
    /// [`DiscoveryOutcome`]s.
    fn register(&mut self, service: Uuid) -> Result<(), DiscoveryError>;

    /// Begin a walk on `conn`.  Completion is delivered later, never from
    /// inside this call.
    fn start(&mut self, conn: ConnHandle) -> Result<(), DiscoveryError>;

    /// Observe every transport event, managed connection or not.
    fn on_transport_event(&mut self, event: &TransportEvent);
}

/// Wraps the engine with the registered vendor base of the peer service.
pub struct DiscoveryAdapter<D> {
    engine: D,
    base: u8,
}

impl<D: DiscoveryEngine> DiscoveryAdapter<D> {
    /// Register the peer LED Button Service with `engine`.
    pub fn init(mut engine: D, base: u8) -> Result<Self, DiscoveryError> {
        engine.register(Uuid::Vendor {
            base,
            uuid: LBS_PEER_SERVICE_UUID,
        })?;
        Ok(Self { engine, base })
    }

    pub fn start(&mut self, conn: ConnHandle) -> Result<(), DiscoveryError> {
        self.engine.start(conn)
    }

    pub fn observe(&mut self, event: &TransportEvent) {
        self.engine.on_transport_event(event);
    }

    pub fn resolve(&self, outcome: &DiscoveryOutcome) -> Option<ServiceHandles> {
        ServiceHandles::resolve(outcome, self.base)
    }

    pub fn base(&self) -> u8 {
        self.base
    }

    pub fn engine(&self) -> &D {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut D {
        &mut self.engine
    }
}
