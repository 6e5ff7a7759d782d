//! Serialized inbound event queue.
//!
//! Transport callbacks, the discovery engine and the connection manager
//! post [`Inbound`] events into an `embassy-sync` channel; a single task
//! drains it through [`Central::run`].  Events are processed one at a
//! time in arrival order, so a handler can never be re-entered by a
//! response it triggered.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver};

use crate::ble::discovery::{DiscoveryEngine, DiscoveryOutcome};
use crate::ble::router::Central;
use crate::ble::{
    ConnHandle, DeviceIdentity, GattClient, NotificationSink, SecurityManager, TransportEvent,
};
use crate::config::EVENT_QUEUE_DEPTH;
use crate::indicator::SlotIndicator;

/// Everything the central reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Inbound {
    /// A managed (bonded) peer connected.
    Connected {
        identity: DeviceIdentity,
        conn: ConnHandle,
    },
    Transport(TransportEvent),
    Discovery(DiscoveryOutcome),
}

/// Queue type with the default depth.
pub type EventQueue<M> = Channel<M, Inbound, EVENT_QUEUE_DEPTH>;

impl<G, D, S, K, I, const N: usize> Central<G, D, S, K, I, N>
where
    G: GattClient,
    D: DiscoveryEngine,
    S: SecurityManager,
    K: NotificationSink,
    I: SlotIndicator,
{
    /// Synchronous single entry point for inbound events.
    pub fn handle(&mut self, inbound: &Inbound) {
        match inbound {
            Inbound::Connected { identity, conn } => {
                if let Err(e) = self.create(*identity, *conn) {
                    error!("conn {}: create failed: {:?}", conn.0, e);
                }
            }
            Inbound::Transport(event) => self.dispatch(event),
            Inbound::Discovery(outcome) => self.on_discovery_complete(outcome),
        }
    }

    /// Wait for and handle the next queued event.
    pub async fn process_next<M: RawMutex, const Q: usize>(
        &mut self,
        rx: &Receiver<'_, M, Inbound, Q>,
    ) {
        let inbound = rx.receive().await;
        self.handle(&inbound);
    }

    /// Drain the queue forever.
    pub async fn run<M: RawMutex, const Q: usize>(&mut self, rx: Receiver<'_, M, Inbound, Q>) -> ! {
        info!("central dispatch loop started");
        loop {
            self.process_next(&rx).await;
        }
    }
}
