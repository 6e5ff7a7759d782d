//! Fixed-capacity connection table.
//!
//! One slot per bonded device, addressed by the identity's stable slot
//! index (not a free list).  Lookup by connection handle is a linear scan
//! over the table.

use crate::ble::client::{ClientSlot, ClientState};
use crate::ble::{ConnHandle, DeviceIdentity};
use crate::config::MAX_CLIENTS;
use crate::error::Error;

pub struct ClientTable<const N: usize = MAX_CLIENTS> {
    slots: [ClientSlot; N],
    count: u8,
}

impl<const N: usize> ClientTable<N> {
    // `count` is a u8.
    const CAPACITY_FITS_COUNT: () = assert!(N <= u8::MAX as usize, "table capacity exceeds 255");

    /// A table with every slot idle.
    pub const fn new() -> Self {
        let () = Self::CAPACITY_FITS_COUNT;
        Self {
            slots: [ClientSlot::Idle; N],
            count: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of non-idle slots.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Index of the live slot bound to `conn`.
    pub fn find_by_connection(&self, conn: ConnHandle) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.connection() == Some(conn))
    }

    /// Bind the identity's slot to `conn` in `DiscoveringServices`.
    ///
    /// Starting the discovery walk is up to the caller.
    pub fn create(&mut self, identity: DeviceIdentity, conn: ConnHandle) -> Result<usize, Error> {
        let index = identity.slot_index();
        match self.slots.get(index) {
            Some(slot) if slot.is_idle() => {}
            _ => return Err(Error::AlreadyAtCapacity),
        }
        if self.find_by_connection(conn).is_some() {
            return Err(Error::DuplicateConnection);
        }

        self.slots[index] = ClientSlot::discovering(identity, conn);
        self.count += 1;
        Ok(index)
    }

    /// Return the identity's slot to `Idle`.
    ///
    /// Rejects an already idle slot instead of treating it as a no-op.
    pub fn destroy(&mut self, identity: DeviceIdentity) -> Result<usize, Error> {
        let index = identity.slot_index();
        match self.slots.get_mut(index) {
            Some(slot) if !slot.is_idle() => *slot = ClientSlot::Idle,
            _ => return Err(Error::NotConnected),
        }
        self.count -= 1;
        Ok(index)
    }

    pub fn state(&self, index: usize) -> ClientState {
        self.slots
            .get(index)
            .map_or(ClientState::Idle, ClientSlot::state)
    }

    pub fn slot(&self, index: usize) -> Option<&ClientSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut ClientSlot> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ClientSlot)> {
        self.slots.iter().enumerate()
    }
}

impl<const N: usize> Default for ClientTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
