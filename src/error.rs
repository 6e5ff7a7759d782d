//! Unified error type for lbs-central.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for on-target
//! logging.

/// Top-level error type returned by the lifecycle API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Connection table
    /// The slot addressed by the device identity is already in use, or the
    /// identity addresses a slot beyond the table capacity.
    AlreadyAtCapacity,

    /// The slot addressed by the device identity is idle.
    NotConnected,

    /// Another live slot already holds this connection handle.
    DuplicateConnection,

    /// No managed slot holds this connection handle.
    UnknownConnection,

    /// The peer's control-point characteristic was not discovered.
    CharacteristicUnresolved,

    // Collaborators
    /// The transport rejected an attribute write.
    Gatt(GattError),

    /// The discovery engine refused a request.
    Discovery(DiscoveryError),

    /// The security subsystem refused a request.
    Security(SecurityError),
}

/// Failure reported by the transport when issuing an attribute write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattError {
    /// Raw error code from the BLE stack.
    Raw(u32),
    /// The stack has no free transmit buffers.
    Busy,
    /// The connection handle is not (or no longer) valid.
    InvalidConnection,
}

/// Failure reported by the discovery engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryError {
    /// Raw error code from the discovery module.
    Raw(u32),
    /// A walk is already in progress for this connection.
    Busy,
    /// No room left to register another service.
    RegistrationFull,
}

/// Failure reported by the security/bonding subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityError {
    /// Raw error code from the bonding module.
    Raw(u32),
    /// A security procedure is already running on the link.
    Busy,
}

// Convenience conversions

impl From<GattError> for Error {
    fn from(e: GattError) -> Self {
        Error::Gatt(e)
    }
}

impl From<DiscoveryError> for Error {
    fn from(e: DiscoveryError) -> Self {
        Error::Discovery(e)
    }
}

impl From<SecurityError> for Error {
    fn from(e: SecurityError) -> Self {
        Error::Security(e)
    }
}
