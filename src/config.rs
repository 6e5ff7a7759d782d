//! Application-wide constants and compile-time configuration.
//!
//! Table capacity, protocol constants and the peer service layout live
//! here so they can be tuned in one place.

// Connection table

/// Maximum number of simultaneously managed peer links.
///
/// Also the default capacity of [`crate::ble::router::Central`].
pub const MAX_CLIENTS: usize = 8;

/// Maximum number of characteristics a discovery walk reports for the
/// service of interest.
pub const MAX_DISCOVERED_CHARS: usize = 4;

// ATT

/// Largest notification payload carried by a transport event
/// (default ATT_MTU of 23 minus the 3-byte HVX header).
pub const ATT_PAYLOAD_MAX: usize = 20;

/// CCCD value enabling notifications (little-endian 0x0001).
pub const CCCD_ENABLE_NOTIFICATIONS: [u8; 2] = [0x01, 0x00];

// Peer LED Button Service
//
// The vendor base has to be registered with the stack's UUID table before
// discovery; the registration returns the base type passed to `Central::init`.

/// 128-bit vendor base UUID of the peer's LED Button Service (little-endian).
pub const LBS_PEER_UUID_BASE: [u8; 16] = [
    0x23, 0xD1, 0xBC, 0xEA, 0x5F, 0x78, 0x33, 0x15, 0xDE, 0xEF, 0x12, 0x12, 0x00, 0x00, 0x00, 0x00,
];

/// Service UUID (16-bit alias within the vendor base).
pub const LBS_PEER_SERVICE_UUID: u16 = 0x1533;

/// Button characteristic - the data characteristic that notifies.
pub const LBS_PEER_BUTTON_CHAR_UUID: u16 = 0x1534;

/// LED characteristic - the control point written with application data.
pub const LBS_PEER_LED_CHAR_UUID: u16 = 0x1535;

// Dispatch

/// Depth of the inbound event queue feeding the dispatch loop.
pub const EVENT_QUEUE_DEPTH: usize = 8;
