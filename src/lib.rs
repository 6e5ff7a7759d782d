//! Multi-link BLE central for the LED Button Service.
//!
//! For every bonded peripheral that connects, the central discovers the
//! peer's LED Button Service, enables notifications on its button
//! characteristic and forwards single-byte button states to an
//! application sink.  Links that need security before accepting the
//! CCCD write are resumed once the bonding subsystem secures them.
//!
//! The crate is `no_std` and allocation-free.  The radio stack, the
//! discovery engine and the bonding module are reached through the
//! traits in [`ble`]; everything is driven from one
//! [`Central`](ble::router::Central) context.
//!
//! Usage: `cargo test` runs the host tests.  Enable the `defmt` feature
//! on target or the `log` feature on the host to see log output.

#![cfg_attr(not(test), no_std)]

// Must stay first so the logging macros are visible to every module below.
mod fmt;

pub mod ble;
pub mod config;
pub mod error;
pub mod indicator;

pub use ble::dispatch::{EventQueue, Inbound};
pub use ble::router::Central;
pub use error::Error;
