//! Port traits (interfaces)
//!
//! These traits define the boundary between the protocol engine and external I/O.
//! Adapters implement these traits to connect to real hardware.

pub mod serial;

pub use serial::*;
