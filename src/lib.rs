//! I/O Panel
//!
//! Drives a digital I/O controller over a serial line: 16 output lines are
//! written and 16 input lines read back in one combined poll frame.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions (interfaces) for the serial transport
//! - `protocol/` - Frame codec and the per-cycle exchange (pure logic over a port)
//! - `adapters/` - Implementations of ports (serialport, simulated device)
//! - `worker` - Background poll thread and its event channel
//! - `panel` - Operator-side controller: switches, indicators, connect/disconnect
//! - `commands/` - Command handlers (driving adapters) used by the front end

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;
pub mod protocol;

// Adapters (external I/O)
pub mod adapters;

// Engine and controller
pub mod panel;
pub mod worker;

// Front-end integration
pub mod commands;

pub use panel::PanelController;
pub use worker::{ProtocolWorker, SessionEvent, SessionId, WorkerEvent};
