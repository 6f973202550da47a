//! Serial port traits
//!
//! Split into two traits:
//! - `SerialFactory`: lists and opens ports
//! - `SerialConnection`: one open port with queued writes, bounded waits, drain reads
//!
//! The wait methods report a timeout as `Ok(false)`. `Err` is reserved for
//! the driver failing outright, so the protocol layer can tell the two apart.

use std::time::Duration;

use crate::domain::{BaudRate, PanelResult, SerialPortInfo};

/// Factory for creating serial connections.
///
/// Takes `&self` so a factory can carry state (a simulated device, a test
/// script) and be shared with the worker thread behind an `Arc`.
pub trait SerialFactory: Send + Sync {
    /// List available serial ports on the system
    fn list_ports(&self) -> PanelResult<Vec<SerialPortInfo>>;

    /// Open a serial port at the given baud rate, returning a boxed connection
    fn open(&self, port: &str, baud_rate: BaudRate) -> PanelResult<Box<dyn SerialConnection>>;
}

/// Trait for an open serial port connection.
/// Only requires `Send` (not `Sync`); owned by exactly one worker thread.
pub trait SerialConnection: Send {
    /// Queue bytes for transmission. Returns without waiting for the line.
    fn write(&mut self, data: &[u8]) -> PanelResult<()>;

    /// Wait until everything queued by `write` has left the port.
    /// Returns `Ok(false)` if that did not happen within `timeout`.
    fn wait_for_bytes_written(&mut self, timeout: Duration) -> PanelResult<bool>;

    /// Wait until at least one byte can be read.
    /// Returns `Ok(false)` if nothing arrived within `timeout`.
    fn wait_for_ready_read(&mut self, timeout: Duration) -> PanelResult<bool>;

    /// Take every byte that is available right now. Never blocks.
    fn read_available(&mut self) -> PanelResult<Vec<u8>>;

    /// Close the connection
    fn close(&mut self) -> PanelResult<()>;
}
