//! PollSession: owns a serial connection and drives one poll cycle at a time.
//!
//! Adds the timing layer on top of `encode` / `decode`: bounded wait for the
//! frame to leave, bounded wait for the first reply byte, then a drain loop
//! that keeps reading while bytes keep arriving.
//!
//! The connection is closed when the session is dropped, so every exit path
//! of the worker releases the port.

use crate::domain::{InputMask, OutputMask, PanelError, PanelResult};
use crate::ports::SerialConnection;

use super::{decode, encode, DRAIN_WINDOW, TIME_LIMIT};

/// Owns a serial connection and executes poll cycles against the device.
pub struct PollSession {
    serial: Box<dyn SerialConnection>,
}

impl PollSession {
    pub fn new(serial: Box<dyn SerialConnection>) -> Self {
        Self { serial }
    }

    /// Send `output` and return the input mask the device answered with.
    ///
    /// Any error is terminal for the session; the caller should stop polling
    /// and drop the session.
    pub fn exchange(&mut self, output: OutputMask) -> PanelResult<InputMask> {
        let frame = encode(output);
        log::debug!("TX: {frame:02X?}");

        self.serial.write(&frame)?;
        if !self.serial.wait_for_bytes_written(TIME_LIMIT)? {
            return Err(PanelError::WriteTimeout);
        }

        if !self.serial.wait_for_ready_read(TIME_LIMIT)? {
            return Err(PanelError::ReadTimeout);
        }

        let raw = self.drain()?;
        log::debug!("RX: {raw:02X?}");

        decode(&raw)
    }

    /// Read everything available, then keep reading as long as another byte
    /// shows up within `DRAIN_WINDOW`.
    fn drain(&mut self) -> PanelResult<Vec<u8>> {
        let mut buf = self.serial.read_available()?;
        while self.serial.wait_for_ready_read(DRAIN_WINDOW)? {
            buf.extend(self.serial.read_available()?);
        }
        Ok(buf)
    }
}

impl Drop for PollSession {
    fn drop(&mut self) {
        if let Err(e) = self.serial.close() {
            log::warn!("Failed to close serial connection: {e}");
        }
    }
}
