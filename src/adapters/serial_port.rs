//! Serial port adapter using the `serialport` crate
//!
//! Implements `SerialFactory` and `SerialConnection`. `serialport` only
//! offers blocking reads and writes with a per-call timeout, so the bounded
//! waits of `SerialConnection` are built from that timeout plus polling the
//! driver's queue counters (`bytes_to_write` / `bytes_to_read`).

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::domain::{BaudRate, PanelError, PanelResult, SerialPortInfo};
use crate::ports::{SerialConnection, SerialFactory};
use crate::protocol::TIME_LIMIT;

/// Sleep between two looks at the driver queues
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Zero-sized factory for creating serial port connections.
pub struct SerialPortFactory;

impl SerialFactory for SerialPortFactory {
    fn list_ports(&self) -> PanelResult<Vec<SerialPortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| PanelError::Serial(format!("Failed to list ports: {e}")))?;

        Ok(ports
            .into_iter()
            .map(|p| {
                let port_type = match &p.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        format!("USB ({:04X}:{:04X})", info.vid, info.pid)
                    }
                    serialport::SerialPortType::PciPort => "PCI".to_string(),
                    serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                    serialport::SerialPortType::Unknown => "Native".to_string(),
                };
                SerialPortInfo {
                    name: p.port_name,
                    port_type,
                }
            })
            .collect())
    }

    fn open(&self, port: &str, baud_rate: BaudRate) -> PanelResult<Box<dyn SerialConnection>> {
        let serial = serialport::new(port, baud_rate.as_u32())
            .timeout(TIME_LIMIT)
            .open()
            .map_err(|e| PanelError::ConnectionOpen {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(SerialPortConnection {
            port: Some(serial),
            pending: Vec::new(),
        }))
    }
}

/// An open serial port connection wrapping the `serialport` crate.
///
/// `write` only queues; the bytes go out in `wait_for_bytes_written`.
pub struct SerialPortConnection {
    port: Option<Box<dyn serialport::SerialPort>>,
    pending: Vec<u8>,
}

fn closed() -> PanelError {
    PanelError::Serial("Port is closed".into())
}

impl SerialConnection for SerialPortConnection {
    fn write(&mut self, data: &[u8]) -> PanelResult<()> {
        if self.port.is_none() {
            return Err(closed());
        }
        self.pending.extend_from_slice(data);
        Ok(())
    }

    fn wait_for_bytes_written(&mut self, timeout: Duration) -> PanelResult<bool> {
        let deadline = Instant::now() + timeout;
        let Self { port, pending } = self;
        let port = port.as_mut().ok_or_else(closed)?;

        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            port.set_timeout(remaining)
                .map_err(|e| PanelError::Serial(format!("Set timeout failed: {e}")))?;
            match port.write(pending.as_slice()) {
                Ok(n) => {
                    pending.drain(..n);
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                Err(e) => return Err(PanelError::Serial(format!("Write failed: {e}"))),
            }
        }

        // Handed to the driver; now wait for its output queue to empty.
        loop {
            let queued = port
                .bytes_to_write()
                .map_err(|e| PanelError::Serial(format!("Output queue query failed: {e}")))?;
            if queued == 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn wait_for_ready_read(&mut self, timeout: Duration) -> PanelResult<bool> {
        let deadline = Instant::now() + timeout;
        let port = self.port.as_mut().ok_or_else(closed)?;

        loop {
            let available = port
                .bytes_to_read()
                .map_err(|e| PanelError::Serial(format!("Input queue query failed: {e}")))?;
            if available > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn read_available(&mut self) -> PanelResult<Vec<u8>> {
        let port = self.port.as_mut().ok_or_else(closed)?;
        let available = port
            .bytes_to_read()
            .map_err(|e| PanelError::Serial(format!("Input queue query failed: {e}")))?
            as usize;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; available];
        let n = match port.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::TimedOut => 0,
            Err(e) => return Err(PanelError::Serial(format!("Read failed: {e}"))),
        };
        buf.truncate(n);
        Ok(buf)
    }

    fn close(&mut self) -> PanelResult<()> {
        // Dropping the handle closes the OS port
        self.port = None;
        self.pending.clear();
        Ok(())
    }
}
