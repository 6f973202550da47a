//! Simulated I/O controller for development and testing without hardware.
//!
//! Activate from the command line with `--mock`:
//!
//!   RUST_LOG=iopanel_lib=info cargo run -- --mock
//!
//! The device understands the combined write-output / read-input frame,
//! latches the output mask and answers with its input mask. Inputs are wired
//! back to the outputs unless an override is set, so toggling an output
//! lights the matching input indicator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::domain::{BaudRate, InputMask, OutputMask, PanelResult, SerialPortInfo};
use crate::ports::{SerialConnection, SerialFactory};
use crate::protocol::{decode_frame, encode_response, FRAME_LEN, RESPONSE_LEN};

/// Port name reported by `list_ports`
pub const MOCK_PORT_NAME: &str = "MOCK0";

/// Time one frame and its reply spend on the line (8N1: 10 bits per byte).
fn line_time(baud_rate: BaudRate) -> Duration {
    let bits = ((FRAME_LEN + RESPONSE_LEN) * 10) as u64;
    Duration::from_micros(bits * 1_000_000 / u64::from(baud_rate.as_u32()))
}

#[derive(Debug, Default)]
struct DeviceState {
    outputs: OutputMask,
    input_override: Option<InputMask>,
    frames: usize,
    open_connections: usize,
}

/// Factory handing out connections to one shared simulated device.
#[derive(Clone, Default)]
pub struct MockDeviceFactory {
    device: Arc<Mutex<DeviceState>>,
}

impl MockDeviceFactory {
    pub fn new() -> Self {
        log::info!("[MOCK DEVICE] Initialized, inputs looped back to outputs");
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Output mask most recently latched by the device.
    pub fn outputs(&self) -> OutputMask {
        self.state().outputs
    }

    /// Number of well-formed frames the device has answered.
    pub fn frames_answered(&self) -> usize {
        self.state().frames
    }

    /// Connections currently open against the device.
    pub fn open_connections(&self) -> usize {
        self.state().open_connections
    }

    /// Report `inputs` instead of mirroring the outputs; `None` restores loopback.
    pub fn set_input_override(&self, inputs: Option<InputMask>) {
        self.state().input_override = inputs;
    }
}

impl SerialFactory for MockDeviceFactory {
    fn list_ports(&self) -> PanelResult<Vec<SerialPortInfo>> {
        Ok(vec![SerialPortInfo {
            name: MOCK_PORT_NAME.to_string(),
            port_type: "Simulated".to_string(),
        }])
    }

    fn open(&self, port: &str, baud_rate: BaudRate) -> PanelResult<Box<dyn SerialConnection>> {
        log::info!("[MOCK DEVICE] OPEN {port} @ {baud_rate} baud");
        self.state().open_connections += 1;
        Ok(Box::new(MockDevice {
            device: Arc::clone(&self.device),
            baud_rate,
            rx_line: Vec::new(),
            tx_line: Vec::new(),
            open: true,
        }))
    }
}

/// One open connection to the simulated device.
pub struct MockDevice {
    device: Arc<Mutex<DeviceState>>,
    baud_rate: BaudRate,
    /// Bytes travelling panel → device
    rx_line: Vec<u8>,
    /// Bytes travelling device → panel
    tx_line: Vec<u8>,
    open: bool,
}

impl MockDevice {
    /// Let the device consume complete frames and queue its answers.
    /// Returns how many frames were answered.
    fn process_frames(&mut self) -> u32 {
        let mut answered = 0;
        while self.rx_line.len() >= FRAME_LEN {
            let frame: Vec<u8> = self.rx_line.drain(..FRAME_LEN).collect();
            let Some(outputs) = decode_frame(&frame) else {
                log::warn!("[MOCK DEVICE] Ignoring malformed frame {frame:02X?}");
                continue;
            };

            let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
            if device.outputs != outputs {
                log::info!("[MOCK DEVICE] OUTPUTS {:016b} → {outputs:016b}", device.outputs);
            }
            device.outputs = outputs;
            device.frames += 1;
            let inputs = device.input_override.unwrap_or(outputs);
            log::debug!("[MOCK DEVICE] RX {frame:02X?} → inputs {inputs:#06X}");
            self.tx_line.extend_from_slice(&encode_response(inputs));
            answered += 1;
        }
        answered
    }
}

impl SerialConnection for MockDevice {
    fn write(&mut self, data: &[u8]) -> PanelResult<()> {
        self.rx_line.extend_from_slice(data);
        Ok(())
    }

    fn wait_for_bytes_written(&mut self, _timeout: Duration) -> PanelResult<bool> {
        let answered = self.process_frames();
        if answered > 0 {
            thread::sleep(line_time(self.baud_rate) * answered);
        }
        Ok(true)
    }

    fn wait_for_ready_read(&mut self, timeout: Duration) -> PanelResult<bool> {
        if self.tx_line.is_empty() {
            // Nothing will arrive; behave like a real port and sit out the wait
            thread::sleep(timeout);
            return Ok(false);
        }
        Ok(true)
    }

    fn read_available(&mut self) -> PanelResult<Vec<u8>> {
        Ok(std::mem::take(&mut self.tx_line))
    }

    fn close(&mut self) -> PanelResult<()> {
        if self.open {
            self.open = false;
            let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
            device.open_connections = device.open_connections.saturating_sub(1);
            log::info!("[MOCK DEVICE] CLOSE");
        }
        Ok(())
    }
}
