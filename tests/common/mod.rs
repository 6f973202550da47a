#![allow(dead_code)]

//! Scripted serial device shared by the integration tests.
//!
//! Each frame the worker writes consumes the next `Reply` from the script
//! (loopback of the output mask once the script runs dry). The device records
//! every frame and every open/close, and can hold the worker inside the write
//! wait, or inside `open`, until the test lets it go.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use iopanel_lib::domain::{BaudRate, PanelError, PanelResult, SerialPortInfo};
use iopanel_lib::ports::{SerialConnection, SerialFactory};
use iopanel_lib::protocol::{decode_frame, encode_response};
use iopanel_lib::worker::ProtocolWorker;

/// How long a gated device waits for the test before giving up.
const GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the device does with one frame.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with this input mask
    Input(u16),
    /// Answer with exactly these bytes
    Raw(Vec<u8>),
    /// Accept the frame, never answer
    Silent,
    /// Never finish sending the frame
    StallWrite,
    /// Fail the write with a driver error
    Fail(String),
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    frames: Vec<Vec<u8>>,
    opens: Vec<(String, BaudRate)>,
    closes: usize,
    open_connections: usize,
    open_error: Option<String>,
}

/// Gate handles held by the test: `entered` fires when the worker reaches
/// the gated call, a message on `release` lets it continue.
pub struct Gate {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

#[derive(Clone)]
struct DeviceGate {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl DeviceGate {
    fn pair() -> (DeviceGate, Gate) {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        (
            DeviceGate {
                entered: entered_tx,
                release: release_rx,
            },
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    fn pass(&self) {
        let _ = self.entered.send(());
        let _ = self.release.recv_timeout(GATE_TIMEOUT);
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    script: Arc<Mutex<Script>>,
    gate: Option<DeviceGate>,
    open_gate: Option<DeviceGate>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose devices stop in every write wait until released.
    pub fn gated() -> (Self, Gate) {
        let (device_gate, gate) = DeviceGate::pair();
        let factory = Self {
            gate: Some(device_gate),
            ..Self::default()
        };
        (factory, gate)
    }

    /// A factory whose `open` stops until released, leaving the worker in
    /// `Opening`.
    pub fn gated_open() -> (Self, Gate) {
        let (device_gate, gate) = DeviceGate::pair();
        let factory = Self {
            open_gate: Some(device_gate),
            ..Self::default()
        };
        (factory, gate)
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn push_reply(&self, reply: Reply) {
        self.script().replies.push_back(reply);
    }

    /// Make the next `open` fail with a driver error.
    pub fn fail_open(&self, reason: &str) {
        self.script().open_error = Some(reason.to_string());
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.script().frames.clone()
    }

    pub fn opens(&self) -> Vec<(String, BaudRate)> {
        self.script().opens.clone()
    }

    pub fn closes(&self) -> usize {
        self.script().closes
    }

    pub fn open_connections(&self) -> usize {
        self.script().open_connections
    }
}

impl SerialFactory for ScriptedFactory {
    fn list_ports(&self) -> PanelResult<Vec<SerialPortInfo>> {
        Ok(vec![SerialPortInfo {
            name: "COM7".to_string(),
            port_type: "Scripted".to_string(),
        }])
    }

    fn open(&self, port: &str, baud_rate: BaudRate) -> PanelResult<Box<dyn SerialConnection>> {
        if let Some(gate) = &self.open_gate {
            gate.pass();
        }
        let mut script = self.script();
        if let Some(reason) = script.open_error.take() {
            return Err(PanelError::Serial(reason));
        }
        script.opens.push((port.to_string(), baud_rate));
        script.open_connections += 1;
        Ok(Box::new(ScriptedDevice {
            script: Arc::clone(&self.script),
            gate: self.gate.clone(),
            current: None,
            rx: Vec::new(),
            open: true,
        }))
    }
}

struct ScriptedDevice {
    script: Arc<Mutex<Script>>,
    gate: Option<DeviceGate>,
    current: Option<Reply>,
    rx: Vec<u8>,
    open: bool,
}

impl SerialConnection for ScriptedDevice {
    fn write(&mut self, data: &[u8]) -> PanelResult<()> {
        let mut script = self.script.lock().unwrap();
        script.frames.push(data.to_vec());
        let reply = script.replies.pop_front().unwrap_or_else(|| {
            let outputs = decode_frame(data).unwrap_or_default();
            Reply::Input(outputs)
        });
        self.current = Some(reply);
        Ok(())
    }

    fn wait_for_bytes_written(&mut self, timeout: Duration) -> PanelResult<bool> {
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        match self.current.take() {
            Some(Reply::StallWrite) => {
                thread::sleep(timeout);
                Ok(false)
            }
            Some(Reply::Fail(reason)) => Err(PanelError::Serial(reason)),
            Some(Reply::Input(mask)) => {
                self.rx.extend_from_slice(&encode_response(mask));
                Ok(true)
            }
            Some(Reply::Raw(bytes)) => {
                self.rx.extend_from_slice(&bytes);
                Ok(true)
            }
            Some(Reply::Silent) | None => Ok(true),
        }
    }

    fn wait_for_ready_read(&mut self, timeout: Duration) -> PanelResult<bool> {
        if self.rx.is_empty() {
            thread::sleep(timeout);
            return Ok(false);
        }
        Ok(true)
    }

    fn read_available(&mut self) -> PanelResult<Vec<u8>> {
        Ok(std::mem::take(&mut self.rx))
    }

    fn close(&mut self) -> PanelResult<()> {
        if self.open {
            self.open = false;
            let mut script = self.script.lock().unwrap();
            script.closes += 1;
            script.open_connections -= 1;
        }
        Ok(())
    }
}

/// Poll until the worker has no session, panicking after two seconds.
pub fn wait_idle(worker: &ProtocolWorker) {
    for _ in 0..400 {
        if !worker.is_running() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("worker did not go idle");
}
