//! PanelController: the operator side of the poll protocol.
//!
//! Holds what the operator sees and sets: an ordered bank of output switches
//! (each with an indicator) and input indicators. It drives the
//! `ProtocolWorker` and keeps the poll cycle going by answering every
//! `Response` with the current switch positions.
//!
//! Runs on the caller's thread and never blocks. Events from any session
//! other than the one it started last are ignored.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::domain::{
    BaudRate, Configuration, ConnectionParameters, InputMask, OutputMask, PanelStatus, LINE_COUNT,
};
use crate::ports::SerialFactory;
use crate::worker::{ProtocolWorker, SessionEvent, SessionId, WorkerEvent};

/// One output line: the operator's switch and the indicator showing what
/// was last sent to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub label: String,
    pub switched_on: bool,
    pub indicator_on: bool,
}

/// One input line as last reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    pub label: String,
    pub lit: bool,
}

/// Output and input lines in bit order, built once from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBank {
    outputs: Vec<OutputLine>,
    inputs: Vec<InputLine>,
}

impl LineBank {
    pub fn new(output_lines: usize, input_lines: usize) -> Self {
        let outputs = (0..output_lines.min(LINE_COUNT))
            .map(|i| OutputLine {
                label: format!("OUT{i}"),
                switched_on: false,
                indicator_on: false,
            })
            .collect();
        let inputs = (0..input_lines.min(LINE_COUNT))
            .map(|i| InputLine {
                label: format!("IN{i}"),
                lit: false,
            })
            .collect();
        Self { outputs, inputs }
    }

    pub fn outputs(&self) -> &[OutputLine] {
        &self.outputs
    }

    pub fn inputs(&self) -> &[InputLine] {
        &self.inputs
    }

    /// Fold the switch positions into a mask, switch `i` → bit `i`.
    pub fn output_mask(&self) -> OutputMask {
        self.outputs
            .iter()
            .enumerate()
            .filter(|(_, line)| line.switched_on)
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    fn set_switch(&mut self, index: usize, on: bool) -> bool {
        match self.outputs.get_mut(index) {
            Some(line) => {
                line.switched_on = on;
                true
            }
            None => false,
        }
    }

    fn apply_inputs(&mut self, mask: InputMask) {
        for (i, line) in self.inputs.iter_mut().enumerate() {
            line.lit = mask & (1 << i) != 0;
        }
    }

    fn mirror_switches(&mut self) {
        for line in &mut self.outputs {
            line.indicator_on = line.switched_on;
        }
    }
}

/// Drives one `ProtocolWorker` on behalf of the operator.
pub struct PanelController {
    worker: ProtocolWorker,
    lines: LineBank,
    connection: Option<ConnectionParameters>,
    /// Session whose events are accepted; `None` while disconnected
    session: Option<SessionId>,
    last_input: InputMask,
    last_error: Option<String>,
}

impl PanelController {
    /// Build a disconnected panel. Worker events arrive on the returned
    /// receiver and must be fed back through `handle_event`.
    pub fn new(
        factory: Arc<dyn SerialFactory>,
        config: &Configuration,
    ) -> (Self, Receiver<SessionEvent>) {
        let (worker, events) = ProtocolWorker::new(factory);
        let (outputs, inputs) = config.clamped_lines();
        let panel = Self {
            worker,
            lines: LineBank::new(outputs, inputs),
            connection: None,
            session: None,
            last_input: 0,
            last_error: None,
        };
        (panel, events)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn lines(&self) -> &LineBank {
        &self.lines
    }

    /// Session the panel is currently listening to.
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Connect when disconnected, disconnect otherwise.
    pub fn toggle_connection(&mut self, port: &str, baud_rate: BaudRate) {
        if self.is_connected() {
            self.disconnect();
        } else {
            self.connect(port, baud_rate);
        }
    }

    pub fn connect(&mut self, port: &str, baud_rate: BaudRate) {
        if self.is_connected() {
            log::warn!("Already connected, ignoring connect to {port}");
            return;
        }
        if self.worker.is_running() {
            log::warn!("Previous session is still closing, try again");
            return;
        }
        self.worker.submit_request(self.lines.output_mask());
        match self.worker.start(port, baud_rate) {
            Some(session) => {
                self.last_error = None;
                self.session = Some(session);
                self.connection = Some(ConnectionParameters::new(port, baud_rate));
            }
            None => log::warn!("Worker refused to start on {port}"),
        }
    }

    pub fn disconnect(&mut self) {
        self.worker.stop();
        self.session = None;
        self.connection = None;
    }

    /// Set one output switch. Only allowed while connected.
    pub fn set_output(&mut self, index: usize, on: bool) -> bool {
        if !self.is_connected() {
            log::warn!("Output {index} is locked while disconnected");
            return false;
        }
        if !self.lines.set_switch(index, on) {
            log::warn!("No output line {index}");
            return false;
        }
        true
    }

    /// Flip one output switch; returns its new position, `None` if refused.
    pub fn toggle_output(&mut self, index: usize) -> Option<bool> {
        let on = !self.lines.outputs().get(index)?.switched_on;
        self.set_output(index, on).then_some(on)
    }

    /// React to one worker event. Returns `false` if the event belongs to a
    /// session the panel has already left and was ignored.
    pub fn handle_event(&mut self, event: SessionEvent) -> bool {
        if self.session != Some(event.session) {
            log::debug!("Dropping {:?} from stale session {}", event.event, event.session);
            return false;
        }
        match event.event {
            WorkerEvent::Response(input) => {
                self.last_input = input;
                self.lines.apply_inputs(input);
                self.lines.mirror_switches();
                self.worker.submit_request(self.lines.output_mask());
            }
            WorkerEvent::Error(e) => {
                log::warn!("Disconnected: {e}");
                self.last_error = Some(e.to_string());
                self.worker.stop();
                self.session = None;
                self.connection = None;
            }
        }
        true
    }

    pub fn status(&self) -> PanelStatus {
        PanelStatus {
            connected: self.is_connected(),
            port: self.connection.as_ref().map(|c| c.port.clone()),
            baud_rate: self.connection.as_ref().map(|c| c.baud_rate),
            session: self.worker.state(),
            output_mask: self.lines.output_mask(),
            input_mask: self.last_input,
            last_error: self.last_error.clone(),
        }
    }
}
