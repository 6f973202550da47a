//! Core domain types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::PanelError;

/// Number of digital lines addressable by one 16-bit mask
pub const LINE_COUNT: usize = 16;

/// Bit mask of the desired output levels, bit `i` = output line `i`
pub type OutputMask = u16;

/// Bit mask of the sensed input levels, bit `i` = input line `i`
pub type InputMask = u16;

/// Standard baud rates accepted by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// All supported rates, slowest first (the order shown to the operator).
    pub const ALL: [BaudRate; 8] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = PanelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .iter()
            .copied()
            .find(|rate| rate.as_u32() == value)
            .ok_or_else(|| PanelError::Config(format!("Unsupported baud rate: {value}")))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.as_u32()
    }
}

impl std::str::FromStr for BaudRate {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u32>()
            .map_err(|e| PanelError::Config(format!("Invalid baud rate '{s}': {e}")))?;
        BaudRate::try_from(value)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Port and speed of one session. Fixed from `start` until the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    pub port: String,
    pub baud_rate: BaudRate,
}

impl ConnectionParameters {
    pub fn new(port: impl Into<String>, baud_rate: BaudRate) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }
}

/// Lifecycle of a poll session.
///
/// `Idle → Opening → Running → (Terminating | Stopping) → Idle`.
/// A failed open goes straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Opening,
    Running,
    /// Leaving after an error; the transport is being released.
    Terminating,
    /// Leaving after an explicit stop; the transport is being released.
    Stopping,
}

impl SessionState {
    /// True for every state in which a session thread exists.
    pub fn is_active(self) -> bool {
        self != SessionState::Idle
    }
}

/// Information about a serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortInfo {
    pub name: String,
    pub port_type: String,
}

/// Snapshot of the panel, returned by `get_connection_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelStatus {
    pub connected: bool,
    pub port: Option<String>,
    pub baud_rate: Option<BaudRate>,
    pub session: SessionState,
    pub output_mask: OutputMask,
    pub input_mask: InputMask,
    pub last_error: Option<String>,
}
