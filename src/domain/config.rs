//! Configuration profiles
//!
//! A Configuration is a saved profile containing the settings for one panel
//! setup (serial port, speed, and how many I/O lines the board exposes).

use serde::{Deserialize, Serialize};

use super::{BaudRate, LINE_COUNT};

fn default_line_count() -> usize {
    LINE_COUNT
}

/// A saved configuration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Profile name (e.g., "Bench", "Cabinet 2")
    pub name: String,
    /// Selected serial port name
    pub serial_port: Option<String>,
    /// Serial baud rate
    pub baud_rate: BaudRate,
    /// Number of output switches shown on the panel
    #[serde(default = "default_line_count")]
    pub output_lines: usize,
    /// Number of input indicators shown on the panel
    #[serde(default = "default_line_count")]
    pub input_lines: usize,
}

impl Configuration {
    /// Line counts limited to what a 16-bit mask can address.
    pub fn clamped_lines(&self) -> (usize, usize) {
        (
            self.output_lines.clamp(1, LINE_COUNT),
            self.input_lines.clamp(1, LINE_COUNT),
        )
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            serial_port: None,
            baud_rate: BaudRate::B9600,
            output_lines: LINE_COUNT,
            input_lines: LINE_COUNT,
        }
    }
}
