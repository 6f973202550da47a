//! Serial port commands: list, connect, disconnect

use crate::domain::{BaudRate, ConnectionParameters, SerialPortInfo};
use crate::panel::PanelController;
use crate::ports::SerialFactory;

pub fn list_serial_ports(factory: &dyn SerialFactory) -> Result<Vec<SerialPortInfo>, String> {
    factory.list_ports().map_err(|e| e.to_string())
}

/// Supported baud rates in display order.
pub fn list_baud_rates() -> Vec<u32> {
    BaudRate::ALL.iter().map(|rate| rate.as_u32()).collect()
}

/// Start polling `port`. The outcome arrives later as worker events; this
/// only fails on bad arguments or when a session is already up.
pub fn connect_serial(
    panel: &mut PanelController,
    port: &str,
    baud_rate: u32,
) -> Result<ConnectionParameters, String> {
    let port = port.trim();
    if port.is_empty() {
        return Err("No serial port selected".to_string());
    }
    let baud_rate = BaudRate::try_from(baud_rate).map_err(|e| e.to_string())?;
    if panel.is_connected() {
        return Err("Already connected".to_string());
    }

    panel.connect(port, baud_rate);
    if !panel.is_connected() {
        return Err("Previous session is still closing".to_string());
    }
    Ok(ConnectionParameters::new(port, baud_rate))
}

pub fn disconnect_serial(panel: &mut PanelController) -> Result<(), String> {
    if !panel.is_connected() {
        return Err("Not connected".to_string());
    }
    panel.disconnect();
    Ok(())
}
