//! Output line commands

use crate::panel::PanelController;

/// Flip output `index`; returns the new switch position.
pub fn toggle_output(panel: &mut PanelController, index: usize) -> Result<bool, String> {
    if !panel.is_connected() {
        return Err("Outputs are locked while disconnected".to_string());
    }
    panel
        .toggle_output(index)
        .ok_or_else(|| format!("No output line {index}"))
}

pub fn set_output(panel: &mut PanelController, index: usize, on: bool) -> Result<(), String> {
    if !panel.is_connected() {
        return Err("Outputs are locked while disconnected".to_string());
    }
    if panel.set_output(index, on) {
        Ok(())
    } else {
        Err(format!("No output line {index}"))
    }
}
