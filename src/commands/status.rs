//! Status command: returns the current panel state for the front end

use crate::domain::PanelStatus;
use crate::panel::PanelController;

pub fn get_connection_status(panel: &PanelController) -> PanelStatus {
    panel.status()
}

/// Status as pretty JSON, the form the command line prints.
pub fn connection_status_json(panel: &PanelController) -> Result<String, String> {
    serde_json::to_string_pretty(&panel.status()).map_err(|e| format!("Serialization error: {e}"))
}
