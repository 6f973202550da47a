//! Configuration persistence commands
//!
//! Save/load/list/delete configuration profiles as JSON files, one per
//! profile, inside a profile directory chosen by the caller.

use std::path::{Path, PathBuf};

use crate::domain::Configuration;

/// Profile directory used when none is given on the command line.
pub fn default_config_dir() -> PathBuf {
    std::env::var_os("IOPANEL_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".iopanel")))
        .unwrap_or_else(|| PathBuf::from(".iopanel"))
        .join("configs")
}

/// Create the profile directory if needed.
fn ensure_dir(dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create configs dir: {e}"))
}

/// Reject anything with path separators, "..", or empty names.
fn sanitize_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Configuration name cannot be empty".to_string());
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err("Invalid configuration name".to_string());
    }
    // Only allow alphanumeric, spaces, hyphens, underscores
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err("Configuration name contains invalid characters".to_string());
    }
    Ok(trimmed.to_string())
}

fn profile_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

pub fn save_configuration(dir: &Path, config: &Configuration) -> Result<(), String> {
    let name = sanitize_name(&config.name)?;
    ensure_dir(dir)?;
    let json =
        serde_json::to_string_pretty(config).map_err(|e| format!("Serialization error: {e}"))?;
    std::fs::write(profile_path(dir, &name), json)
        .map_err(|e| format!("Failed to write config: {e}"))?;
    log::info!("Saved configuration '{name}'");
    Ok(())
}

pub fn load_configuration(dir: &Path, name: &str) -> Result<Configuration, String> {
    let name = sanitize_name(name)?;
    let json = std::fs::read_to_string(profile_path(dir, &name))
        .map_err(|e| format!("Failed to read config '{name}': {e}"))?;
    serde_json::from_str(&json).map_err(|e| format!("Failed to parse config '{name}': {e}"))
}

pub fn list_configurations(dir: &Path) -> Result<Vec<String>, String> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read configs dir: {e}"))?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.extension()?.to_str()? == "json" {
                path.file_stem()?.to_str().map(String::from)
            } else {
                None
            }
        })
        .collect();
    names.sort();
    Ok(names)
}

pub fn delete_configuration(dir: &Path, name: &str) -> Result<(), String> {
    let name = sanitize_name(name)?;
    if name == "Default" {
        return Err("Cannot delete the Default configuration".to_string());
    }
    let path = profile_path(dir, &name);
    if !path.exists() {
        return Err(format!("Configuration '{name}' not found"));
    }
    std::fs::remove_file(&path).map_err(|e| format!("Failed to delete config '{name}': {e}"))?;
    log::info!("Deleted configuration '{name}'");
    Ok(())
}
