//! File-based configuration loading.
//!
//! A config file holds a `global` table and any number of named profile
//! tables. The `global` table may select a profile with `use = "<name>"`; the
//! profile's keys are then laid over the global ones.
//!
//! ```toml
//! [global]
//! host = "console-server"
//! use = "router"
//!
//! [router]
//! port = 2003
//! wd_cmd = "show clock"
//! ```

use std::path::Path;

use serde::Deserialize;

use super::layer::ConfigLayer;
use crate::error::{Result, SessionError};

/// Name of the base table.
pub const GLOBAL_SECTION: &str = "global";

/// Key in the base table naming the profile to overlay.
pub const USE_KEY: &str = "use";

/// Extensions of INI-style files, which are refused.
const INI_EXTENSIONS: [&str; 3] = ["ini", "conf", "cfg"];

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from path, defaulting to TOML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::Toml)
    }
}

/// Load the file layer from `path`.
///
/// When `required` is false a missing file yields an empty layer.
pub fn load_config_file(path: &Path, required: bool) -> Result<ConfigLayer> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ConfigLayer::default());
        }
        Err(e) => {
            return Err(SessionError::io_context(
                format!("reading config file {}", path.display()),
                e,
            ));
        }
    };

    if is_ini_path(path) {
        return Err(SessionError::config(format!(
            "{}: INI syntax is not supported, write the file as TOML with quoted string values",
            path.display()
        )));
    }

    parse_config(&content, ConfigFormat::from_path(path))
}

fn is_ini_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| INI_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Parse config content into a layer.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ConfigLayer> {
    let root: serde_json::Value = match format {
        ConfigFormat::Toml => {
            let table: toml::Table = toml::from_str(content)
                .map_err(|e| SessionError::config(format!("invalid TOML: {e}")))?;
            serde_json::to_value(table)
                .map_err(|e| SessionError::config(format!("invalid TOML: {e}")))?
        }
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| SessionError::config(format!("invalid JSON: {e}")))?,
    };

    let Some(mut global) = root.get(GLOBAL_SECTION).cloned() else {
        return Ok(ConfigLayer::default());
    };

    let profile = match global.as_object_mut().and_then(|t| t.remove(USE_KEY)) {
        Some(serde_json::Value::String(name)) => Some(name),
        Some(other) => {
            return Err(SessionError::config(format!(
                "'{USE_KEY}' must name a section, found {other}"
            )));
        }
        None => None,
    };

    let mut layer = section_layer(GLOBAL_SECTION, global)?;

    if let Some(name) = profile {
        let section = root
            .get(&name)
            .cloned()
            .ok_or_else(|| SessionError::config(format!("section '{name}' not found")))?;
        layer = layer.overlay(section_layer(&name, section)?);
    }

    Ok(layer)
}

fn section_layer(name: &str, value: serde_json::Value) -> Result<ConfigLayer> {
    ConfigLayer::deserialize(value)
        .map_err(|e| SessionError::config(format!("section '{name}': {e}")))
}
