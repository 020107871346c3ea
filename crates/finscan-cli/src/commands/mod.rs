//! CLI subcommands and the helpers they share.

pub mod alias;
pub mod batch;
pub mod config;
pub mod output;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use finscan_core::models::config::FinscanConfig;
use finscan_core::models::document::RawDocumentText;

/// Default configuration file under the user config directory.
pub fn default_config_path() -> PathBuf {
    config_home().join("config.json")
}

/// Default alias store next to the configuration file.
pub fn default_store_path() -> PathBuf {
    config_home().join("aliases.json")
}

fn config_home() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finscan")
}

/// Configuration file in effect: the `--config` path or the default one.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration. An explicit path must exist; a missing default file
/// means built-in defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<FinscanConfig> {
    let path = config_path(explicit);

    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        return FinscanConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    if explicit.is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    Ok(FinscanConfig::default())
}

/// Alias store location: command line, then configuration, then default.
pub fn store_path(explicit: Option<&Path>, config: &FinscanConfig) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.alias.store_path.clone())
        .unwrap_or_else(default_store_path)
}

/// Whether a file is a supported OCR text input.
pub fn is_supported_input(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    matches!(ext.as_str(), "txt" | "json")
}

/// Read OCR output: `.json` is a serialized document with per-line
/// confidences, anything else is plain text.
pub fn read_document(path: &Path) -> anyhow::Result<RawDocumentText> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid OCR JSON in {}", path.display()))
    } else {
        Ok(RawDocumentText::from_text(&content))
    }
}
