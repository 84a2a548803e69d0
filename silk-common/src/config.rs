//! Configuration file loading and default path resolution
//!
//! Runtime configuration is resolved with the priority order
//! CLI argument → environment variable → TOML file → compiled default.
//! This module owns the TOML tier and the platform default paths; the
//! service crate composes the tiers into its own config struct.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Optional settings read from the TOML config file.
///
/// Every field is optional; unset fields fall through to the next
/// resolution tier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Socket address the HTTP server binds to
    pub bind_address: Option<String>,
    /// Directory holding the SQLite database
    pub data_dir: Option<String>,
    /// Admin API key gating the redeem-code management endpoints
    pub redeem_api_key: Option<String>,
    /// OpenRouter API key for interpretation requests
    pub openrouter_api_key: Option<String>,
    /// Pin interpretation requests to a single model
    pub model: Option<String>,
    /// Ordered model fallback list (replaces the compiled default)
    pub models: Option<Vec<String>>,
    /// Public base URL of the application (referer, payment redirects)
    pub app_url: Option<String>,
    /// Payment gateway credentials
    pub paypal: Option<PayPalToml>,
}

/// PayPal credentials from the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayPalToml {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// "sandbox" or "live"
    pub mode: Option<String>,
}

/// Platform config file path: `<config_dir>/silk/<name>.toml`
pub fn config_file_path(name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("silk").join(format!("{}.toml", name)))
}

/// Load the TOML config file if it exists.
///
/// A missing file is not an error (all settings have lower tiers);
/// a present-but-unparsable file is.
pub fn load_toml_config(name: &str) -> Result<Option<TomlConfig>> {
    let Some(path) = config_file_path(name) else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    tracing::debug!("Loaded config file {}", path.display());
    Ok(Some(config))
}

/// OS-dependent default data directory for the SQLite database
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("silk"))
        .unwrap_or_else(|| PathBuf::from("./silk_data"))
}
