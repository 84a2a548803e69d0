//! Configuration resolution for silk-web
//!
//! Settings are resolved once at startup with the priority order
//! CLI argument → environment variable → TOML file → compiled default,
//! then handed to the components that need them. Nothing reads the
//! process environment after startup.

use clap::Parser;
use silk_common::config::{self, PayPalToml};
use silk_common::Result;
use std::path::PathBuf;

use crate::services::oracle_client::DEFAULT_MODELS;

/// Default bind address for the HTTP server
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5780";

/// Default public application URL (payment redirects, upstream referer)
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Application title sent to the model gateway
const APP_TITLE: &str = "Whispering Silk";

/// Command-line arguments (highest-priority configuration tier)
#[derive(Debug, Default, Parser)]
#[command(name = "silk-web", about = "Whispering Silk oracle web service")]
pub struct Cli {
    /// Socket address to bind, e.g. 127.0.0.1:5780
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory holding the SQLite database
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to
    pub bind_address: String,
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// Admin API key gating the redeem-code management endpoints.
    /// `None` disables the check (works-out-of-the-box default).
    pub redeem_api_key: Option<String>,
    /// Public base URL of the application
    pub app_url: String,
    /// Model gateway settings
    pub oracle: OracleConfig,
    /// Payment gateway credentials; `None` disables payment creation
    pub paypal: Option<PayPalConfig>,
}

/// Model gateway settings for the interpretation orchestrator
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// OpenRouter API key. `None` switches the client to mock mode.
    pub api_key: Option<String>,
    /// Ordered model fallback list
    pub models: Vec<String>,
    /// Referer URL sent with upstream requests
    pub referer: String,
    /// Application title sent with upstream requests
    pub title: String,
}

/// Payment gateway credentials
#[derive(Debug, Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    /// true = live API, false = sandbox
    pub live: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI args, environment, and TOML file.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let toml = config::load_toml_config("silk-web")?.unwrap_or_default();
        let paypal = resolve_paypal(toml.paypal.clone().unwrap_or_default());

        let bind_address = cli
            .bind
            .clone()
            .or_else(|| env_var("SILK_BIND"))
            .or(toml.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| env_var("SILK_DATA_DIR").map(PathBuf::from))
            .or(toml.data_dir.map(PathBuf::from))
            .unwrap_or_else(config::default_data_dir);

        let redeem_api_key = env_var("SILK_REDEEM_API_KEY").or(toml.redeem_api_key);

        let app_url = env_var("SILK_APP_URL")
            .or(toml.app_url)
            .unwrap_or_else(|| DEFAULT_APP_URL.to_string());

        let oracle = OracleConfig {
            api_key: env_var("SILK_OPENROUTER_API_KEY").or(toml.openrouter_api_key),
            models: resolve_models(
                env_var("SILK_MODEL").or(toml.model),
                env_var("SILK_MODELS").map(|v| parse_model_list(&v)).or(toml.models),
            ),
            referer: app_url.clone(),
            title: APP_TITLE.to_string(),
        };

        Ok(AppConfig {
            bind_address,
            data_dir,
            redeem_api_key,
            app_url,
            oracle,
            paypal,
        })
    }
}

/// Resolve the ordered model list.
///
/// An override pins a single model; otherwise a configured list replaces
/// the compiled default order.
fn resolve_models(pinned: Option<String>, list: Option<Vec<String>>) -> Vec<String> {
    if let Some(model) = pinned {
        return vec![model];
    }
    match list {
        Some(models) if !models.is_empty() => models,
        _ => DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
    }
}

/// Split a comma-separated model list, dropping empty entries
fn parse_model_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_paypal(toml_paypal: PayPalToml) -> Option<PayPalConfig> {
    let client_id = env_var("SILK_PAYPAL_CLIENT_ID").or(toml_paypal.client_id)?;
    let client_secret = env_var("SILK_PAYPAL_CLIENT_SECRET").or(toml_paypal.client_secret)?;
    let mode = env_var("SILK_PAYPAL_MODE")
        .or(toml_paypal.mode)
        .unwrap_or_else(|| "sandbox".to_string());

    Some(PayPalConfig {
        client_id,
        client_secret,
        live: mode.eq_ignore_ascii_case("live"),
    })
}

/// Read an environment variable, treating blank values as unset
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
