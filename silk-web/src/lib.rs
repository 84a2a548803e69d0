//! silk-web library - Whispering Silk oracle web service
//!
//! HTTP backend for the fortune-stick application: redemption-code
//! lifecycle (generate / verify / list / stats), AI interpretation with
//! model fallback and response normalization, and the payment-gateway
//! boundary.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::services::{OracleClient, PayPalClient};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved configuration, passed in at construction
    pub config: Arc<AppConfig>,
    /// Model gateway client
    pub oracle: Arc<OracleClient>,
    /// Payment gateway client; None when credentials are not configured
    pub paypal: Option<Arc<PayPalClient>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> silk_common::Result<Self> {
        let oracle = OracleClient::new(config.oracle.clone()).map_err(|e| {
            silk_common::Error::Config(format!("Failed to build oracle client: {}", e))
        })?;

        let paypal = match &config.paypal {
            Some(credentials) => Some(Arc::new(PayPalClient::new(credentials).map_err(|e| {
                silk_common::Error::Config(format!("Failed to build PayPal client: {}", e))
            })?)),
            None => None,
        };

        Ok(Self {
            db,
            config: Arc::new(config),
            oracle: Arc::new(oracle),
            paypal,
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
///
/// Admin routes (code generation and inspection) sit behind the API-key
/// middleware; verification, interpretation, and payment are public.
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/redeem/generate", post(api::redeem::generate_codes))
        .route("/api/redeem/list", get(api::redeem::list_codes))
        .route("/api/redeem/stats", get(api::redeem::redeem_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_api_key,
        ));

    let public = Router::new()
        .route("/api/redeem/verify", post(api::redeem::verify_code))
        .route("/api/interpret", post(api::interpret::interpret))
        .route("/api/payment/create", post(api::payment::create_payment))
        .route("/api/payment/status", get(api::payment::payment_status))
        .route("/api/payment/callback", get(api::payment::payment_callback))
        .route("/api/payment/webhook", post(api::payment::payment_webhook))
        .merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
