//! silk-web - Whispering Silk oracle web service
//!
//! Serves the fortune-stick application's backend: redemption codes,
//! AI interpretation, and the payment boundary.

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use silk_web::config::{AppConfig, Cli};
use silk_web::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Whispering Silk (silk-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let config = AppConfig::resolve(&cli)?;

    if config.redeem_api_key.is_none() {
        warn!("SILK_REDEEM_API_KEY not configured - admin endpoints are unauthenticated");
    }
    if config.oracle.api_key.is_none() {
        warn!("SILK_OPENROUTER_API_KEY not configured - serving mock interpretations");
    }
    if config.paypal.is_none() {
        info!("Payment gateway credentials not configured - payment creation disabled");
    }

    let db_path = config.data_dir.join("silk.db");
    info!("Database path: {}", db_path.display());

    let pool = db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let bind_address = config.bind_address.clone();
    let state = AppState::new(pool, config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("silk-web listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
