//! Admin API-key middleware
//!
//! The redeem-code management endpoints are gated by an `x-api-key` header
//! compared against the configured admin key. With no key configured the
//! check is disabled - a deliberate works-out-of-the-box default, logged
//! loudly at startup.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Header carrying the admin key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject admin requests whose `x-api-key` header does not match the
/// configured key. Applied to the admin subrouter only.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = state.config.redeem_api_key.as_deref() {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected) {
            warn!("Rejected admin request with missing or invalid API key");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response();
        }
    }

    next.run(request).await
}
