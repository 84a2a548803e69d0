//! Redeem-code HTTP handlers
//!
//! Admin surface: POST /api/redeem/generate, GET /api/redeem/list,
//! GET /api/redeem/stats (gated by the API-key middleware).
//! Public surface: POST /api/redeem/verify.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::db::redeem_codes::{self, CodeFilter, RedeemCode};
use crate::error::{ApiError, ApiResult};
use crate::services::code_allocator::{self, AllocError, EXPIRES_IN_DAYS};
use crate::services::redeem_verifier::{self, RedeemError};
use crate::AppState;

/// Default page size for the admin list
const DEFAULT_LIMIT: i64 = 50;

/// Largest admin page size
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Number of codes to generate (clamped to 1-100, default 1)
    #[serde(default)]
    pub count: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub count: usize,
    pub codes: Vec<String>,
    pub expires_in_days: i64,
    pub message: String,
}

/// POST /api/redeem/generate
pub async fn generate_codes(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let requested = request.count.unwrap_or(1).clamp(1, 100) as usize;

    let batch = code_allocator::allocate_codes(&state.db, requested)
        .await
        .map_err(|err| match err {
            AllocError::Exhausted { .. } | AllocError::BatchConflict => {
                ApiError::Internal(err.to_string())
            }
            AllocError::Common(inner) => ApiError::Common(inner),
        })?;

    info!("Generated {} redemption codes", batch.codes.len());

    Ok(Json(GenerateResponse {
        success: true,
        count: batch.codes.len(),
        codes: batch.codes,
        expires_in_days: EXPIRES_IN_DAYS,
        message: format!("Generated {} redemption codes", requested),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub filter: CodeFilter,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub data: Vec<RedeemCode>,
    pub pagination: Pagination,
    pub filter: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// GET /api/redeem/list?page&limit&filter
pub async fn list_codes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, MAX_LIMIT);

    let (data, total) = redeem_codes::list_codes(&state.db, page, limit, query.filter).await?;
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ListResponse {
        success: true,
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
        filter: query.filter.as_str(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: redeem_codes::RedeemStats,
}

/// GET /api/redeem/stats
pub async fn redeem_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = redeem_codes::fetch_stats(&state.db).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub code: Option<String>,
}

/// POST /api/redeem/verify
pub async fn verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Response {
    let code = request.code.unwrap_or_default();
    if code.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Redemption code must not be empty", "valid": false })),
        )
            .into_response();
    }

    match redeem_verifier::redeem(&state.db, &code).await {
        Ok(redemption) => (
            StatusCode::OK,
            Json(json!({
                "valid": true,
                "message": "Redemption code accepted",
                "code": redemption.code,
                "usedAt": redemption.used_at,
                "expiresAt": redemption.expires_at,
            })),
        )
            .into_response(),
        Err(err) => redeem_error_response(err),
    }
}

/// Map each redemption failure to its own status and body so the client
/// can distinguish "doesn't exist" / "already used" / "expired" / "format".
fn redeem_error_response(err: RedeemError) -> Response {
    let (status, body) = match err {
        RedeemError::InvalidFormat => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Redemption code format is incorrect", "valid": false }),
        ),
        RedeemError::NotFound => (
            StatusCode::NOT_FOUND,
            json!({ "error": "Redemption code does not exist", "valid": false }),
        ),
        RedeemError::AlreadyUsed { used_at } => (
            StatusCode::BAD_REQUEST,
            json!({
                "error": "Redemption code has already been used",
                "valid": false,
                "usedAt": used_at,
            }),
        ),
        RedeemError::Expired { expires_at } => (
            StatusCode::BAD_REQUEST,
            json!({
                "error": "Redemption code has expired",
                "valid": false,
                "expiresAt": expires_at,
            }),
        ),
        RedeemError::RaceLost => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Verification failed, please try again", "valid": false }),
        ),
        RedeemError::Common(inner) => {
            error!("Redemption failed: {}", inner);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Server error, please try again later", "valid": false }),
            )
        }
    };

    (status, Json(body)).into_response()
}
