//! Interpretation HTTP handler
//!
//! POST /api/interpret - builds the oracle prompt from the drawn stick and
//! the seeker's question, runs the model fallback loop, and returns the
//! normalized three-field reading. Malformed upstream content never
//! surfaces as an error; upstream exhaustion does, with remediation hints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use silk_common::api::FortuneStick;

use crate::services::oracle_client::OracleError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InterpretRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, rename = "fortuneStick")]
    pub fortune_stick: Option<FortuneStick>,
}

/// POST /api/interpret
pub async fn interpret(
    State(state): State<AppState>,
    Json(request): Json<InterpretRequest>,
) -> Response {
    let Some(stick) = request.fortune_stick else {
        return missing_parameters();
    };
    let question = request.question.unwrap_or_default();
    let question = question.trim();
    if question.is_empty() {
        return missing_parameters();
    }

    match state.oracle.interpret(&stick, question).await {
        Ok(interpretation) => Json(interpretation).into_response(),
        Err(err) => oracle_error_response(err),
    }
}

fn missing_parameters() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Missing required parameters" })),
    )
        .into_response()
}

fn oracle_error_response(err: OracleError) -> Response {
    match err {
        OracleError::AllModelsUnavailable { last } => {
            let details = last.map(|failure| failure.message).unwrap_or_else(|| {
                "None of the configured models are available in your region. Please try \
                 using a VPN or contact support."
                    .to_string()
            });
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "All models unavailable",
                    "details": details,
                    "suggestion": "Set SILK_MODEL to pin a different model, or use a VPN to \
                                   access region-restricted models.",
                })),
            )
                .into_response()
        }
        OracleError::Upstream { status, message } => {
            error!("Upstream API error ({}): {}", status, message);
            let details = match status {
                401 => "Invalid API key. Please check the configured OpenRouter API key."
                    .to_string(),
                403 => "This model is not available in your region. The system will try \
                        alternative models automatically."
                    .to_string(),
                429 => "Rate limit exceeded. Please try again later.".to_string(),
                _ => format!("API returned status {}: {}", status, message),
            };
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(json!({ "error": message, "details": details })),
            )
                .into_response()
        }
        OracleError::Transport(err) => {
            error!("Interpretation transport error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": err.to_string(),
                    "details": "Network error. Please check your internet connection and try \
                                again.",
                })),
            )
                .into_response()
        }
    }
}
