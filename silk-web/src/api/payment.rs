//! Payment HTTP handlers
//!
//! The gateway is an external collaborator: create-order and capture-order
//! go through the PayPal client, completion arrives via the browser
//! callback or the gateway webhook (whichever lands first - both are
//! idempotent on the payment row).

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};
use uuid::Uuid;

use crate::db::payments::{self, NewPayment, PaymentStatus};
use crate::error::{ApiError, ApiResult};
use crate::services::paypal_client::OrderRequest;
use crate::AppState;

/// Default price of one AI deep interpretation
const DEFAULT_AMOUNT: f64 = 1.99;
const DEFAULT_CURRENCY: &str = "USD";

/// Gateway webhook events that complete a payment
const COMPLETION_EVENTS: [&str; 2] = ["PAYMENT.CAPTURE.COMPLETED", "CHECKOUT.ORDER.COMPLETED"];

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, rename = "stickNumber")]
    pub stick_number: Option<i64>,
    #[serde(default)]
    pub question: Option<String>,
}

fn default_amount() -> f64 {
    DEFAULT_AMOUNT
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// POST /api/payment/create
///
/// Creates a pending payment record, then a gateway order keyed by it, and
/// returns the approval URL for the browser to follow.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> ApiResult<Json<Value>> {
    let record = payments::insert_pending(
        &state.db,
        &NewPayment {
            amount: request.amount,
            currency: request.currency.clone(),
            stick_number: request.stick_number,
            question: request.question.clone(),
        },
    )
    .await?;

    let Some(paypal) = &state.paypal else {
        return Err(ApiError::Internal(
            "Payment gateway credentials not configured".to_string(),
        ));
    };

    let lot = request
        .stick_number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());

    let order = paypal
        .create_order(&OrderRequest {
            reference_id: record.id.to_string(),
            description: format!("AI Deep Interpretation - Lot #{}", lot),
            amount: request.amount,
            currency: request.currency,
            return_url: format!(
                "{}/api/payment/callback?payment_id={}",
                state.config.app_url, record.id
            ),
            cancel_url: format!("{}/result-en?payment=cancelled", state.config.app_url),
        })
        .await
        .map_err(|err| {
            error!("PayPal order creation failed: {}", err);
            ApiError::Internal(format!("Failed to create PayPal order: {}", err))
        })?;

    payments::set_gateway_order_id(&state.db, record.id, &order.order_id).await?;

    Ok(Json(json!({
        "success": true,
        "paymentId": record.id,
        "orderId": order.order_id,
        "paymentUrl": order.approval_url,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// GET /api/payment/status?payment_id=...
///
/// Polled by the frontend while the user completes checkout.
pub async fn payment_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Value>> {
    let Some(payment_id) = query.payment_id else {
        return Err(ApiError::BadRequest("Missing payment_id".to_string()));
    };
    let id = Uuid::parse_str(&payment_id)
        .map_err(|_| ApiError::NotFound("Payment not found".to_string()))?;

    let Some(payment) = payments::find_by_id(&state.db, id).await? else {
        return Err(ApiError::NotFound("Payment not found".to_string()));
    };

    Ok(Json(json!({
        "paymentId": payment.id,
        "status": payment.status.as_str(),
        "amount": payment.amount,
        "currency": payment.currency,
        "completed": payment.status == PaymentStatus::Completed,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub payment_id: Option<String>,
    /// Gateway order token appended by PayPal on return
    #[serde(default)]
    pub token: Option<String>,
    /// Development-mode flag: complete without touching the gateway
    #[serde(default)]
    pub mock: Option<String>,
}

/// GET /api/payment/callback
///
/// The browser lands here after approving the order. Captures the order,
/// marks the payment completed, and redirects into the app. Failures
/// redirect with an error query parameter instead of rendering JSON.
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let app_url = &state.config.app_url;

    let Some(id) = query
        .payment_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
    else {
        return error_redirect(app_url, "missing_payment_id");
    };

    // Development-mode mock checkout: complete directly
    if query.mock.as_deref() == Some("true") {
        if let Err(err) = payments::mark_completed(&state.db, id).await {
            error!("Mock payment completion failed: {}", err);
        }
        return Redirect::temporary(&format!("{}/interpret", app_url)).into_response();
    }

    let Some(paypal) = &state.paypal else {
        return error_redirect(app_url, "paypal_not_configured");
    };

    let payment = match payments::find_by_id(&state.db, id).await {
        Ok(Some(payment)) => payment,
        Ok(None) => return error_redirect(app_url, "payment_not_found"),
        Err(err) => {
            error!("Payment lookup failed: {}", err);
            return error_redirect(app_url, "callback_error");
        }
    };

    // Prefer the order id we stored at creation; fall back to the token
    // PayPal appended on return
    let Some(order_id) = payment.gateway_order_id.or(query.token) else {
        return error_redirect(app_url, "missing_order_id");
    };

    let captured = match paypal.capture_order(&order_id).await {
        Ok(captured) => captured,
        Err(err) => {
            error!("PayPal capture failed: {}", err);
            return error_redirect(app_url, "payment_capture_failed");
        }
    };

    if !captured.completed {
        return error_redirect(app_url, "payment_not_completed");
    }

    if let Err(err) = payments::mark_completed(&state.db, id).await {
        error!("Payment completion update failed: {}", err);
        return error_redirect(app_url, "callback_error");
    }

    Redirect::temporary(&format!("{}/interpret", app_url)).into_response()
}

fn error_redirect(app_url: &str, code: &str) -> Response {
    Redirect::temporary(&format!("{}/?error={}", app_url, code)).into_response()
}

/// POST /api/payment/webhook
///
/// Gateway event notifications. The webhook may arrive before the browser
/// callback; unknown events and unknown orders are acknowledged so the
/// gateway does not retry forever.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    let event_type = body.get("event_type").and_then(|e| e.as_str());
    if !event_type.is_some_and(|event| COMPLETION_EVENTS.contains(&event)) {
        return Json(json!({ "received": true })).into_response();
    }

    let resource = body.get("resource");
    let order_id = resource
        .and_then(|r| r.get("id"))
        .and_then(|id| id.as_str())
        .or_else(|| {
            resource
                .and_then(|r| r.get("supplementary_data"))
                .and_then(|s| s.get("related_ids"))
                .and_then(|ids| ids.get("order_id"))
                .and_then(|id| id.as_str())
        });

    let Some(order_id) = order_id else {
        warn!("Payment webhook without an order id");
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing order ID" })),
        )
            .into_response();
    };

    let payment = match payments::find_by_gateway_order_id(&state.db, order_id).await {
        Ok(Some(payment)) => payment,
        Ok(None) => {
            // The webhook can beat the callback; nothing to update yet
            return Json(json!({ "received": true })).into_response();
        }
        Err(err) => {
            error!("Webhook payment lookup failed: {}", err);
            return (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Webhook processing failed" })),
            )
                .into_response();
        }
    };

    if payment.status == PaymentStatus::Completed {
        return Json(json!({ "received": true })).into_response();
    }

    if let Err(err) = payments::mark_completed(&state.db, payment.id).await {
        error!("Webhook payment update failed: {}", err);
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Update failed" })),
        )
            .into_response();
    }

    Json(json!({ "received": true })).into_response()
}
