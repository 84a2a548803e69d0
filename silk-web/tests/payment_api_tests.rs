//! Integration tests for the payment boundary
//!
//! The gateway itself is external; these tests exercise record lifecycle,
//! status polling, and webhook idempotency around it.

mod helpers;

use http::{Method, StatusCode};
use serde_json::json;

use silk_web::db::payments::{self, NewPayment, PaymentStatus};

use helpers::{request, setup};

#[tokio::test]
async fn create_without_gateway_credentials_is_rejected() {
    let app = setup(None).await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/api/payment/create",
        None,
        Some(json!({ "stickNumber": 7, "question": "Will it work out?" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("credentials not configured"));
}

#[tokio::test]
async fn status_requires_payment_id() {
    let app = setup(None).await;

    let (status, body) =
        request(&app.router, Method::GET, "/api/payment/status", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing payment_id"));
}

#[tokio::test]
async fn status_reports_pending_payment() {
    let app = setup(None).await;

    let record = payments::insert_pending(
        &app.pool,
        &NewPayment {
            amount: 1.99,
            currency: "USD".to_string(),
            stick_number: Some(7),
            question: Some("Will it work out?".to_string()),
        },
    )
    .await
    .unwrap();

    let (status, body) = request(
        &app.router,
        Method::GET,
        &format!("/api/payment/status?payment_id={}", record.id),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("pending"));
    assert_eq!(body["completed"], json!(false));
    assert_eq!(body["amount"], json!(1.99));
    assert_eq!(body["currency"], json!("USD"));
}

#[tokio::test]
async fn status_unknown_payment_is_404() {
    let app = setup(None).await;

    let (status, _) = request(
        &app.router,
        Method::GET,
        "/api/payment/status?payment_id=00000000-0000-0000-0000-000000000000",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_ignores_unrelated_events() {
    let app = setup(None).await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/api/payment/webhook",
        None,
        Some(json!({ "event_type": "BILLING.PLAN.CREATED", "resource": {} })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], json!(true));
}

#[tokio::test]
async fn webhook_completes_payment_idempotently() {
    let app = setup(None).await;

    let record = payments::insert_pending(
        &app.pool,
        &NewPayment {
            amount: 1.99,
            currency: "USD".to_string(),
            stick_number: Some(3),
            question: None,
        },
    )
    .await
    .unwrap();
    payments::set_gateway_order_id(&app.pool, record.id, "ORDER-123")
        .await
        .unwrap();

    let event = json!({
        "event_type": "PAYMENT.CAPTURE.COMPLETED",
        "resource": { "id": "ORDER-123" },
    });

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/api/payment/webhook",
        None,
        Some(event.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], json!(true));

    let payment = payments::find_by_id(&app.pool, record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.completed_at.is_some());
    let first_completed_at = payment.completed_at;

    // A duplicate delivery is acknowledged without touching the row again
    let (status, _) = request(
        &app.router,
        Method::POST,
        "/api/payment/webhook",
        None,
        Some(event),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let payment = payments::find_by_id(&app.pool, record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.completed_at, first_completed_at);
}

#[tokio::test]
async fn webhook_for_unknown_order_is_acknowledged() {
    let app = setup(None).await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/api/payment/webhook",
        None,
        Some(json!({
            "event_type": "CHECKOUT.ORDER.COMPLETED",
            "resource": { "id": "NEVER-SEEN" },
        })),
    )
    .await;

    // The webhook can arrive before the callback stores the order id
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], json!(true));
}
