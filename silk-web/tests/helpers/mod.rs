//! Shared helpers for silk-web integration tests

use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use silk_web::config::{AppConfig, OracleConfig};
use silk_web::services::oracle_client::DEFAULT_MODELS;
use silk_web::{build_router, db, AppState};

/// A router backed by a fresh temp-dir database
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    // Keeps the database directory alive for the test's duration
    _dir: TempDir,
}

/// Build a test app; `redeem_api_key` gates the admin endpoints.
pub async fn setup(redeem_api_key: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = db::init_database_pool(&dir.path().join("silk.db"))
        .await
        .expect("Failed to initialize database");

    let config = AppConfig {
        bind_address: "127.0.0.1:0".to_string(),
        data_dir: dir.path().to_path_buf(),
        redeem_api_key: redeem_api_key.map(str::to_string),
        app_url: "http://localhost:3000".to_string(),
        oracle: OracleConfig {
            // No key: the oracle client serves mock interpretations
            api_key: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            referer: "http://localhost:3000".to_string(),
            title: "Whispering Silk".to_string(),
        },
        paypal: None,
    };

    let state = AppState::new(pool.clone(), config).expect("Failed to build app state");

    TestApp {
        router: build_router(state),
        pool,
        _dir: dir,
    }
}

/// Issue one request against the router and decode the JSON body.
pub async fn request(
    router: &Router,
    method: Method,
    path: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    let request = match body {
        Some(json_body) => builder
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Assert a code string is in canonical `XXXX-XXXX-XXXX` form over the
/// 32-symbol alphabet (no 0, O, 1, I).
pub fn assert_canonical_code(code: &str) {
    const ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let segments: Vec<&str> = code.split('-').collect();
    assert_eq!(segments.len(), 3, "code: {}", code);
    for segment in segments {
        assert_eq!(segment.len(), 4, "code: {}", code);
        assert!(
            segment.chars().all(|c| ALPHABET.contains(c)),
            "code: {}",
            code
        );
    }
}
