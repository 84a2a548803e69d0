//! Integration tests for the interpretation endpoint
//!
//! With no gateway key configured the oracle client serves deterministic
//! mock readings, which lets the full request path run offline.

mod helpers;

use http::{Method, StatusCode};
use serde_json::json;

use helpers::{request, setup};

fn stick() -> serde_json::Value {
    json!({
        "number": 42,
        "level": "上吉",
        "levelEN": "High Resonance",
        "content": "云开月出正分明",
        "contentEN": "The clouds part and the moon shines clear",
        "storyEN": "The Pathfinder",
        "detail2EN": "the road reveals itself to those who walk"
    })
}

#[tokio::test]
async fn interpret_returns_three_populated_fields() {
    let app = setup(None).await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/api/interpret",
        None,
        Some(json!({
            "question": "Should I take the new position?",
            "fortuneStick": stick(),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    for field in ["resonance", "weaving", "ritual"] {
        let value = body[field].as_str().unwrap();
        assert!(!value.is_empty(), "{} must not be empty", field);
    }
    assert!(body["resonance"].as_str().unwrap().contains("Lot #42"));
    assert!(body["resonance"].as_str().unwrap().contains("High Resonance"));
    assert!(body["weaving"]
        .as_str()
        .unwrap()
        .contains("the road reveals itself"));
}

#[tokio::test]
async fn interpret_requires_question_and_stick() {
    let app = setup(None).await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/api/interpret",
        None,
        Some(json!({ "question": "Will it rain?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing required parameters"));

    let (status, _) = request(
        &app.router,
        Method::POST,
        "/api/interpret",
        None,
        Some(json!({ "fortuneStick": stick() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app.router,
        Method::POST,
        "/api/interpret",
        None,
        Some(json!({ "question": "   ", "fortuneStick": stick() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
