//! PayPal Checkout API client
//!
//! Thin boundary wrapper around the two gateway operations the payment
//! flow needs: create-order and capture-order. Authentication uses the
//! client-credentials grant per request pair.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::PayPalConfig;

const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
const LIVE_BASE_URL: &str = "https://api-m.paypal.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BRAND_NAME: &str = "Whispering Silk";

/// Gateway errors
#[derive(Debug, Error)]
pub enum PayPalError {
    #[error("PayPal authentication failed: {0}")]
    Auth(String),

    #[error("PayPal API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed PayPal response: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Fields for a new gateway order
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Our payment record id, echoed back by the gateway
    pub reference_id: String,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub return_url: String,
    pub cancel_url: String,
}

/// A created gateway order
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order_id: String,
    pub approval_url: String,
}

/// Result of capturing an order
#[derive(Debug, Clone)]
pub struct CapturedOrder {
    pub order_id: String,
    pub completed: bool,
}

/// PayPal Checkout client
pub struct PayPalClient {
    http: Client,
    client_id: String,
    client_secret: String,
    base_url: &'static str,
}

impl PayPalClient {
    pub fn new(config: &PayPalConfig) -> Result<Self, PayPalError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            base_url: if config.live {
                LIVE_BASE_URL
            } else {
                SANDBOX_BASE_URL
            },
        })
    }

    /// Obtain an access token via the client-credentials grant
    async fn access_token(&self) -> Result<String, PayPalError> {
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PayPalError::Auth(format!("status {}: {}", status, body)));
        }

        let body: Value = response.json().await?;
        body.get("access_token")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| PayPalError::Malformed("missing access_token".to_string()))
    }

    /// Create a capture-intent order and return its approval URL.
    pub async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, PayPalError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(&token)
            .header("PayPal-Request-Id", &order.reference_id)
            .json(&json!({
                "intent": "CAPTURE",
                "purchase_units": [{
                    "reference_id": order.reference_id,
                    "description": order.description,
                    "amount": {
                        "currency_code": order.currency,
                        "value": format!("{:.2}", order.amount),
                    },
                }],
                "application_context": {
                    "brand_name": BRAND_NAME,
                    "landing_page": "NO_PREFERENCE",
                    "user_action": "PAY_NOW",
                    "return_url": order.return_url,
                    "cancel_url": order.cancel_url,
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response.json().await?;
        let order_id = body
            .get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| PayPalError::Malformed("missing order id".to_string()))?;

        let approval_url = body
            .get("links")
            .and_then(|links| links.as_array())
            .and_then(|links| {
                links.iter().find(|link| {
                    link.get("rel").and_then(|rel| rel.as_str()) == Some("approve")
                })
            })
            .and_then(|link| link.get("href"))
            .and_then(|href| href.as_str())
            .map(str::to_string)
            .ok_or_else(|| PayPalError::Malformed("no approval URL in response".to_string()))?;

        Ok(CreatedOrder {
            order_id,
            approval_url,
        })
    }

    /// Capture an approved order, completing the payment.
    pub async fn capture_order(&self, order_id: &str) -> Result<CapturedOrder, PayPalError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url, order_id
            ))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response.json().await?;
        let captured_id = body
            .get("id")
            .and_then(|id| id.as_str())
            .unwrap_or(order_id)
            .to_string();
        let completed = body.get("status").and_then(|s| s.as_str()) == Some("COMPLETED");

        Ok(CapturedOrder {
            order_id: captured_id,
            completed,
        })
    }
}

async fn api_error(response: reqwest::Response) -> PayPalError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    PayPalError::Api { status, message }
}
