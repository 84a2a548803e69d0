//! HTTP API handlers for silk-web

pub mod auth;
pub mod health;
pub mod interpret;
pub mod payment;
pub mod redeem;

pub use auth::require_api_key;
pub use health::health_routes;
