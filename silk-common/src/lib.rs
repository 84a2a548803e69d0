//! # Silk Common Library
//!
//! Shared code for the Whispering Silk web service:
//! - Common error type
//! - Configuration file loading
//! - API/domain types shared between handlers and services

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};
