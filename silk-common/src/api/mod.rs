//! Shared API/domain types
//!
//! Types exchanged between the HTTP layer, the interpretation services,
//! and (client-side) the page code. Pure data, no framework dependencies.

pub mod types;

pub use types::{FortuneStick, Interpretation};
