//! Domain services and upstream clients

pub mod code_allocator;
pub mod code_generator;
pub mod normalizer;
pub mod oracle_client;
pub mod paypal_client;
pub mod prompt;
pub mod redeem_verifier;

pub use code_allocator::{allocate_codes, AllocatedBatch, AllocError};
pub use code_generator::generate_code;
pub use normalizer::normalize;
pub use oracle_client::{OracleClient, OracleError};
pub use paypal_client::{PayPalClient, PayPalError};
pub use redeem_verifier::{redeem, RedeemError, Redemption};
