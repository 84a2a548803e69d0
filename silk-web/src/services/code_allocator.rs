//! Batch allocation of unique redemption codes
//!
//! Generates candidates until the requested count of store-unique codes is
//! reached, then persists them in one transaction with a shared expiry.
//! Generation attempts are capped at count x 10, which turns a
//! birthday-problem pathology into an explicit, reportable failure.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;

use crate::db::redeem_codes;
use crate::services::code_generator::generate_code;

/// Shelf life of a freshly generated code
pub const EXPIRES_IN_DAYS: i64 = 90;

/// Largest batch a single request may allocate
pub const MAX_BATCH_SIZE: usize = 100;

/// Generation attempts allowed per requested code
const ATTEMPT_MULTIPLIER: usize = 10;

/// Allocation errors
#[derive(Debug, Error)]
pub enum AllocError {
    #[error("Could not generate enough unique codes: produced {produced} of {requested}")]
    Exhausted { produced: usize, requested: usize },

    /// A concurrent allocation persisted one of our candidates first.
    /// The unique index caught it; the batch was retried and lost again.
    #[error("Code batch collided with a concurrent allocation, please retry")]
    BatchConflict,

    #[error(transparent)]
    Common(#[from] silk_common::Error),
}

/// A successfully persisted batch
#[derive(Debug, Clone)]
pub struct AllocatedBatch {
    pub codes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Allocate `count` unique codes (clamped to 1-100) and persist them with
/// `is_used = 0` and a shared expiry 90 days out.
pub async fn allocate_codes(pool: &SqlitePool, count: usize) -> Result<AllocatedBatch, AllocError> {
    let count = count.clamp(1, MAX_BATCH_SIZE);

    // The existence check and the insert are not one atomic step. The
    // unique index on `code` turns the residual cross-process race into an
    // insert failure, retried once with fresh candidates.
    for _ in 0..2 {
        let codes = gather_unique_candidates(pool, count).await?;
        let expires_at = Utc::now() + Duration::days(EXPIRES_IN_DAYS);

        match redeem_codes::insert_batch(pool, &codes, expires_at).await {
            Ok(()) => return Ok(AllocatedBatch { codes, expires_at }),
            Err(err) if is_unique_violation(&err) => {
                warn!("Code batch lost a uniqueness race, regenerating: {}", err);
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AllocError::BatchConflict)
}

/// Generate candidates until `count` codes unseen by the store (and unseen
/// within this batch) are collected, within the attempt budget.
async fn gather_unique_candidates(
    pool: &SqlitePool,
    count: usize,
) -> Result<Vec<String>, AllocError> {
    let max_attempts = count * ATTEMPT_MULTIPLIER;
    let mut codes: Vec<String> = Vec::with_capacity(count);
    let mut attempts = 0;

    while codes.len() < count && attempts < max_attempts {
        attempts += 1;
        let code = generate_code();

        if codes.contains(&code) {
            continue;
        }
        if redeem_codes::code_exists(pool, &code)
            .await
            .map_err(AllocError::Common)?
        {
            continue;
        }

        codes.push(code);
    }

    if codes.len() < count {
        return Err(AllocError::Exhausted {
            produced: codes.len(),
            requested: count,
        });
    }

    Ok(codes)
}

fn is_unique_violation(err: &silk_common::Error) -> bool {
    match err {
        silk_common::Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}
