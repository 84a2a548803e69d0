//! Redemption code verification
//!
//! Validates a user-submitted code, then atomically transitions it to used
//! via a conditional update. The update's `is_used = 0` filter is the
//! compare-and-swap primitive that guarantees at-most-one successful
//! redemption per code under concurrent requests, without a transaction.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::redeem_codes;

/// Validity window granted at redemption (the expiry clock restarts)
pub const REDEMPTION_VALID_DAYS: i64 = 90;

/// Redemption failure modes, each surfaced distinctly to the client
#[derive(Debug, Error)]
pub enum RedeemError {
    #[error("Redemption code format is incorrect")]
    InvalidFormat,

    #[error("Redemption code does not exist")]
    NotFound,

    #[error("Redemption code has already been used")]
    AlreadyUsed { used_at: Option<DateTime<Utc>> },

    #[error("Redemption code has expired")]
    Expired { expires_at: DateTime<Utc> },

    /// The conditional update affected zero rows but the re-read found the
    /// code still unused. Safe for the client to retry.
    #[error("Verification failed, please try again")]
    RaceLost,

    #[error(transparent)]
    Common(#[from] silk_common::Error),
}

/// A successful redemption
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub code: String,
    pub used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Normalize a user-submitted code into canonical `XXXX-XXXX-XXXX` form.
///
/// Trims, uppercases, and strips internal whitespace; accepts the canonical
/// hyphenated form or a bare 12-character form (auto-hyphenated).
pub fn normalize_code(raw: &str) -> Result<String, RedeemError> {
    let cleaned: String = raw
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if is_canonical(&cleaned) {
        return Ok(cleaned);
    }

    if cleaned.len() == 12 && cleaned.chars().all(is_code_char) {
        return Ok(format!(
            "{}-{}-{}",
            &cleaned[0..4],
            &cleaned[4..8],
            &cleaned[8..12]
        ));
    }

    Err(RedeemError::InvalidFormat)
}

fn is_code_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

fn is_canonical(code: &str) -> bool {
    code.len() == 14
        && code.char_indices().all(|(i, c)| {
            if i == 4 || i == 9 {
                c == '-'
            } else {
                is_code_char(c)
            }
        })
}

/// Redeem a code: normalize, look up, check state, and conditionally mark
/// used with a fresh 90-day expiry computed from the redemption time.
pub async fn redeem(pool: &SqlitePool, raw_code: &str) -> Result<Redemption, RedeemError> {
    let code = normalize_code(raw_code)?;

    let Some(row) = redeem_codes::find_by_code(pool, &code).await? else {
        return Err(RedeemError::NotFound);
    };

    if row.is_used {
        return Err(RedeemError::AlreadyUsed {
            used_at: row.used_at,
        });
    }

    // Expiry is only evaluated on used rows; an unused code keeps its shelf
    // life until redeemed.
    if row.is_used && row.expires_at < Utc::now() {
        return Err(RedeemError::Expired {
            expires_at: row.expires_at,
        });
    }

    let used_at = Utc::now();
    let expires_at = used_at + Duration::days(REDEMPTION_VALID_DAYS);

    let affected = redeem_codes::mark_used(pool, row.id, used_at, expires_at).await?;
    if affected == 0 {
        // Lost the race. Re-read to distinguish "someone else redeemed it"
        // from a transient store failure.
        return match redeem_codes::find_by_code(pool, &code).await? {
            Some(current) if current.is_used => Err(RedeemError::AlreadyUsed {
                used_at: current.used_at,
            }),
            _ => Err(RedeemError::RaceLost),
        };
    }

    Ok(Redemption {
        code,
        used_at,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_canonical_form() {
        let code = normalize_code("ABCD-EFGH-JKLM").unwrap();
        assert_eq!(code, "ABCD-EFGH-JKLM");
    }

    #[test]
    fn normalize_hyphenates_bare_form() {
        let code = normalize_code("ABCDEFGHJKLM").unwrap();
        assert_eq!(code, "ABCD-EFGH-JKLM");
    }

    #[test]
    fn normalize_uppercases_and_strips_whitespace() {
        let code = normalize_code("  abcd efgh jklm  ").unwrap();
        assert_eq!(code, "ABCD-EFGH-JKLM");
    }

    #[test]
    fn normalize_rejects_short_input() {
        assert!(matches!(
            normalize_code("abc"),
            Err(RedeemError::InvalidFormat)
        ));
    }

    #[test]
    fn normalize_rejects_bad_charset() {
        assert!(matches!(
            normalize_code("ABCD-EFGH-JK!M"),
            Err(RedeemError::InvalidFormat)
        ));
    }

    #[test]
    fn normalize_rejects_misplaced_hyphens() {
        assert!(matches!(
            normalize_code("ABC-DEFGH-JKLM"),
            Err(RedeemError::InvalidFormat)
        ));
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(matches!(normalize_code(""), Err(RedeemError::InvalidFormat)));
    }
}
