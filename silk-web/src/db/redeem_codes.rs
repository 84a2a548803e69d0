//! Redeem-code table operations
//!
//! Rows are created only by the batch allocator and mutated only by the
//! verifier's conditional update; the service never deletes them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use silk_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_timestamp;

/// One redemption code row
#[derive(Debug, Clone, Serialize)]
pub struct RedeemCode {
    pub id: Uuid,
    pub code: String,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Admin list filter, mapping to the same predicates as the stats counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeFilter {
    #[default]
    All,
    Used,
    /// Unused and not yet expired
    Unused,
    /// Unused but past its shelf life
    Expired,
}

impl CodeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeFilter::All => "all",
            CodeFilter::Used => "used",
            CodeFilter::Unused => "unused",
            CodeFilter::Expired => "expired",
        }
    }
}

/// Aggregate counts for the admin console
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemStats {
    pub total: i64,
    pub used: i64,
    pub unused: i64,
    /// Unused codes past their shelf life
    pub expired_unused: i64,
    /// Codes redeemed within the last 7 days
    pub recent_used: i64,
    /// used/total as a percentage string with 2 decimals
    pub usage_rate: String,
}

/// Check whether a code string already exists
pub async fn code_exists(pool: &SqlitePool, code: &str) -> Result<bool> {
    let row = sqlx::query("SELECT code FROM redeem_codes WHERE code = ? LIMIT 1")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Insert a batch of codes in one transaction with a shared expiry
pub async fn insert_batch(
    pool: &SqlitePool,
    codes: &[String],
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let created_at = Utc::now();
    let mut tx = pool.begin().await?;

    for code in codes {
        sqlx::query(
            r#"
            INSERT INTO redeem_codes (id, code, is_used, expires_at, created_at)
            VALUES (?, ?, 0, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(code)
        .bind(expires_at.to_rfc3339())
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load a code row by its exact normalized code string
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<RedeemCode>> {
    let row = sqlx::query(
        r#"
        SELECT id, code, is_used, used_at, expires_at, created_at
        FROM redeem_codes
        WHERE code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_code(&r)).transpose()
}

/// Conditionally mark a code used (compare-and-swap on is_used).
///
/// The filter includes `is_used = 0`; zero affected rows means another
/// request won the race. Returns the number of rows affected.
pub async fn mark_used(
    pool: &SqlitePool,
    id: Uuid,
    used_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE redeem_codes
        SET is_used = 1, used_at = ?, expires_at = ?
        WHERE id = ? AND is_used = 0
        "#,
    )
    .bind(used_at.to_rfc3339())
    .bind(expires_at.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Aggregate counts over the code table
pub async fn fetch_stats(pool: &SqlitePool) -> Result<RedeemStats> {
    let now = Utc::now();
    let seven_days_ago = now - Duration::days(7);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM redeem_codes")
        .fetch_one(pool)
        .await?;

    let used: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM redeem_codes WHERE is_used = 1")
        .fetch_one(pool)
        .await?;

    let unused: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM redeem_codes WHERE is_used = 0")
        .fetch_one(pool)
        .await?;

    let expired_unused: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM redeem_codes WHERE is_used = 0 AND expires_at < ?",
    )
    .bind(now.to_rfc3339())
    .fetch_one(pool)
    .await?;

    let recent_used: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM redeem_codes WHERE is_used = 1 AND used_at >= ?",
    )
    .bind(seven_days_ago.to_rfc3339())
    .fetch_one(pool)
    .await?;

    Ok(RedeemStats {
        total,
        used,
        unused,
        expired_unused,
        recent_used,
        usage_rate: usage_rate(used, total),
    })
}

/// used/total as a percentage string with 2 decimals ("0.00" for an empty table)
pub fn usage_rate(used: i64, total: i64) -> String {
    if total == 0 {
        "0.00".to_string()
    } else {
        format!("{:.2}", used as f64 / total as f64 * 100.0)
    }
}

/// Paginated listing ordered newest-created-first.
///
/// Returns the page rows plus the total count under the same filter.
pub async fn list_codes(
    pool: &SqlitePool,
    page: i64,
    limit: i64,
    filter: CodeFilter,
) -> Result<(Vec<RedeemCode>, i64)> {
    let now = Utc::now().to_rfc3339();
    let (where_sql, bind_now) = match filter {
        CodeFilter::All => ("", false),
        CodeFilter::Used => ("WHERE is_used = 1", false),
        CodeFilter::Unused => ("WHERE is_used = 0 AND expires_at >= ?", true),
        CodeFilter::Expired => ("WHERE is_used = 0 AND expires_at < ?", true),
    };

    let count_sql = format!("SELECT COUNT(*) FROM redeem_codes {}", where_sql);
    let mut count_query = sqlx::query_scalar(&count_sql);
    if bind_now {
        count_query = count_query.bind(&now);
    }
    let total: i64 = count_query.fetch_one(pool).await?;

    let offset = (page - 1) * limit;
    let rows_sql = format!(
        r#"
        SELECT id, code, is_used, used_at, expires_at, created_at
        FROM redeem_codes
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut rows_query = sqlx::query(&rows_sql);
    if bind_now {
        rows_query = rows_query.bind(&now);
    }
    let rows = rows_query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let codes = rows
        .iter()
        .map(row_to_code)
        .collect::<Result<Vec<_>>>()?;

    Ok((codes, total))
}

fn row_to_code(row: &sqlx::sqlite::SqliteRow) -> Result<RedeemCode> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| silk_common::Error::Internal(format!("Invalid id in database: {}", e)))?;

    let used_at: Option<String> = row.get("used_at");
    let used_at = used_at.as_deref().map(parse_timestamp).transpose()?;

    let expires_at: String = row.get("expires_at");
    let created_at: String = row.get("created_at");

    Ok(RedeemCode {
        id,
        code: row.get("code"),
        is_used: row.get::<i64, _>("is_used") != 0,
        used_at,
        expires_at: parse_timestamp(&expires_at)?,
        created_at: parse_timestamp(&created_at)?,
    })
}
