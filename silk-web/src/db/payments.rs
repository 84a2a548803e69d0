//! Payment record operations
//!
//! Rows are created pending by the payment-initiation endpoint and
//! transitioned to completed by the gateway callback or webhook.

use chrono::{DateTime, Utc};
use serde::Serialize;
use silk_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_timestamp;

/// Payment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }

    fn parse(value: &str) -> Self {
        if value == "completed" {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        }
    }
}

/// One payment row
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub stick_number: Option<i64>,
    pub question: Option<String>,
    /// Externally issued gateway order id
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields for a new pending payment
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: f64,
    pub currency: String,
    pub stick_number: Option<i64>,
    pub question: Option<String>,
}

/// Insert a new pending payment record (anonymous flow, user_id NULL)
pub async fn insert_pending(pool: &SqlitePool, payment: &NewPayment) -> Result<PaymentRecord> {
    let id = Uuid::new_v4();
    let created_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO payments (id, user_id, amount, currency, status, stick_number, question, created_at)
        VALUES (?, NULL, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(payment.stick_number)
    .bind(&payment.question)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(PaymentRecord {
        id,
        user_id: None,
        amount: payment.amount,
        currency: payment.currency.clone(),
        status: PaymentStatus::Pending,
        stick_number: payment.stick_number,
        question: payment.question.clone(),
        gateway_order_id: None,
        created_at,
        completed_at: None,
    })
}

/// Load a payment row by its id
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<PaymentRecord>> {
    let row = sqlx::query("SELECT * FROM payments WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_payment(&r)).transpose()
}

/// Load a payment row by the gateway's order id
pub async fn find_by_gateway_order_id(
    pool: &SqlitePool,
    gateway_order_id: &str,
) -> Result<Option<PaymentRecord>> {
    let row = sqlx::query("SELECT * FROM payments WHERE gateway_order_id = ?")
        .bind(gateway_order_id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_payment(&r)).transpose()
}

/// Save the gateway order id issued for a payment
pub async fn set_gateway_order_id(
    pool: &SqlitePool,
    id: Uuid,
    gateway_order_id: &str,
) -> Result<()> {
    sqlx::query("UPDATE payments SET gateway_order_id = ? WHERE id = ?")
        .bind(gateway_order_id)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark a payment completed, stamping completed_at
pub async fn mark_completed(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE payments SET status = 'completed', completed_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

fn row_to_payment(row: &sqlx::sqlite::SqliteRow) -> Result<PaymentRecord> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| silk_common::Error::Internal(format!("Invalid id in database: {}", e)))?;

    let status: String = row.get("status");

    let created_at: String = row.get("created_at");
    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at.as_deref().map(parse_timestamp).transpose()?;

    Ok(PaymentRecord {
        id,
        user_id: row.get("user_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        status: PaymentStatus::parse(&status),
        stick_number: row.get("stick_number"),
        question: row.get("question"),
        gateway_order_id: row.get("gateway_order_id"),
        created_at: parse_timestamp(&created_at)?,
        completed_at,
    })
}
