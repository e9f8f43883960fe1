use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct TransactionsRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilters {
    pub user_id: Option<i64>,
    pub status: Option<String>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub charge_id: String,
    pub amount_subunits: i64,
    pub currency: String,
    pub channel: String,
    pub status: String,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const RECORD_COLUMNS: &str = "id, user_id, charge_id, amount_subunits, currency, channel, status, failure_code, failure_message, meta, created_at, updated_at";

impl TransactionsRepo {
    pub async fn list(
        &self,
        filters: &TransactionFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM transactions
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR channel = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filters.user_id)
        .bind(&filters.status)
        .bind(&filters.channel)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(to_record).collect())
    }

    pub async fn count(&self, filters: &TransactionFilters) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM transactions
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR channel = $3)
            "#,
        )
        .bind(filters.user_id)
        .bind(&filters.status)
        .bind(&filters.channel)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    pub async fn get_by_pk(&self, id: i64) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(to_record))
    }

    pub async fn get_by_charge_id(&self, charge_id: &str) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM transactions WHERE charge_id = $1"
        ))
        .bind(charge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(to_record))
    }
}

fn to_record(row: &sqlx::postgres::PgRow) -> TransactionRecord {
    TransactionRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        charge_id: row.get("charge_id"),
        amount_subunits: row.get("amount_subunits"),
        currency: row.get("currency"),
        channel: row.get("channel"),
        status: row.get("status"),
        failure_code: row.get("failure_code"),
        failure_message: row.get("failure_message"),
        meta: row.get("meta"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
