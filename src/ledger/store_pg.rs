use crate::error::LedgerError;
use crate::ledger::{LedgerStore, TransactionSnapshot, UpsertReceipt};
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct PgLedgerStore {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerStore {
    async fn upsert_by_charge_id(
        &self,
        snapshot: &TransactionSnapshot,
    ) -> Result<UpsertReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO transactions (
                user_id, charge_id, amount_subunits, currency, channel,
                status, failure_code, failure_message, raw_payload, meta
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            ON CONFLICT (charge_id) DO UPDATE SET
                user_id = COALESCE(EXCLUDED.user_id, transactions.user_id),
                amount_subunits = EXCLUDED.amount_subunits,
                currency = EXCLUDED.currency,
                channel = EXCLUDED.channel,
                status = EXCLUDED.status,
                failure_code = EXCLUDED.failure_code,
                failure_message = EXCLUDED.failure_message,
                raw_payload = EXCLUDED.raw_payload,
                meta = EXCLUDED.meta,
                updated_at = now()
            RETURNING id, user_id
            "#,
        )
        .bind(snapshot.user_id)
        .bind(&snapshot.charge_id)
        .bind(snapshot.amount_subunits)
        .bind(&snapshot.currency)
        .bind(&snapshot.channel)
        .bind(&snapshot.status)
        .bind(&snapshot.failure_code)
        .bind(&snapshot.failure_message)
        .bind(&snapshot.raw_payload)
        .bind(&snapshot.meta)
        .fetch_one(tx.as_mut())
        .await?;

        // The settle claim. Row-locked with the upsert in one transaction:
        // of any number of concurrent deliveries for this charge, exactly one
        // sees credited_at IS NULL.
        let claimed = sqlx::query(
            r#"
            UPDATE transactions
            SET credited_at = now()
            WHERE charge_id = $1
              AND status = 'successful'
              AND credited_at IS NULL
              AND user_id IS NOT NULL
            RETURNING id
            "#,
        )
        .bind(&snapshot.charge_id)
        .fetch_optional(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(UpsertReceipt {
            transaction_id: row.get("id"),
            user_id: row.get("user_id"),
            credit_due: claimed.is_some(),
        })
    }

    async fn increment_user_balance(
        &self,
        user_id: i64,
        amount_major: f64,
    ) -> Result<(), LedgerError> {
        sqlx::query("UPDATE users SET balance = balance + $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(amount_major)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
