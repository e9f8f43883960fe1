use crate::domain::charge::{Charge, USER_ID_METADATA_KEY};
use crate::error::LedgerError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod store_memory;
pub mod store_pg;

/// The snapshot written to the ledger for one observation of a charge.
#[derive(Debug, Clone)]
pub struct TransactionSnapshot {
    pub user_id: Option<i64>,
    pub charge_id: String,
    pub amount_subunits: i64,
    pub currency: String,
    pub channel: String,
    pub status: String,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub raw_payload: Value,
    pub meta: Value,
}

#[derive(Debug, Clone)]
pub struct UpsertReceipt {
    pub transaction_id: i64,
    pub user_id: Option<i64>,
    /// True exactly once per charge: this observation claimed the settlement,
    /// so the balance credit is due now.
    pub credit_due: bool,
}

/// Storage port for the ledger. The upsert must be a single atomic
/// insert-or-update on the unique charge id, including the settle claim that
/// gates the balance credit.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn upsert_by_charge_id(
        &self,
        snapshot: &TransactionSnapshot,
    ) -> Result<UpsertReceipt, LedgerError>;

    async fn increment_user_balance(
        &self,
        user_id: i64,
        amount_major: f64,
    ) -> Result<(), LedgerError>;
}

/// The local idempotent mirror of gateway charge state, keyed uniquely by
/// charge id.
#[derive(Clone)]
pub struct Ledger {
    pub store: Arc<dyn LedgerStore>,
}

impl Ledger {
    /// Record one observation of a charge. Creates the row on first sight,
    /// updates it in place thereafter, and credits the owning user's balance
    /// at most once per charge, on the observation that claims settlement.
    pub async fn record(
        &self,
        charge: &Charge,
        known_user_id: Option<i64>,
    ) -> Result<UpsertReceipt, LedgerError> {
        let user_id = known_user_id.or_else(|| user_id_from_metadata(&charge.metadata));
        let snapshot = TransactionSnapshot {
            user_id,
            charge_id: charge.id.clone(),
            amount_subunits: charge.amount,
            currency: charge.currency.clone(),
            channel: derive_channel(charge),
            status: charge.status.as_str().to_string(),
            failure_code: charge.failure_code.clone(),
            failure_message: charge.failure_message.clone(),
            raw_payload: serde_json::to_value(charge).unwrap_or(Value::Null),
            meta: Value::Object(
                charge
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        };

        let receipt = self.store.upsert_by_charge_id(&snapshot).await?;

        if receipt.credit_due {
            if let Some(uid) = receipt.user_id {
                let amount_major = charge.amount as f64 / 100.0;
                self.store.increment_user_balance(uid, amount_major).await?;
                tracing::info!(
                    charge_id = %charge.id,
                    user_id = uid,
                    amount = amount_major,
                    "credited user balance"
                );
            }
        }

        Ok(receipt)
    }
}

fn user_id_from_metadata(metadata: &HashMap<String, Value>) -> Option<i64> {
    match metadata.get(USER_ID_METADATA_KEY)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn derive_channel(charge: &Charge) -> String {
    charge
        .source
        .as_ref()
        .filter(|s| !s.source_type.is_empty())
        .map(|s| s.source_type.clone())
        .unwrap_or_else(|| "card".to_string())
}
