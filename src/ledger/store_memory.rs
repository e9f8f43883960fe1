use crate::error::LedgerError;
use crate::ledger::{LedgerStore, TransactionSnapshot, UpsertReceipt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mutex-guarded ledger store for tests. Same conflict policy and settle
/// claim as the Postgres store, atomic under the lock.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    rows: HashMap<String, StoredTransaction>,
    balances: HashMap<i64, f64>,
    fail_writes: bool,
}

#[derive(Debug, Clone)]
pub struct StoredTransaction {
    pub id: i64,
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
    pub credited: bool,
}

impl MemoryLedgerStore {
    pub fn row(&self, charge_id: &str) -> Option<StoredTransaction> {
        self.inner.lock().unwrap().rows.get(charge_id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    pub fn balance(&self, user_id: i64) -> f64 {
        self.inner
            .lock()
            .unwrap()
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn upsert_by_charge_id(
        &self,
        snapshot: &TransactionSnapshot,
    ) -> Result<UpsertReceipt, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(LedgerError::Store(sqlx::Error::PoolClosed));
        }

        let id = match inner.rows.get_mut(&snapshot.charge_id) {
            Some(row) => {
                row.user_id = snapshot.user_id.or(row.user_id);
                row.amount_subunits = snapshot.amount_subunits;
                row.currency = snapshot.currency.clone();
                row.channel = snapshot.channel.clone();
                row.status = snapshot.status.clone();
                row.failure_code = snapshot.failure_code.clone();
                row.failure_message = snapshot.failure_message.clone();
                row.raw_payload = snapshot.raw_payload.clone();
                row.meta = snapshot.meta.clone();
                row.id
            }
            None => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.rows.insert(
                    snapshot.charge_id.clone(),
                    StoredTransaction {
                        id,
                        user_id: snapshot.user_id,
                        charge_id: snapshot.charge_id.clone(),
                        amount_subunits: snapshot.amount_subunits,
                        currency: snapshot.currency.clone(),
                        channel: snapshot.channel.clone(),
                        status: snapshot.status.clone(),
                        failure_code: snapshot.failure_code.clone(),
                        failure_message: snapshot.failure_message.clone(),
                        raw_payload: snapshot.raw_payload.clone(),
                        meta: snapshot.meta.clone(),
                        credited: false,
                    },
                );
                id
            }
        };

        let row = inner.rows.get_mut(&snapshot.charge_id).expect("just upserted");
        let user_id = row.user_id;
        let credit_due = row.status == "successful" && !row.credited && row.user_id.is_some();
        if credit_due {
            row.credited = true;
        }

        Ok(UpsertReceipt {
            transaction_id: id,
            user_id,
            credit_due,
        })
    }

    async fn increment_user_balance(
        &self,
        user_id: i64,
        amount_major: f64,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(LedgerError::Store(sqlx::Error::PoolClosed));
        }
        *inner.balances.entry(user_id).or_insert(0.0) += amount_major;
        Ok(())
    }
}
