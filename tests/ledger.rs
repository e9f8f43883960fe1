use payments_ledger::domain::charge::{Charge, ChargeSource, ChargeStatus, USER_ID_METADATA_KEY};
use payments_ledger::ledger::store_memory::MemoryLedgerStore;
use payments_ledger::ledger::Ledger;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn harness() -> (MemoryLedgerStore, Ledger) {
    let store = MemoryLedgerStore::default();
    let ledger = Ledger {
        store: Arc::new(store.clone()),
    };
    (store, ledger)
}

fn charge(id: &str, status: ChargeStatus, amount: i64) -> Charge {
    Charge {
        id: id.to_string(),
        amount,
        currency: "THB".to_string(),
        status,
        failure_code: None,
        failure_message: None,
        source: None,
        metadata: HashMap::new(),
    }
}

fn charge_with_user(id: &str, status: ChargeStatus, amount: i64, user_id: serde_json::Value) -> Charge {
    let mut c = charge(id, status, amount);
    c.metadata.insert(USER_ID_METADATA_KEY.to_string(), user_id);
    c
}

#[tokio::test]
async fn repeated_upserts_are_idempotent() {
    let (store, ledger) = harness();
    let snapshot = charge_with_user("chrg_a", ChargeStatus::Successful, 10000, json!("42"));

    for _ in 0..5 {
        ledger.record(&snapshot, None).await.unwrap();
    }

    assert_eq!(store.row_count(), 1);
    let row = store.row("chrg_a").unwrap();
    assert_eq!(row.status, "successful");
    assert_eq!(row.amount_subunits, 10000);
    assert_eq!(row.user_id, Some(42));
    assert_eq!(store.balance(42), 100.0);
}

#[tokio::test]
async fn row_follows_the_latest_snapshot() {
    let (store, ledger) = harness();

    ledger
        .record(&charge("chrg_b", ChargeStatus::Pending, 5000), None)
        .await
        .unwrap();

    let mut updated = charge("chrg_b", ChargeStatus::Failed, 5000);
    updated.failure_code = Some("insufficient_fund".to_string());
    updated.failure_message = Some("balance too low".to_string());
    ledger.record(&updated, None).await.unwrap();

    assert_eq!(store.row_count(), 1);
    let row = store.row("chrg_b").unwrap();
    assert_eq!(row.status, "failed");
    assert_eq!(row.failure_code.as_deref(), Some("insufficient_fund"));
    assert_eq!(row.failure_message.as_deref(), Some("balance too low"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_observations_produce_one_row_and_one_credit() {
    let (store, ledger) = harness();
    let snapshot = charge_with_user("chrg_c", ChargeStatus::Successful, 10000, json!("42"));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ledger = ledger.clone();
        let snapshot = snapshot.clone();
        handles.push(tokio::spawn(
            async move { ledger.record(&snapshot, None).await },
        ));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.row_count(), 1);
    assert_eq!(store.balance(42), 100.0);
}

#[tokio::test]
async fn explicit_user_id_wins_over_metadata() {
    let (store, ledger) = harness();
    let snapshot = charge_with_user("chrg_d", ChargeStatus::Successful, 3000, json!("42"));

    ledger.record(&snapshot, Some(9)).await.unwrap();

    assert_eq!(store.row("chrg_d").unwrap().user_id, Some(9));
    assert_eq!(store.balance(9), 30.0);
    assert_eq!(store.balance(42), 0.0);
}

#[tokio::test]
async fn numeric_metadata_user_id_is_recovered() {
    let (store, ledger) = harness();
    let snapshot = charge_with_user("chrg_e", ChargeStatus::Successful, 1500, json!(7));

    ledger.record(&snapshot, None).await.unwrap();

    assert_eq!(store.row("chrg_e").unwrap().user_id, Some(7));
    assert_eq!(store.balance(7), 15.0);
}

#[tokio::test]
async fn garbage_metadata_user_id_leaves_reference_null() {
    let (store, ledger) = harness();
    let snapshot = charge_with_user("chrg_f", ChargeStatus::Successful, 1500, json!("nobody"));

    ledger.record(&snapshot, None).await.unwrap();

    let row = store.row("chrg_f").unwrap();
    assert_eq!(row.user_id, None);
    assert_eq!(row.status, "successful");
}

#[tokio::test]
async fn channel_comes_from_source_and_defaults_to_card() {
    let (store, ledger) = harness();

    ledger
        .record(&charge("chrg_g", ChargeStatus::Pending, 100), None)
        .await
        .unwrap();
    assert_eq!(store.row("chrg_g").unwrap().channel, "card");

    let mut with_source = charge("chrg_h", ChargeStatus::Pending, 100);
    with_source.source = Some(ChargeSource {
        id: "src_test_0001".to_string(),
        source_type: "internet_banking_scb".to_string(),
    });
    ledger.record(&with_source, None).await.unwrap();
    assert_eq!(store.row("chrg_h").unwrap().channel, "internet_banking_scb");
}

#[tokio::test]
async fn reversal_oscillation_never_credits_twice() {
    let (store, ledger) = harness();

    for status in [
        ChargeStatus::Successful,
        ChargeStatus::Reversed,
        ChargeStatus::Successful,
    ] {
        ledger
            .record(&charge_with_user("chrg_i", status, 10000, json!("42")), None)
            .await
            .unwrap();
    }

    assert_eq!(store.balance(42), 100.0);
    assert_eq!(store.row("chrg_i").unwrap().status, "successful");
}

#[tokio::test]
async fn credit_waits_until_a_user_reference_exists() {
    let (store, ledger) = harness();

    // Successful but anonymous: nothing to credit, and the settlement is
    // not burned.
    ledger
        .record(&charge("chrg_j", ChargeStatus::Successful, 8000), None)
        .await
        .unwrap();
    assert_eq!(store.row("chrg_j").unwrap().user_id, None);

    // A later snapshot carrying the user reference claims it exactly once.
    let with_user = charge_with_user("chrg_j", ChargeStatus::Successful, 8000, json!("6"));
    ledger.record(&with_user, None).await.unwrap();
    ledger.record(&with_user, None).await.unwrap();

    assert_eq!(store.row("chrg_j").unwrap().user_id, Some(6));
    assert_eq!(store.balance(6), 80.0);
}

#[tokio::test]
async fn known_user_reference_survives_snapshots_without_metadata() {
    let (store, ledger) = harness();

    ledger
        .record(&charge("chrg_k", ChargeStatus::Pending, 2500), Some(11))
        .await
        .unwrap();

    // Webhook-path snapshot with no recoverable metadata.
    ledger
        .record(&charge("chrg_k", ChargeStatus::Successful, 2500), None)
        .await
        .unwrap();

    let row = store.row("chrg_k").unwrap();
    assert_eq!(row.user_id, Some(11));
    assert_eq!(store.balance(11), 25.0);
}
