use payments_ledger::domain::charge::{Charge, ChargeSource, ChargeStatus, USER_ID_METADATA_KEY};
use payments_ledger::error::ReconcileError;
use payments_ledger::gateway::fake::FakeGateway;
use payments_ledger::gateway::Event;
use payments_ledger::ledger::store_memory::MemoryLedgerStore;
use payments_ledger::ledger::Ledger;
use payments_ledger::service::reconciler::{ReconcileOutcome, WebhookEnvelope, WebhookReconciler};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn harness() -> (FakeGateway, MemoryLedgerStore, WebhookReconciler) {
    let fake = FakeGateway::default();
    let store = MemoryLedgerStore::default();
    let reconciler = WebhookReconciler {
        gateway: Arc::new(fake.clone()),
        ledger: Ledger {
            store: Arc::new(store.clone()),
        },
    };
    (fake, store, reconciler)
}

fn charge(id: &str, status: ChargeStatus, amount: i64, user_id: Option<&str>) -> Charge {
    let mut metadata = HashMap::new();
    if let Some(uid) = user_id {
        metadata.insert(USER_ID_METADATA_KEY.to_string(), json!(uid));
    }
    Charge {
        id: id.to_string(),
        amount,
        currency: "THB".to_string(),
        status,
        failure_code: None,
        failure_message: None,
        source: Some(ChargeSource {
            id: "src_test_0001".to_string(),
            source_type: "promptpay".to_string(),
        }),
        metadata,
    }
}

fn charge_event(event_id: &str, key: &str, charge_id: &str) -> Event {
    Event {
        id: event_id.to_string(),
        key: key.to_string(),
        data: json!({"id": charge_id, "object": "charge"}),
    }
}

fn event_envelope(id: &str) -> WebhookEnvelope {
    WebhookEnvelope {
        id: id.to_string(),
        object: Some("event".to_string()),
    }
}

#[tokio::test]
async fn verified_event_updates_ledger_and_credits_once() {
    let (fake, store, reconciler) = harness();

    // chrg_1 was first seen pending through the direct charge flow.
    reconciler
        .ledger
        .record(&charge("chrg_1", ChargeStatus::Pending, 5000, Some("42")), None)
        .await
        .unwrap();
    assert_eq!(store.row("chrg_1").unwrap().status, "pending");

    fake.seed_charge(charge("chrg_1", ChargeStatus::Successful, 5000, Some("42")));
    fake.seed_event(charge_event("evt_1", "charge.complete", "chrg_1"));

    let outcome = reconciler.reconcile(&event_envelope("evt_1")).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Processed {
            charge_id: "chrg_1".to_string()
        }
    );
    assert_eq!(store.row_count(), 1);
    assert_eq!(store.row("chrg_1").unwrap().status, "successful");
    assert_eq!(store.balance(42), 50.0);

    // Identical redelivery converges without a second credit.
    let outcome = reconciler.reconcile(&event_envelope("evt_1")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Processed { .. }));
    assert_eq!(store.row_count(), 1);
    assert_eq!(store.balance(42), 50.0);
}

#[tokio::test]
async fn envelope_body_cannot_override_gateway_truth() {
    let (fake, store, reconciler) = harness();

    let mut failed = charge("chrg_9", ChargeStatus::Failed, 5000, Some("42"));
    failed.failure_code = Some("insufficient_fund".to_string());
    fake.seed_charge(failed);

    // The sender claims the charge succeeded with a different amount; only
    // the id may be taken from the envelope.
    let envelope: WebhookEnvelope = serde_json::from_value(json!({
        "id": "chrg_9",
        "object": "charge",
        "status": "successful",
        "amount": 999_999
    }))
    .unwrap();

    let outcome = reconciler.reconcile(&envelope).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Processed { .. }));

    let row = store.row("chrg_9").unwrap();
    assert_eq!(row.status, "failed");
    assert_eq!(row.amount_subunits, 5000);
    assert_eq!(row.failure_code.as_deref(), Some("insufficient_fund"));
    assert_eq!(store.balance(42), 0.0);
}

#[tokio::test]
async fn charge_shaped_envelope_is_reconciled_directly() {
    let (fake, store, reconciler) = harness();
    fake.seed_charge(charge("chrg_2", ChargeStatus::Successful, 7500, Some("8")));

    let envelope = WebhookEnvelope {
        id: "chrg_2".to_string(),
        object: Some("charge".to_string()),
    };
    let outcome = reconciler.reconcile(&envelope).await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Processed { .. }));
    assert_eq!(fake.calls(), vec!["retrieve_charge"]);
    assert_eq!(store.balance(8), 75.0);
}

#[tokio::test]
async fn envelope_without_object_is_treated_as_event() {
    let (fake, store, reconciler) = harness();
    fake.seed_charge(charge("chrg_3", ChargeStatus::Successful, 1000, Some("3")));
    fake.seed_event(charge_event("evt_3", "charge.capture", "chrg_3"));

    let envelope: WebhookEnvelope = serde_json::from_value(json!({"id": "evt_3"})).unwrap();
    let outcome = reconciler.reconcile(&envelope).await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Processed { .. }));
    assert_eq!(fake.calls(), vec!["retrieve_event", "retrieve_charge"]);
    assert_eq!(store.row("chrg_3").unwrap().status, "successful");
}

#[tokio::test]
async fn unrecognized_event_keys_are_ignored_without_ledger_writes() {
    let (fake, store, reconciler) = harness();
    fake.seed_event(Event {
        id: "evt_4".to_string(),
        key: "customer.created".to_string(),
        data: json!({"id": "cust_1", "object": "customer"}),
    });

    let outcome = reconciler.reconcile(&event_envelope("evt_4")).await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
    assert_eq!(fake.calls(), vec!["retrieve_event"]);
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn charge_event_with_non_charge_data_is_ignored() {
    let (fake, store, reconciler) = harness();
    fake.seed_event(Event {
        id: "evt_5".to_string(),
        key: "charge.complete".to_string(),
        data: json!({"id": "rfnd_1", "object": "refund"}),
    });

    let outcome = reconciler.reconcile(&event_envelope("evt_5")).await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn unknown_envelope_object_is_ignored_without_gateway_calls() {
    let (fake, store, reconciler) = harness();

    let envelope = WebhookEnvelope {
        id: "rfnd_1".to_string(),
        object: Some("refund".to_string()),
    };
    let outcome = reconciler.reconcile(&envelope).await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
    assert!(fake.calls().is_empty());
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn missing_id_is_ignored() {
    let (fake, _store, reconciler) = harness();

    let envelope: WebhookEnvelope =
        serde_json::from_value(json!({"object": "event"})).unwrap();
    let outcome = reconciler.reconcile(&envelope).await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn event_verification_failure_is_transient() {
    let (fake, store, reconciler) = harness();
    fake.fail_operation("retrieve_event");

    let err = reconciler
        .reconcile(&event_envelope("evt_6"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Gateway(_)));
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn charge_retrieval_failure_is_transient() {
    let (fake, store, reconciler) = harness();
    fake.seed_event(charge_event("evt_7", "charge.failed", "chrg_7"));
    fake.fail_operation("retrieve_charge");

    let err = reconciler
        .reconcile(&event_envelope("evt_7"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Gateway(_)));
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn ledger_write_failure_is_transient_and_converges_on_redelivery() {
    let (fake, store, reconciler) = harness();
    fake.seed_charge(charge("chrg_8", ChargeStatus::Successful, 2000, Some("5")));
    fake.seed_event(charge_event("evt_8", "charge.complete", "chrg_8"));

    store.fail_writes(true);
    let err = reconciler
        .reconcile(&event_envelope("evt_8"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Ledger(_)));
    assert_eq!(store.row_count(), 0);

    store.fail_writes(false);
    let outcome = reconciler.reconcile(&event_envelope("evt_8")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Processed { .. }));
    assert_eq!(store.balance(5), 20.0);
}
