use crate::domain::charge::{CardDetails, Charge, ChargeSource, ChargeStatus};
use crate::error::GatewayError;
use crate::gateway::{CreateChargeParams, Event, GatewayClient, Source, Token};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Deterministic in-process gateway. Charges and events can be seeded,
/// individual operations can be switched to fail, and every call is recorded
/// in order for assertions.
#[derive(Clone, Default)]
pub struct FakeGateway {
    inner: Arc<Mutex<FakeInner>>,
}

#[derive(Default)]
struct FakeInner {
    counter: u64,
    charge_status: Option<ChargeStatus>,
    charges: HashMap<String, Charge>,
    events: HashMap<String, Event>,
    sources: HashMap<String, Source>,
    charge_params: Vec<CreateChargeParams>,
    tokenized: Vec<CardDetails>,
    calls: Vec<&'static str>,
    failures: HashSet<&'static str>,
}

impl FakeGateway {
    pub fn seed_charge(&self, charge: Charge) {
        self.inner
            .lock()
            .unwrap()
            .charges
            .insert(charge.id.clone(), charge);
    }

    pub fn seed_event(&self, event: Event) {
        self.inner
            .lock()
            .unwrap()
            .events
            .insert(event.id.clone(), event);
    }

    /// Status newly created charges report. Defaults to pending.
    pub fn set_charge_status(&self, status: ChargeStatus) {
        self.inner.lock().unwrap().charge_status = Some(status);
    }

    pub fn fail_operation(&self, op: &'static str) {
        self.inner.lock().unwrap().failures.insert(op);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn charge(&self, charge_id: &str) -> Option<Charge> {
        self.inner.lock().unwrap().charges.get(charge_id).cloned()
    }

    pub fn last_charge_params(&self) -> Option<CreateChargeParams> {
        self.inner.lock().unwrap().charge_params.last().cloned()
    }

    pub fn tokenized(&self) -> Vec<CardDetails> {
        self.inner.lock().unwrap().tokenized.clone()
    }
}

fn fail(op: &'static str) -> GatewayError {
    GatewayError::Api {
        code: "fake_down".to_string(),
        message: op.to_string(),
    }
}

#[async_trait::async_trait]
impl GatewayClient for FakeGateway {
    async fn create_token(&self, card: &CardDetails) -> Result<Token, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("create_token");
        if inner.failures.contains("create_token") {
            return Err(fail("create_token"));
        }
        inner.counter += 1;
        inner.tokenized.push(card.clone());
        Ok(Token {
            id: format!("tokn_test_{:04}", inner.counter),
        })
    }

    async fn create_source(
        &self,
        source_type: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Source, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("create_source");
        if inner.failures.contains("create_source") {
            return Err(fail("create_source"));
        }
        inner.counter += 1;
        let source = Source {
            id: format!("src_test_{:04}", inner.counter),
            source_type: source_type.to_string(),
            amount,
            currency: currency.to_string(),
        };
        inner.sources.insert(source.id.clone(), source.clone());
        Ok(source)
    }

    async fn create_charge(&self, params: &CreateChargeParams) -> Result<Charge, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("create_charge");
        if inner.failures.contains("create_charge") {
            return Err(fail("create_charge"));
        }
        inner.counter += 1;
        let source = params
            .source
            .as_ref()
            .and_then(|id| inner.sources.get(id))
            .map(|s| ChargeSource {
                id: s.id.clone(),
                source_type: s.source_type.clone(),
            });
        let charge = Charge {
            id: format!("chrg_test_{:04}", inner.counter),
            amount: params.amount,
            currency: params.currency.clone(),
            status: inner.charge_status.unwrap_or(ChargeStatus::Pending),
            failure_code: None,
            failure_message: None,
            source,
            metadata: params.metadata.clone(),
        };
        inner.charges.insert(charge.id.clone(), charge.clone());
        inner.charge_params.push(params.clone());
        Ok(charge)
    }

    async fn retrieve_charge(&self, charge_id: &str) -> Result<Charge, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("retrieve_charge");
        if inner.failures.contains("retrieve_charge") {
            return Err(fail("retrieve_charge"));
        }
        inner
            .charges
            .get(charge_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api {
                code: "not_found".to_string(),
                message: format!("no such charge: {charge_id}"),
            })
    }

    async fn retrieve_event(&self, event_id: &str) -> Result<Event, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("retrieve_event");
        if inner.failures.contains("retrieve_event") {
            return Err(fail("retrieve_event"));
        }
        inner
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api {
                code: "not_found".to_string(),
                message: format!("no such event: {event_id}"),
            })
    }
}
