use crate::domain::charge::{CardDetails, Charge};
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub mod fake;
pub mod omise;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default)]
pub struct CreateChargeParams {
    pub amount: i64,
    pub currency: String,
    pub card: Option<String>,
    pub source: Option<String>,
    pub return_uri: Option<String>,
    pub description: Option<String>,
    pub metadata: HashMap<String, Value>,
}

/// Capability port for the remote payment gateway. All calls are blocking
/// network operations from the caller's perspective; errors are opaque and
/// never retried here.
#[async_trait::async_trait]
pub trait GatewayClient: Send + Sync {
    async fn create_token(&self, card: &CardDetails) -> Result<Token, GatewayError>;

    async fn create_source(
        &self,
        source_type: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Source, GatewayError>;

    async fn create_charge(&self, params: &CreateChargeParams) -> Result<Charge, GatewayError>;

    async fn retrieve_charge(&self, charge_id: &str) -> Result<Charge, GatewayError>;

    async fn retrieve_event(&self, event_id: &str) -> Result<Event, GatewayError>;
}
