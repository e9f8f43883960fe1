use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Metadata key carrying the caller's user id on every charge, so webhook
/// reconciliation can recover it from the charge snapshot alone.
pub const USER_ID_METADATA_KEY: &str = "user_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(alias = "credit_card")]
    Card,
    Promptpay,
    InternetBanking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "paymentType")]
    pub payment_type: PaymentMethod,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub return_uri: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub card: Option<CardFields>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Raw card fields as submitted by the client. Expiry and security code
/// arrive as either numbers or strings depending on the client library, so
/// they are held loose here and resolved once into [`CardDetails`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub expiration_month: Option<FieldValue>,
    #[serde(default)]
    pub expiration_year: Option<FieldValue>,
    #[serde(default)]
    pub security_code: Option<FieldValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(i64),
    Text(String),
}

impl FieldValue {
    fn as_int(&self, field: &'static str) -> Result<i32, CardFieldError> {
        match self {
            FieldValue::Number(n) => Ok(*n as i32),
            FieldValue::Text(s) => s.parse().map_err(|_| CardFieldError::Parse {
                field,
                value: s.clone(),
            }),
        }
    }

    fn as_text(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CardFieldError {
    #[error("missing card field: {0}")]
    Missing(&'static str),
    #[error("invalid {field}: {value}")]
    Parse { field: &'static str, value: String },
}

/// Strict card data handed to the gateway's tokenization endpoint.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub name: String,
    pub number: String,
    pub expiration_month: i32,
    pub expiration_year: i32,
    pub security_code: String,
}

impl CardFields {
    pub fn resolve(&self) -> Result<CardDetails, CardFieldError> {
        let name = self
            .name
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(CardFieldError::Missing("name"))?;
        let number = self
            .number
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(CardFieldError::Missing("number"))?;
        let expiration_month = self
            .expiration_month
            .as_ref()
            .ok_or(CardFieldError::Missing("expiration_month"))?
            .as_int("expiration_month")?;
        let expiration_year = self
            .expiration_year
            .as_ref()
            .ok_or(CardFieldError::Missing("expiration_year"))?
            .as_int("expiration_year")?;
        let security_code = self
            .security_code
            .as_ref()
            .ok_or(CardFieldError::Missing("security_code"))?
            .as_text();

        Ok(CardDetails {
            name,
            number,
            expiration_month,
            expiration_year,
            security_code,
        })
    }
}

/// Charge lifecycle vocabulary as defined by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Successful,
    Failed,
    Expired,
    Reversed,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Successful => "successful",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Expired => "expired",
            ChargeStatus::Reversed => "reversed",
        }
    }
}

/// A gateway charge snapshot. Immutable once fetched; the ledger stores the
/// latest observed snapshot per charge id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: ChargeStatus,
    #[serde(default)]
    pub failure_code: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default)]
    pub source: Option<ChargeSource>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeSource {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(code: &str, message: &str) -> Self {
        ErrorEnvelope {
            error: ErrorPayload {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}
