use crate::domain::charge::CardFieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway rejected request ({code}): {message}")]
    Api { code: String, message: String },
    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<CardFieldError> for DispatchError {
    fn from(err: CardFieldError) -> Self {
        DispatchError::Validation(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger write failed: {0}")]
    Store(#[from] sqlx::Error),
}

/// Failures during webhook reconciliation. Every variant is retryable: the
/// handler answers 5xx so the sender redelivers until the ledger converges.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
