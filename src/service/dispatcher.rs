use crate::domain::charge::{Charge, ChargeRequest, PaymentMethod, USER_ID_METADATA_KEY};
use crate::error::DispatchError;
use crate::gateway::{CreateChargeParams, GatewayClient};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Selects the per-method gateway strategy and turns a validated request into
/// a charge. Validation failures never reach the gateway; gateway failures
/// are surfaced as-is, with no retry here.
#[derive(Clone)]
pub struct ChargeDispatcher {
    pub gateway: Arc<dyn GatewayClient>,
}

impl ChargeDispatcher {
    pub async fn dispatch(
        &self,
        req: &ChargeRequest,
        user_id: Option<i64>,
    ) -> Result<Charge, DispatchError> {
        if req.amount <= 0 {
            return Err(DispatchError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if req.currency.is_empty() {
            return Err(DispatchError::Validation("currency is required".to_string()));
        }

        let metadata = metadata_with_user(&req.metadata, user_id);

        match req.payment_type {
            PaymentMethod::Card => self.charge_card(req, metadata).await,
            PaymentMethod::Promptpay => self.charge_promptpay(req, metadata).await,
            PaymentMethod::InternetBanking => self.charge_internet_banking(req, metadata).await,
        }
    }

    /// Card charges. The token path keeps raw card data off this service;
    /// the card-fields fallback tokenizes server-side and is a
    /// compliance-reduced mode meant for test keys only.
    async fn charge_card(
        &self,
        req: &ChargeRequest,
        metadata: HashMap<String, Value>,
    ) -> Result<Charge, DispatchError> {
        let card_ref = match (&req.token, &req.card) {
            (Some(token), _) if !token.is_empty() => token.clone(),
            (_, Some(card)) => {
                let details = card.resolve()?;
                self.gateway.create_token(&details).await?.id
            }
            _ => {
                return Err(DispatchError::Validation(
                    "missing token; provide token or card fields for tokenization".to_string(),
                ))
            }
        };

        let charge = self
            .gateway
            .create_charge(&CreateChargeParams {
                amount: req.amount,
                currency: req.currency.clone(),
                card: Some(card_ref),
                source: None,
                return_uri: req.return_uri.clone(),
                description: req.description.clone(),
                metadata,
            })
            .await?;
        Ok(charge)
    }

    async fn charge_promptpay(
        &self,
        req: &ChargeRequest,
        metadata: HashMap<String, Value>,
    ) -> Result<Charge, DispatchError> {
        let source = self
            .gateway
            .create_source("promptpay", req.amount, &req.currency)
            .await?;

        let charge = self
            .gateway
            .create_charge(&CreateChargeParams {
                amount: req.amount,
                currency: req.currency.clone(),
                card: None,
                source: Some(source.id),
                return_uri: None,
                description: req.description.clone(),
                metadata,
            })
            .await?;
        Ok(charge)
    }

    async fn charge_internet_banking(
        &self,
        req: &ChargeRequest,
        metadata: HashMap<String, Value>,
    ) -> Result<Charge, DispatchError> {
        let bank = match req.bank.as_deref() {
            Some(bank) if !bank.is_empty() => bank,
            _ => {
                return Err(DispatchError::Validation(
                    "bank is required for internet_banking (e.g. \"bay\", \"bbl\", \"scb\")"
                        .to_string(),
                ))
            }
        };
        let return_uri = match req.return_uri.as_deref() {
            Some(uri) if !uri.is_empty() => uri.to_string(),
            _ => {
                return Err(DispatchError::Validation(
                    "return_uri is required for internet_banking".to_string(),
                ))
            }
        };

        let source = self
            .gateway
            .create_source(
                &format!("internet_banking_{bank}"),
                req.amount,
                &req.currency,
            )
            .await?;

        let charge = self
            .gateway
            .create_charge(&CreateChargeParams {
                amount: req.amount,
                currency: req.currency.clone(),
                card: None,
                source: Some(source.id),
                return_uri: Some(return_uri),
                description: req.description.clone(),
                metadata,
            })
            .await?;
        Ok(charge)
    }
}

fn metadata_with_user(
    metadata: &HashMap<String, Value>,
    user_id: Option<i64>,
) -> HashMap<String, Value> {
    let mut metadata = metadata.clone();
    if let Some(uid) = user_id {
        metadata.insert(
            USER_ID_METADATA_KEY.to_string(),
            Value::String(uid.to_string()),
        );
    }
    metadata
}
