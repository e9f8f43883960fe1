use crate::domain::charge::{CardDetails, Charge};
use crate::error::GatewayError;
use crate::gateway::{CreateChargeParams, Event, GatewayClient, Source, Token};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// HTTP client for the Omise REST API. Tokenization goes through the vault
/// host with the public key; everything else uses the secret key. Bodies are
/// form-encoded, auth is basic with the key as username and no password.
pub struct OmiseGateway {
    pub api_base: String,
    pub vault_base: String,
    pub public_key: String,
    pub secret_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl OmiseGateway {
    async fn post_form<T: DeserializeOwned>(
        &self,
        url: String,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<T, GatewayError> {
        let resp = self
            .client
            .post(url)
            .basic_auth(key, None::<&str>)
            .form(fields)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await?;
        decode(resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, GatewayError> {
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        return serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()));
    }

    let body = resp.text().await.unwrap_or_default();
    let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let code = if parsed.code.is_empty() {
        format!("http_{}", status.as_u16())
    } else {
        parsed.code
    };
    let message = if parsed.message.is_empty() {
        body.chars().take(200).collect()
    } else {
        parsed.message
    };
    Err(GatewayError::Api { code, message })
}

fn metadata_fields(metadata: &std::collections::HashMap<String, Value>) -> Vec<(String, String)> {
    metadata
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (format!("metadata[{k}]"), value)
        })
        .collect()
}

#[async_trait::async_trait]
impl GatewayClient for OmiseGateway {
    async fn create_token(&self, card: &CardDetails) -> Result<Token, GatewayError> {
        let fields = vec![
            ("card[name]".to_string(), card.name.clone()),
            ("card[number]".to_string(), card.number.clone()),
            (
                "card[expiration_month]".to_string(),
                card.expiration_month.to_string(),
            ),
            (
                "card[expiration_year]".to_string(),
                card.expiration_year.to_string(),
            ),
            (
                "card[security_code]".to_string(),
                card.security_code.clone(),
            ),
        ];
        self.post_form(
            format!("{}/tokens", self.vault_base),
            &self.public_key,
            &fields,
        )
        .await
    }

    async fn create_source(
        &self,
        source_type: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Source, GatewayError> {
        let fields = vec![
            ("type".to_string(), source_type.to_string()),
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
        ];
        self.post_form(
            format!("{}/sources", self.api_base),
            &self.secret_key,
            &fields,
        )
        .await
    }

    async fn create_charge(&self, params: &CreateChargeParams) -> Result<Charge, GatewayError> {
        let mut fields = vec![
            ("amount".to_string(), params.amount.to_string()),
            ("currency".to_string(), params.currency.clone()),
        ];
        if let Some(card) = &params.card {
            fields.push(("card".to_string(), card.clone()));
        }
        if let Some(source) = &params.source {
            fields.push(("source".to_string(), source.clone()));
        }
        if let Some(return_uri) = &params.return_uri {
            fields.push(("return_uri".to_string(), return_uri.clone()));
        }
        if let Some(description) = &params.description {
            fields.push(("description".to_string(), description.clone()));
        }
        fields.extend(metadata_fields(&params.metadata));

        self.post_form(
            format!("{}/charges", self.api_base),
            &self.secret_key,
            &fields,
        )
        .await
    }

    async fn retrieve_charge(&self, charge_id: &str) -> Result<Charge, GatewayError> {
        self.get_json(format!("{}/charges/{}", self.api_base, charge_id))
            .await
    }

    async fn retrieve_event(&self, event_id: &str) -> Result<Event, GatewayError> {
        self.get_json(format!("{}/events/{}", self.api_base, event_id))
            .await
    }
}
