use crate::error::ReconcileError;
use crate::gateway::GatewayClient;
use crate::ledger::Ledger;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Charge-lifecycle event keys worth reconciling. Everything else is
/// acknowledged and ignored.
pub const CHARGE_EVENT_KEYS: [&str; 5] = [
    "charge.complete",
    "charge.capture",
    "charge.failed",
    "charge.expired",
    "charge.reversed",
];

/// Inbound notification envelope. An untrusted pointer: only the id is used,
/// and only to re-fetch ground truth from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Processed { charge_id: String },
    Ignored { reason: &'static str },
}

/// Verifies inbound webhook notifications against the gateway and converges
/// them into the ledger. The envelope body is never the basis for a state
/// change: event envelopes are re-fetched by id, and the charge itself is
/// always re-fetched before the ledger write.
#[derive(Clone)]
pub struct WebhookReconciler {
    pub gateway: Arc<dyn GatewayClient>,
    pub ledger: Ledger,
}

impl WebhookReconciler {
    pub async fn reconcile(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if envelope.id.is_empty() {
            return Ok(ReconcileOutcome::Ignored { reason: "missing id" });
        }

        let charge_id = match envelope.object.as_deref() {
            Some("charge") => envelope.id.clone(),
            // Gateway deliveries are events; a bare id is treated the same.
            Some("event") | None => {
                let event = self.gateway.retrieve_event(&envelope.id).await?;
                if !CHARGE_EVENT_KEYS.contains(&event.key.as_str()) {
                    return Ok(ReconcileOutcome::Ignored {
                        reason: "event key is not charge-lifecycle",
                    });
                }
                match embedded_charge_id(&event.data) {
                    Some(id) => id,
                    None => {
                        return Ok(ReconcileOutcome::Ignored {
                            reason: "event data is not a charge",
                        })
                    }
                }
            }
            Some(_) => {
                return Ok(ReconcileOutcome::Ignored {
                    reason: "unrecognized object type",
                })
            }
        };

        let charge = self.gateway.retrieve_charge(&charge_id).await?;
        self.ledger.record(&charge, None).await?;
        tracing::info!(
            charge_id = %charge.id,
            status = charge.status.as_str(),
            amount = charge.amount,
            "webhook reconciled"
        );

        Ok(ReconcileOutcome::Processed {
            charge_id: charge.id,
        })
    }
}

fn embedded_charge_id(data: &Value) -> Option<String> {
    if data.get("object")?.as_str()? != "charge" {
        return None;
    }
    data.get("id")?
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
