use crate::error::ReconcileError;
use crate::service::reconciler::{ReconcileOutcome, WebhookEnvelope};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// 200 acknowledges the notification (processed or permanently
/// unprocessable); 5xx tells the gateway to redeliver.
pub async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook body; acknowledging");
            return (
                axum::http::StatusCode::OK,
                Json(serde_json::json!({"outcome": "ignored", "reason": "unparseable body"})),
            )
                .into_response();
        }
    };

    match state.reconciler.reconcile(&envelope).await {
        Ok(ReconcileOutcome::Processed { charge_id }) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({"outcome": "processed", "charge_id": charge_id})),
        )
            .into_response(),
        Ok(ReconcileOutcome::Ignored { reason }) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({"outcome": "ignored", "reason": reason})),
        )
            .into_response(),
        Err(ReconcileError::Gateway(e)) => {
            tracing::error!(id = %envelope.id, error = %e, "webhook verification failed");
            (
                axum::http::StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
        Err(ReconcileError::Ledger(e)) => {
            tracing::error!(id = %envelope.id, error = %e, "webhook ledger write failed");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
