use crate::domain::charge::{ChargeRequest, ErrorEnvelope};
use crate::error::DispatchError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use std::collections::HashMap;

pub async fn create_charge(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(req): Json<ChargeRequest>,
) -> impl IntoResponse {
    let user_id = resolve_user_id(&req, &headers, &query);

    let charge = match state.dispatcher.dispatch(&req, user_id).await {
        Ok(charge) => charge,
        Err(DispatchError::Validation(message)) => {
            return (
                axum::http::StatusCode::BAD_REQUEST,
                Json(ErrorEnvelope::new("INVALID_REQUEST", &message)),
            )
                .into_response()
        }
        Err(DispatchError::Gateway(e)) => {
            return (
                axum::http::StatusCode::BAD_GATEWAY,
                Json(ErrorEnvelope::new("GATEWAY_ERROR", &e.to_string())),
            )
                .into_response()
        }
    };

    // The charge exists at the gateway regardless of whether the local
    // mirror write lands; a failure here is logged, never surfaced.
    if let Err(e) = state.ledger.record(&charge, user_id).await {
        tracing::error!(charge_id = %charge.id, error = %e, "failed to mirror charge into ledger");
    }

    (axum::http::StatusCode::OK, Json(charge)).into_response()
}

pub async fn health() -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({"status": "ok"})),
    )
}

fn resolve_user_id(
    req: &ChargeRequest,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Option<i64> {
    if req.user_id.is_some() {
        return req.user_id;
    }
    if let Some(id) = headers
        .get("x-user-id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse().ok())
    {
        return Some(id);
    }
    query.get("user_id").and_then(|s| s.parse().ok())
}
