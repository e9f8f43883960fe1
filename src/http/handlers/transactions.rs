use crate::repo::transactions_repo::TransactionFilters;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<i64>,
    pub status: Option<String>,
    pub channel: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let filters = TransactionFilters {
        user_id: query.user_id,
        status: query.status.clone(),
        channel: query.channel.clone(),
    };
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(50);
    let offset = query.offset.filter(|o| *o >= 0).unwrap_or(0);

    let total = match state.transactions_repo.count(&filters).await {
        Ok(total) => total,
        Err(e) => {
            return (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    };

    match state.transactions_repo.list(&filters, limit, offset).await {
        Ok(transactions) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({
                "transactions": transactions,
                "pagination": {"total": total, "limit": limit, "offset": offset}
            })),
        )
            .into_response(),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Numeric identifiers are tried as the surrogate primary key first, then
/// fall through to a charge-id lookup.
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Ok(pk) = id.parse::<i64>() {
        match state.transactions_repo.get_by_pk(pk).await {
            Ok(Some(record)) => return (axum::http::StatusCode::OK, Json(record)).into_response(),
            Ok(None) => {}
            Err(e) => {
                return (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": e.to_string()})),
                )
                    .into_response()
            }
        }
    }

    match state.transactions_repo.get_by_charge_id(&id).await {
        Ok(Some(record)) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Ok(None) => (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "transaction not found"})),
        )
            .into_response(),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}
