use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::{errors::GatewayError, ApiResponse, AppState};

/// Admin operation on a settled or authorized processor transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// Capture a previously authorized transaction.
pub async fn capture(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> impl IntoResponse {
    info!(order_id = %request.order_id, "capture requested");
    respond(state.services.client.capture(&request.order_id).await)
}

/// Refund a transaction.
pub async fn refund(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> impl IntoResponse {
    info!(order_id = %request.order_id, "refund requested");
    respond(state.services.client.refund(&request.order_id).await)
}

/// Void a transaction.
pub async fn void(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> impl IntoResponse {
    info!(order_id = %request.order_id, "void requested");
    respond(state.services.client.void(&request.order_id).await)
}

/// Payout via the admin API. The payload is passed through to the
/// processor; the secret key is attached server-side.
pub async fn payout(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("payout requested");
    respond(state.services.client.payout(&payload).await)
}

fn respond(result: Result<Value, GatewayError>) -> axum::response::Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(ApiResponse::success(value))).into_response(),
        Err(e) => {
            error!(error = %e, "transaction operation failed");
            (
                e.status_code(),
                Json(ApiResponse::<()>::error(e.response_message())),
            )
                .into_response()
        }
    }
}
