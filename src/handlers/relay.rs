use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use tracing::error;

use crate::{services::relay::MerchantValidator, ApiResponse, AppState};

/// Request from the browser carrying the wallet-supplied validation URL.
#[derive(Debug, Deserialize)]
pub struct ValidateMerchantRequest {
    #[serde(rename = "validationUrl")]
    pub validation_url: String,
}

/// Sign a wallet domain-validation request with the merchant credentials
/// and relay the signed session back to the browser.
pub async fn validate_merchant(
    State(state): State<AppState>,
    Json(request): Json<ValidateMerchantRequest>,
) -> impl IntoResponse {
    match state.services.relay.validate(&request.validation_url).await {
        Ok(session) => (StatusCode::OK, Json(ApiResponse::success(session))).into_response(),
        Err(e) => {
            error!(error = %e, "merchant validation relay failed");
            (
                e.status_code(),
                Json(ApiResponse::<()>::error(e.response_message())),
            )
                .into_response()
        }
    }
}
