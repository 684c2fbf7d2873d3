use axum::{response::IntoResponse, Json};
use serde::Serialize;

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct Health {
        status: String,
        service: String,
    }

    Json(Health {
        status: "healthy".to_string(),
        service: "chargx-gateway".to_string(),
    })
}
