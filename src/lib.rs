//! ChargX Payment Gateway
//!
//! Accepts card, Apple Pay, and Google Pay payments through the ChargX
//! processor. Sensitive card data is tokenized against the processor
//! directly; raw card numbers never transit the merchant's server.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod checkout;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod processor;
pub mod services;

use axum::{routing::get, Router};
use serde::Serialize;

/// Shared application state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub config: config::GatewayConfig,
    pub services: handlers::AppServices,
}

/// Common response wrapper for handler payloads.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Build the application router: status + health + the v1 API.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "chargx-gateway up" }))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", handlers::api_v1_routes())
}
