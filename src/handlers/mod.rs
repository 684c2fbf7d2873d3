use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use crate::{
    events::EventSender,
    processor::client::ProcessorClient,
    services::relay::MerchantValidationRelay,
    AppState,
};

pub mod health;
pub mod relay;
pub mod transactions;

/// Services shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub client: Arc<ProcessorClient>,
    pub relay: Arc<MerchantValidationRelay>,
    pub events: EventSender,
}

impl AppServices {
    pub fn new(
        client: Arc<ProcessorClient>,
        relay: Arc<MerchantValidationRelay>,
        events: EventSender,
    ) -> Self {
        Self {
            client,
            relay,
            events,
        }
    }
}

/// Register the gateway's v1 routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/applepay/validate-merchant",
            post(relay::validate_merchant),
        )
        .route("/transactions/capture", post(transactions::capture))
        .route("/transactions/refund", post(transactions::refund))
        .route("/transactions/void", post(transactions::void))
        .route("/payouts", post(transactions::payout))
}
