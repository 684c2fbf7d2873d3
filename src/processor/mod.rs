//! Typed client for the ChargX public and admin APIs.

pub mod client;
pub mod types;

pub use client::ProcessorClient;
pub use types::{
    BillingAddress, Customer, OpaqueToken, PretransactDescriptor, SubscriptionCustomer,
    SubscriptionPayload, SubscriptionResponse, TransactPayload, TransactResponse, TransactResult,
    APPLE_PAY_DATA_DESCRIPTOR, GOOGLE_PAY_DATA_DESCRIPTOR,
};
