//! Boundary between the gateway core and the hosting checkout framework.
//!
//! The core never reaches into the host's order storage or form pipeline;
//! everything goes through the narrow traits here.

pub mod attempt;
pub mod orchestrator;

pub use attempt::{AttemptStore, PaymentAttemptState};
pub use orchestrator::{PlaceOrderOutcome, SubmissionOrchestrator};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    errors::GatewayError,
    processor::types::{BillingAddress, Customer},
};

/// Order metadata keys this gateway owns. Written only after a successful
/// settlement response.
pub const META_ORDER_ID: &str = "_chargx_order_id";
pub const META_ORDER_DISPLAY_ID: &str = "_chargx_order_display_id";
pub const META_OPAQUE_DATA: &str = "_chargx_opaque_data";
pub const META_SUBSCRIPTION_ID: &str = "_chargx_subscription_id";

/// Payment methods this gateway offers at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    ApplePay,
    GooglePay,
}

/// Host-side order states the settlement handler transitions into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    /// Settled and captured
    Paid,
    /// Authorized, capture deferred
    OnHold,
    Failed,
}

/// Handle to an order owned by the host's order storage. The gateway reads
/// billing data from it and mutates it only through these methods.
pub trait CheckoutOrder: Send {
    fn id(&self) -> String;
    fn total(&self) -> Decimal;
    fn currency(&self) -> String;

    fn billing_first_name(&self) -> String;
    fn billing_last_name(&self) -> String;
    fn billing_email(&self) -> String;
    fn billing_phone(&self) -> String;
    fn billing_address_1(&self) -> String;
    fn billing_address_2(&self) -> String;
    fn billing_city(&self) -> String;
    fn billing_state(&self) -> String;
    fn billing_postcode(&self) -> String;
    fn billing_country(&self) -> String;

    fn meta(&self, key: &str) -> Option<String>;
    fn set_meta(&mut self, key: &str, value: String);
    fn delete_meta(&mut self, key: &str);

    fn set_status(&mut self, status: OrderStatus, note: &str);
    fn add_note(&mut self, note: &str);

    /// Clear the buyer's cart after a completed purchase.
    fn empty_cart(&mut self);
}

/// Envelope the host checkout pipeline answers a submission with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub result: SubmissionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionOutcome {
    Success,
    Failure,
}

impl SubmissionResult {
    pub fn success(redirect: Option<String>) -> Self {
        Self {
            result: SubmissionOutcome::Success,
            redirect,
            messages: None,
        }
    }

    pub fn failure(messages: Option<String>) -> Self {
        Self {
            result: SubmissionOutcome::Failure,
            redirect: None,
            messages,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == SubmissionOutcome::Success
    }
}

/// The host's place-order form as the orchestrator sees it: a slot for the
/// serialized token, a way to let the submission proceed, and a way to
/// surface a field-level error.
#[async_trait]
pub trait CheckoutForm: Send {
    /// Serialized opaque token already present in the outgoing payload.
    fn opaque_data(&self) -> Option<String>;

    /// Inject the serialized token into the outgoing payload.
    fn set_opaque_data(&mut self, serialized: String);

    /// Deliver the payload to the host checkout pipeline.
    async fn submit(&mut self) -> Result<SubmissionResult, GatewayError>;

    /// Surface a field-level error to the buyer without submitting.
    fn submit_error(&mut self, message: &str);
}

/// Out-of-band submission path the wallet adapters use. Wallet flows never
/// go through the synchronous place-order interception.
#[async_trait]
pub trait AsyncCheckoutSubmitter: Send + Sync {
    async fn submit(
        &self,
        method: PaymentMethod,
        token_base64: String,
    ) -> Result<SubmissionResult, GatewayError>;
}

/// Buyer contact record from the order's billing fields.
pub fn build_customer(order: &dyn CheckoutOrder) -> Customer {
    Customer {
        name: format!(
            "{} {}",
            order.billing_first_name(),
            order.billing_last_name()
        )
        .trim()
        .to_string(),
        email: order.billing_email(),
        phone: order.billing_phone(),
    }
}

/// Billing address record from the order's billing fields.
pub fn build_billing_address(order: &dyn CheckoutOrder) -> BillingAddress {
    BillingAddress {
        street: order.billing_address_1(),
        unit: order.billing_address_2(),
        city: order.billing_city(),
        state: order.billing_state(),
        zip_code: order.billing_postcode(),
        country_code: order.billing_country(),
        phone: order.billing_phone(),
    }
}
