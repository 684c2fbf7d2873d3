#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use chargx_gateway::{
    checkout::{CheckoutForm, CheckoutOrder, OrderStatus, SubmissionResult},
    errors::GatewayError,
    events::EventSender,
    processor::ProcessorClient,
};

/// In-memory order standing in for the host's order storage.
pub struct TestOrder {
    pub order_id: String,
    pub total: Decimal,
    pub currency: String,
    pub meta: HashMap<String, String>,
    pub status: OrderStatus,
    pub notes: Vec<String>,
    pub cart_emptied: bool,
}

impl TestOrder {
    pub fn new() -> Self {
        Self {
            order_id: "1001".to_string(),
            total: dec!(19.90),
            currency: "USD".to_string(),
            meta: HashMap::new(),
            status: OrderStatus::Pending,
            notes: Vec::new(),
            cart_emptied: false,
        }
    }
}

impl CheckoutOrder for TestOrder {
    fn id(&self) -> String {
        self.order_id.clone()
    }
    fn total(&self) -> Decimal {
        self.total
    }
    fn currency(&self) -> String {
        self.currency.clone()
    }

    fn billing_first_name(&self) -> String {
        "Ada".to_string()
    }
    fn billing_last_name(&self) -> String {
        "Lovelace".to_string()
    }
    fn billing_email(&self) -> String {
        "ada@example.com".to_string()
    }
    fn billing_phone(&self) -> String {
        "+1 555 0100".to_string()
    }
    fn billing_address_1(&self) -> String {
        "1 Analytical Way".to_string()
    }
    fn billing_address_2(&self) -> String {
        "Suite 2".to_string()
    }
    fn billing_city(&self) -> String {
        "London".to_string()
    }
    fn billing_state(&self) -> String {
        "LDN".to_string()
    }
    fn billing_postcode(&self) -> String {
        "12345".to_string()
    }
    fn billing_country(&self) -> String {
        "GB".to_string()
    }

    fn meta(&self, key: &str) -> Option<String> {
        self.meta.get(key).cloned()
    }
    fn set_meta(&mut self, key: &str, value: String) {
        self.meta.insert(key.to_string(), value);
    }
    fn delete_meta(&mut self, key: &str) {
        self.meta.remove(key);
    }

    fn set_status(&mut self, status: OrderStatus, note: &str) {
        self.status = status;
        self.notes.push(note.to_string());
    }
    fn add_note(&mut self, note: &str) {
        self.notes.push(note.to_string());
    }

    fn empty_cart(&mut self) {
        self.cart_emptied = true;
    }
}

/// In-memory place-order form. `submit` answers with a canned envelope and
/// counts how often the submission actually went through.
pub struct TestForm {
    pub opaque_data: Option<String>,
    pub submissions: usize,
    pub errors: Vec<String>,
    pub response: SubmissionResult,
}

impl TestForm {
    pub fn new() -> Self {
        Self {
            opaque_data: None,
            submissions: 0,
            errors: Vec::new(),
            response: SubmissionResult::success(Some("/order-received/1001".to_string())),
        }
    }

    pub fn answering(response: SubmissionResult) -> Self {
        Self {
            response,
            ..Self::new()
        }
    }
}

#[async_trait]
impl CheckoutForm for TestForm {
    fn opaque_data(&self) -> Option<String> {
        self.opaque_data.clone()
    }

    fn set_opaque_data(&mut self, serialized: String) {
        self.opaque_data = Some(serialized);
    }

    async fn submit(&mut self) -> Result<SubmissionResult, GatewayError> {
        self.submissions += 1;
        Ok(self.response.clone())
    }

    fn submit_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

/// Client wired against a mock processor.
pub fn processor_client(base_uri: &str) -> Arc<ProcessorClient> {
    Arc::new(
        ProcessorClient::new(
            base_uri,
            &format!("{base_uri}/admin"),
            "pk_test_123",
            Some("sk_test_123"),
            Duration::from_secs(5),
        )
        .unwrap(),
    )
}

/// Event sender whose receiver is drained in the background.
pub fn event_sender() -> EventSender {
    let (tx, mut rx) = mpsc::channel(64);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    EventSender::new(tx)
}
