use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events the gateway emits as payment attempts move through their
/// lifecycle. Events carry ids and amounts only, never token material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PaymentSettled {
        order_id: String,
        processor_order_id: String,
        amount: Decimal,
        currency: String,
        captured: bool,
    },
    PaymentFailed {
        order_id: String,
        message: String,
    },
    RefundProcessed {
        order_id: String,
        processor_order_id: String,
    },
    TransactionCaptured {
        order_id: String,
        processor_order_id: String,
    },
    TransactionVoided {
        order_id: String,
        processor_order_id: String,
    },
    SubscriptionCreated {
        order_id: String,
        processor_subscription_id: String,
    },
    SubscriptionCancelled {
        order_id: String,
        processor_subscription_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. Event delivery is best-effort and
    /// never blocks a payment flow.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Send and log on failure instead of propagating it.
    pub async fn send_logged(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "failed to emit gateway event");
        }
    }
}

/// Consumes gateway events and records them in the operator log.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PaymentSettled {
                order_id,
                processor_order_id,
                amount,
                currency,
                captured,
            } => info!(
                %order_id,
                %processor_order_id,
                %amount,
                %currency,
                captured,
                "payment settled"
            ),
            Event::PaymentFailed { order_id, message } => {
                info!(%order_id, %message, "payment failed")
            }
            Event::RefundProcessed {
                order_id,
                processor_order_id,
            } => info!(%order_id, %processor_order_id, "refund processed"),
            Event::TransactionCaptured {
                order_id,
                processor_order_id,
            } => info!(%order_id, %processor_order_id, "transaction captured"),
            Event::TransactionVoided {
                order_id,
                processor_order_id,
            } => info!(%order_id, %processor_order_id, "transaction voided"),
            Event::SubscriptionCreated {
                order_id,
                processor_subscription_id,
            } => info!(%order_id, %processor_subscription_id, "subscription created"),
            Event::SubscriptionCancelled {
                order_id,
                processor_subscription_id,
            } => info!(%order_id, %processor_subscription_id, "subscription cancelled"),
        }
    }
}
