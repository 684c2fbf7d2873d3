use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::{
    checkout::{build_billing_address, CheckoutOrder, META_OPAQUE_DATA, META_SUBSCRIPTION_ID},
    events::{Event, EventSender},
    processor::{
        client::ProcessorClient,
        types::{OpaqueToken, SubscriptionCustomer, SubscriptionPayload},
    },
};

/// Minimal recurring-payments integration: creates a processor subscription
/// from a settled parent order's stored token and tears it down when the
/// host cancels. Failures here are logged and never fail the host flow.
pub struct SubscriptionService {
    client: Arc<ProcessorClient>,
    events: EventSender,
}

impl SubscriptionService {
    pub fn new(client: Arc<ProcessorClient>, events: EventSender) -> Self {
        Self { client, events }
    }

    /// Create a processor subscription for a subscription rooted at
    /// `parent_order`, unless one already exists. Returns the processor
    /// subscription id when one was created.
    #[instrument(skip(self, parent_order), fields(order_id = %parent_order.id()))]
    pub async fn create_for_order(
        &self,
        subscription_id: &str,
        parent_order: &mut dyn CheckoutOrder,
    ) -> Option<String> {
        if parent_order
            .meta(META_SUBSCRIPTION_ID)
            .is_some_and(|id| !id.is_empty())
        {
            return None;
        }

        let raw = match parent_order.meta(META_OPAQUE_DATA) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return None,
        };
        let opaque_data: OpaqueToken = match serde_json::from_str(&raw) {
            Ok(token) => token,
            Err(_) => {
                warn!("stored opaque data is not valid token JSON, skipping subscription");
                return None;
            }
        };

        let payload = SubscriptionPayload {
            variant_id: format!("storefront-subscription-{}", subscription_id),
            opaque_data,
            customer: SubscriptionCustomer {
                email: parent_order.billing_email(),
                name: parent_order.billing_first_name(),
                last_name: parent_order.billing_last_name(),
                phone: parent_order.billing_phone(),
            },
            address: build_billing_address(parent_order),
        };

        let response = match self.client.create_subscription(&payload).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "failed to create ChargX subscription");
                return None;
            }
        };

        let id = response.id.filter(|id| !id.is_empty())?;
        parent_order.set_meta(META_SUBSCRIPTION_ID, id.clone());

        info!(processor_subscription_id = %id, "ChargX subscription created");
        self.events
            .send_logged(Event::SubscriptionCreated {
                order_id: parent_order.id(),
                processor_subscription_id: id.clone(),
            })
            .await;

        Some(id)
    }

    /// Cancel the processor subscription recorded on the parent order, if
    /// any. Returns true when a subscription was cancelled.
    #[instrument(skip(self, parent_order), fields(order_id = %parent_order.id()))]
    pub async fn cancel_for_order(&self, parent_order: &mut dyn CheckoutOrder) -> bool {
        let id = match parent_order.meta(META_SUBSCRIPTION_ID) {
            Some(id) if !id.is_empty() => id,
            _ => return false,
        };

        if let Err(e) = self.client.delete_subscription(&id).await {
            error!(error = %e, "failed to cancel ChargX subscription");
            return false;
        }

        parent_order.delete_meta(META_SUBSCRIPTION_ID);

        info!(processor_subscription_id = %id, "ChargX subscription cancelled");
        self.events
            .send_logged(Event::SubscriptionCancelled {
                order_id: parent_order.id(),
                processor_subscription_id: id,
            })
            .await;

        true
    }
}
