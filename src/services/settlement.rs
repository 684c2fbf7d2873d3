use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::{
    checkout::{
        build_billing_address, build_customer, CheckoutOrder, OrderStatus, PaymentMethod,
        META_OPAQUE_DATA, META_ORDER_DISPLAY_ID, META_ORDER_ID,
    },
    config::CaptureMode,
    errors::GatewayError,
    events::{Event, EventSender},
    processor::{
        client::ProcessorClient,
        types::{
            OpaqueToken, TransactPayload, APPLE_PAY_DATA_DESCRIPTOR, GOOGLE_PAY_DATA_DESCRIPTOR,
        },
    },
};

/// Result of a successful settlement.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub processor_order_id: String,
    pub processor_display_id: String,
    /// False when the charge was authorize-only and awaits capture.
    pub captured: bool,
}

/// Exchanges the opaque token for a settled transaction at
/// order-processing time and maps the result onto order state. Performs at
/// most one settlement call per invocation; preventing re-invocation on an
/// already-settled order is the host framework's job.
pub struct SettlementService {
    client: Arc<ProcessorClient>,
    capture_mode: CaptureMode,
    events: EventSender,
}

impl SettlementService {
    pub fn new(client: Arc<ProcessorClient>, capture_mode: CaptureMode, events: EventSender) -> Self {
        Self {
            client,
            capture_mode,
            events,
        }
    }

    /// Settle an order from the raw token the checkout payload carried:
    /// serialized token JSON for card payments, a base64 wallet blob for
    /// Apple Pay / Google Pay.
    #[instrument(skip(self, order, raw_token), fields(order_id = %order.id()))]
    pub async fn settle(
        &self,
        order: &mut dyn CheckoutOrder,
        method: PaymentMethod,
        raw_token: &str,
    ) -> Result<SettlementOutcome, GatewayError> {
        let token = parse_incoming_token(method, raw_token)?;

        let payload = TransactPayload::fiat(
            order.currency(),
            order.total(),
            token.clone(),
            build_customer(order),
            build_billing_address(order),
            order.id(),
        );

        info!(
            amount = %payload.amount,
            currency = %payload.currency,
            ?method,
            "processing payment"
        );

        // Wallet charges are always a sale; deferred capture applies to
        // cards only.
        let authorize_only =
            method == PaymentMethod::Card && self.capture_mode == CaptureMode::Authorize;

        let response = if authorize_only {
            self.client.authorize(&payload).await
        } else {
            self.client.transact(&payload).await
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                if let GatewayError::Processor { status, body, .. } = &err {
                    error!(%status, response = %body, "payment failed");
                }
                order.set_status(OrderStatus::Failed, "Payment has been failed.");
                self.events
                    .send_logged(Event::PaymentFailed {
                        order_id: order.id(),
                        message: err.response_message(),
                    })
                    .await;
                return Err(err.into_declined());
            }
        };

        let result = response.result.unwrap_or(crate::processor::types::TransactResult {
            order_id: None,
            order_display_id: None,
        });

        let processor_order_id = match result.order_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                // The HTTP call succeeded but without a transaction id
                // there is no way to capture, refund, or void later.
                error!("missing transaction id in processor response");
                order.set_status(OrderStatus::Failed, "Payment failed: missing transaction id.");
                self.events
                    .send_logged(Event::PaymentFailed {
                        order_id: order.id(),
                        message: "missing transaction id".into(),
                    })
                    .await;
                return Err(GatewayError::MissingTransactionId);
            }
        };
        let processor_display_id = result.order_display_id.unwrap_or_default();

        order.set_meta(META_ORDER_ID, processor_order_id.clone());
        order.set_meta(META_ORDER_DISPLAY_ID, processor_display_id.clone());
        // Retained for subscription re-use only, never for replaying the
        // original charge.
        order.set_meta(META_OPAQUE_DATA, serde_json::to_string(&token)?);

        if authorize_only {
            order.set_status(
                OrderStatus::OnHold,
                "ChargX payment authorized. Capture later via ChargX or gateway.",
            );
        } else {
            order.set_status(OrderStatus::Paid, "ChargX payment completed.");
        }
        order.empty_cart();

        self.events
            .send_logged(Event::PaymentSettled {
                order_id: order.id(),
                processor_order_id: processor_order_id.clone(),
                amount: order.total(),
                currency: order.currency(),
                captured: !authorize_only,
            })
            .await;

        info!(%processor_order_id, "payment settled");

        Ok(SettlementOutcome {
            processor_order_id,
            processor_display_id,
            captured: !authorize_only,
        })
    }

    /// Refund the transaction recorded on the order.
    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn refund(
        &self,
        order: &mut dyn CheckoutOrder,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let processor_order_id = self.recorded_transaction_id(order)?;

        info!(%processor_order_id, %reason, "refund requested");

        self.client.refund(&processor_order_id).await?;
        order.add_note(&format!("ChargX refund processed. Reason: {}", reason));

        self.events
            .send_logged(Event::RefundProcessed {
                order_id: order.id(),
                processor_order_id,
            })
            .await;
        Ok(())
    }

    /// Capture a previously authorized transaction.
    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn capture(&self, order: &mut dyn CheckoutOrder) -> Result<(), GatewayError> {
        let processor_order_id = self.recorded_transaction_id(order)?;

        self.client.capture(&processor_order_id).await?;
        order.set_status(OrderStatus::Paid, "ChargX payment captured.");

        self.events
            .send_logged(Event::TransactionCaptured {
                order_id: order.id(),
                processor_order_id,
            })
            .await;
        Ok(())
    }

    /// Void a previously authorized transaction.
    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn void(&self, order: &mut dyn CheckoutOrder) -> Result<(), GatewayError> {
        let processor_order_id = self.recorded_transaction_id(order)?;

        self.client.void(&processor_order_id).await?;
        order.add_note("ChargX transaction voided.");

        self.events
            .send_logged(Event::TransactionVoided {
                order_id: order.id(),
                processor_order_id,
            })
            .await;
        Ok(())
    }

    fn recorded_transaction_id(&self, order: &dyn CheckoutOrder) -> Result<String, GatewayError> {
        order
            .meta(META_ORDER_ID)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                warn!("no ChargX transaction recorded on order");
                GatewayError::NotFound("ChargX transaction not found for this order".to_string())
            })
    }
}

/// Validate the incoming token field and lift it into an `OpaqueToken`.
fn parse_incoming_token(
    method: PaymentMethod,
    raw_token: &str,
) -> Result<OpaqueToken, GatewayError> {
    match method {
        PaymentMethod::Card => {
            if raw_token.trim().is_empty() {
                return Err(GatewayError::Validation(
                    "There was a problem tokenizing your card. Please try again.".to_string(),
                ));
            }
            serde_json::from_str(raw_token).map_err(|_| {
                GatewayError::Validation(
                    "Invalid card token received. Please try again.".to_string(),
                )
            })
        }
        PaymentMethod::ApplePay => {
            if raw_token.trim().is_empty() {
                return Err(GatewayError::Validation(
                    "Missing Apple Pay payment token. Please try again.".to_string(),
                ));
            }
            Ok(OpaqueToken::wallet(
                APPLE_PAY_DATA_DESCRIPTOR,
                raw_token.to_string(),
            ))
        }
        PaymentMethod::GooglePay => {
            if raw_token.trim().is_empty() {
                return Err(GatewayError::Validation(
                    "Missing Google Pay payment token. Please try again.".to_string(),
                ));
            }
            Ok(OpaqueToken::wallet(
                GOOGLE_PAY_DATA_DESCRIPTOR,
                raw_token.to_string(),
            ))
        }
    }
}
