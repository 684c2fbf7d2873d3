use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    checkout::{AsyncCheckoutSubmitter, PaymentMethod},
    errors::GatewayError,
    processor::client::ProcessorClient,
    services::{
        relay::MerchantValidator,
        wallets::{PaymentCompletion, WalletCallback, WalletSessionState},
    },
};

/// The platform-side Apple Pay session: capability predicate, session
/// opening, and the completion surface the adapter must drive.
#[async_trait]
pub trait ApplePayUi: Send + Sync {
    /// Platform capability predicate, evaluated once at adapter
    /// construction to decide button visibility.
    fn can_make_payments(&self) -> bool;

    /// Open the native wallet session for `payment_request`. Session
    /// callbacks arrive on the returned channel.
    async fn begin(
        &self,
        payment_request: Value,
    ) -> Result<mpsc::Receiver<WalletCallback>, GatewayError>;

    /// Feed the signed merchant session back into the wallet.
    async fn complete_merchant_validation(&self, session: Value);

    /// Abort the session (merchant validation failed).
    async fn abort(&self);

    /// Resolve the authorization and release the native payment sheet.
    /// Invoked exactly once per authorization attempt; omitting it leaks
    /// the sheet.
    async fn complete_payment(&self, completion: PaymentCompletion);
}

#[async_trait]
impl<T: ApplePayUi + ?Sized> ApplePayUi for Arc<T> {
    fn can_make_payments(&self) -> bool {
        (**self).can_make_payments()
    }

    async fn begin(
        &self,
        payment_request: Value,
    ) -> Result<mpsc::Receiver<WalletCallback>, GatewayError> {
        (**self).begin(payment_request).await
    }

    async fn complete_merchant_validation(&self, session: Value) {
        (**self).complete_merchant_validation(session).await
    }

    async fn abort(&self) {
        (**self).abort().await
    }

    async fn complete_payment(&self, completion: PaymentCompletion) {
        (**self).complete_payment(completion).await
    }
}

pub struct ApplePayAdapter<U> {
    client: Arc<ProcessorClient>,
    relay: Arc<dyn MerchantValidator>,
    submitter: Arc<dyn AsyncCheckoutSubmitter>,
    ui: U,
    available: bool,
}

impl<U: ApplePayUi> ApplePayAdapter<U> {
    pub fn new(
        client: Arc<ProcessorClient>,
        relay: Arc<dyn MerchantValidator>,
        submitter: Arc<dyn AsyncCheckoutSubmitter>,
        ui: U,
    ) -> Self {
        let available = ui.can_make_payments();
        Self {
            client,
            relay,
            submitter,
            ui,
            available,
        }
    }

    /// Whether the Apple Pay button should render at all.
    pub fn button_visible(&self) -> bool {
        self.available
    }

    /// Run one payment attempt: fetch the wallet descriptor, open the
    /// native session, and drive its callbacks to a terminal state.
    #[instrument(skip(self))]
    pub async fn start(&self, order_total: Decimal) -> Result<WalletSessionState, GatewayError> {
        if !self.available {
            return Ok(WalletSessionState::Unavailable);
        }

        let descriptor = self
            .client
            .pretransact()
            .await
            .map_err(super::wallet_bootstrap_error)?;
        let mut payment_request = descriptor
            .apple_pay
            .and_then(|a| a.payment_request)
            .ok_or_else(|| {
                GatewayError::ProcessorUnavailable(
                    "Apple Pay configuration not available from ChargX".to_string(),
                )
            })?;

        inject_total(&mut payment_request, order_total);

        let mut state = WalletSessionState::Requesting;
        let mut callbacks = self.ui.begin(payment_request).await?;

        info!("Apple Pay session opened");

        while let Some(callback) = callbacks.recv().await {
            state = self.handle_callback(state, callback).await?;
            if state.is_terminal() {
                break;
            }
        }

        Ok(state)
    }

    async fn handle_callback(
        &self,
        state: WalletSessionState,
        callback: WalletCallback,
    ) -> Result<WalletSessionState, GatewayError> {
        if state.is_terminal() {
            debug!("ignoring wallet callback after terminal state");
            return Ok(state);
        }

        match callback {
            WalletCallback::ValidateMerchant { validation_url } => {
                match self.relay.validate(&validation_url).await {
                    Ok(session) => {
                        self.ui.complete_merchant_validation(session).await;
                        Ok(WalletSessionState::AwaitingUserAuth)
                    }
                    Err(e) => {
                        // Abort silently for the buyer; the detail is for
                        // operators.
                        error!(error = %e, "Apple Pay merchant validation failed");
                        self.ui.abort().await;
                        Ok(WalletSessionState::Failed)
                    }
                }
            }
            WalletCallback::PaymentAuthorized { payment_data } => {
                let Some(payment_data) = payment_data else {
                    warn!("payment authorized without payment data");
                    self.ui.complete_payment(PaymentCompletion::Failure).await;
                    return Ok(WalletSessionState::Failed);
                };

                let token_base64 = BASE64.encode(serde_json::to_vec(&payment_data)?);
                debug!(
                    state = ?WalletSessionState::AuthorizedPending,
                    "payment authorized, submitting checkout out-of-band"
                );

                // Submit the checkout out-of-band; the wallet sheet stays
                // open until we resolve the completion from the response.
                match self
                    .submitter
                    .submit(PaymentMethod::ApplePay, token_base64)
                    .await
                {
                    Ok(result) if result.is_success() => {
                        self.ui.complete_payment(PaymentCompletion::Success).await;
                        info!("Apple Pay checkout completed");
                        Ok(WalletSessionState::Completed)
                    }
                    Ok(result) => {
                        warn!(messages = ?result.messages, "Apple Pay checkout rejected");
                        self.ui.complete_payment(PaymentCompletion::Failure).await;
                        Ok(WalletSessionState::Failed)
                    }
                    Err(e) => {
                        error!(error = %e, "Apple Pay checkout submission failed");
                        self.ui.complete_payment(PaymentCompletion::Failure).await;
                        Ok(WalletSessionState::Failed)
                    }
                }
            }
            WalletCallback::Cancelled => {
                // Buyer cancelled; no side effects.
                info!("Apple Pay session cancelled by buyer");
                Ok(WalletSessionState::Cancelled)
            }
        }
    }
}

/// Overwrite the payment request's total with the computed order total.
fn inject_total(payment_request: &mut Value, order_total: Decimal) {
    let amount = format!("{:.2}", order_total);
    match payment_request.get_mut("total") {
        Some(Value::Object(total)) => {
            total.insert("amount".to_string(), Value::String(amount));
        }
        _ => {
            payment_request["total"] = json!({ "amount": amount });
        }
    }
}
