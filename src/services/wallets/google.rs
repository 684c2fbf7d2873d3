use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    checkout::{AsyncCheckoutSubmitter, PaymentMethod},
    errors::GatewayError,
    processor::client::ProcessorClient,
    services::wallets::{PaymentCompletion, WalletSessionState},
};

/// The browser-side PaymentRequest surface for Google Pay.
#[async_trait]
pub trait GooglePayUi: Send + Sync {
    /// Wallet API presence, evaluated once at adapter construction to
    /// decide button visibility.
    fn is_available(&self) -> bool;

    /// Probe whether the buyer can actually pay with the given method data.
    async fn is_ready_to_pay(&self, method_data: Value) -> Result<bool, GatewayError>;

    /// Show the native payment sheet. `None` means the buyer dismissed it.
    async fn show_payment_sheet(&self, request: Value) -> Result<Option<Value>, GatewayError>;

    /// Resolve the sheet's completion callback. Invoked exactly once per
    /// authorization; an unresolved completion leaves the browser UI stuck.
    async fn complete(&self, completion: PaymentCompletion);
}

#[async_trait]
impl<T: GooglePayUi + ?Sized> GooglePayUi for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    async fn is_ready_to_pay(&self, method_data: Value) -> Result<bool, GatewayError> {
        (**self).is_ready_to_pay(method_data).await
    }

    async fn show_payment_sheet(&self, request: Value) -> Result<Option<Value>, GatewayError> {
        (**self).show_payment_sheet(request).await
    }

    async fn complete(&self, completion: PaymentCompletion) {
        (**self).complete(completion).await
    }
}

pub struct GooglePayAdapter<U> {
    client: Arc<ProcessorClient>,
    submitter: Arc<dyn AsyncCheckoutSubmitter>,
    ui: U,
    available: bool,
}

impl<U: GooglePayUi> GooglePayAdapter<U> {
    pub fn new(
        client: Arc<ProcessorClient>,
        submitter: Arc<dyn AsyncCheckoutSubmitter>,
        ui: U,
    ) -> Self {
        let available = ui.is_available();
        Self {
            client,
            submitter,
            ui,
            available,
        }
    }

    /// Whether the Google Pay button should render at all.
    pub fn button_visible(&self) -> bool {
        self.available
    }

    /// Run one payment attempt through the native payment sheet.
    #[instrument(skip(self))]
    pub async fn start(
        &self,
        order_total: Decimal,
        currency: &str,
    ) -> Result<WalletSessionState, GatewayError> {
        if !self.available {
            return Ok(WalletSessionState::Unavailable);
        }

        let descriptor = self
            .client
            .pretransact()
            .await
            .map_err(super::wallet_bootstrap_error)?;
        let method_data = descriptor
            .google_pay
            .and_then(|g| g.method_data)
            .ok_or_else(|| {
                GatewayError::ProcessorUnavailable(
                    "Google Pay configuration not available from ChargX".to_string(),
                )
            })?;

        if !self.ui.is_ready_to_pay(method_data.clone()).await? {
            info!("buyer cannot pay with Google Pay");
            return Ok(WalletSessionState::Failed);
        }

        let request = json!({
            "methodData": method_data,
            "total": format!("{:.2}", order_total),
            "currency": currency,
        });

        debug!(state = ?WalletSessionState::AwaitingUserAuth, "showing payment sheet");
        let response = match self.ui.show_payment_sheet(request).await? {
            Some(response) => response,
            None => {
                // Buyer dismissed the sheet; no side effects.
                info!("Google Pay sheet cancelled by buyer");
                return Ok(WalletSessionState::Cancelled);
            }
        };
        debug!(state = ?WalletSessionState::AuthorizedPending, "payment sheet authorized");

        let Some(token) = extract_payment_token(&response) else {
            warn!("Google Pay response carries no payment token");
            self.ui.complete(PaymentCompletion::Failure).await;
            return Ok(WalletSessionState::Failed);
        };

        let token_base64 = BASE64.encode(token.as_bytes());

        // The sheet stays open until the completion callback is resolved
        // from the checkout response.
        match self
            .submitter
            .submit(PaymentMethod::GooglePay, token_base64)
            .await
        {
            Ok(result) if result.is_success() => {
                self.ui.complete(PaymentCompletion::Success).await;
                info!("Google Pay checkout completed");
                Ok(WalletSessionState::Completed)
            }
            Ok(result) => {
                warn!(messages = ?result.messages, "Google Pay checkout rejected");
                self.ui.complete(PaymentCompletion::Failure).await;
                Ok(WalletSessionState::Failed)
            }
            Err(e) => {
                error!(error = %e, "Google Pay checkout submission failed");
                self.ui.complete(PaymentCompletion::Failure).await;
                Ok(WalletSessionState::Failed)
            }
        }
    }
}

/// Pull the processor token out of the PaymentRequest response's
/// payment-method data.
fn extract_payment_token(response: &Value) -> Option<String> {
    response
        .pointer("/paymentMethodData/tokenizationData/token")
        .or_else(|| response.get("token"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_extraction_reads_payment_method_data() {
        let response = json!({
            "paymentMethodData": {
                "tokenizationData": { "type": "PAYMENT_GATEWAY", "token": "gp_tok_1" }
            }
        });
        assert_eq!(extract_payment_token(&response).as_deref(), Some("gp_tok_1"));

        let response = json!({ "token": "gp_tok_2" });
        assert_eq!(extract_payment_token(&response).as_deref(), Some("gp_tok_2"));

        let response = json!({ "paymentMethodData": {} });
        assert_eq!(extract_payment_token(&response), None);

        let response = json!({ "token": "" });
        assert_eq!(extract_payment_token(&response), None);
    }
}
