use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    checkout::{attempt::AttemptStore, CheckoutForm, SubmissionResult},
    errors::GatewayError,
    services::tokenization::{CardFields, TokenizationEngine},
};

/// What became of a place-order interception.
#[derive(Debug)]
pub enum PlaceOrderOutcome {
    /// The submission went through to the host pipeline.
    Submitted(SubmissionResult),
    /// A tokenization is already in flight for this session; the trigger
    /// was a no-op and the pending attempt owns the session.
    Ignored,
}

/// Intercepts the place-order action for token-based payment methods.
///
/// The first interception with no token present suppresses the default
/// submission, tokenizes, injects the token into the payload, and
/// re-triggers. The re-triggered submission sees the token and passes
/// through exactly once. Wallet methods bypass this entirely and submit
/// out-of-band.
pub struct SubmissionOrchestrator {
    tokenizer: Arc<TokenizationEngine>,
    attempts: Arc<AttemptStore>,
}

impl SubmissionOrchestrator {
    pub fn new(tokenizer: Arc<TokenizationEngine>, attempts: Arc<AttemptStore>) -> Self {
        Self {
            tokenizer,
            attempts,
        }
    }

    pub fn attempts(&self) -> &AttemptStore {
        &self.attempts
    }

    #[instrument(skip(self, card, form))]
    pub async fn place_order(
        &self,
        session_id: Uuid,
        card: &CardFields,
        form: &mut dyn CheckoutForm,
    ) -> Result<PlaceOrderOutcome, GatewayError> {
        // A token already in the payload means this is the re-triggered
        // submission (or a buyer retry after a failed one): let it through
        // without touching the processor again.
        if form.opaque_data().is_some() {
            debug!(%session_id, "token present, allowing submission through");
            return self
                .pass_through(session_id, form)
                .await
                .map(PlaceOrderOutcome::Submitted);
        }

        if !self.attempts.try_begin_tokenizing(session_id) {
            debug!(%session_id, "tokenization already in flight, ignoring submit");
            return Ok(PlaceOrderOutcome::Ignored);
        }

        match self.tokenizer.tokenize_card(card).await {
            Ok(token) => {
                self.attempts.mark_tokenized(session_id);

                let serialized = match serde_json::to_string(&token) {
                    Ok(s) => s,
                    Err(e) => {
                        self.attempts.reset(session_id);
                        return Err(GatewayError::Serialization(e.to_string()));
                    }
                };
                form.set_opaque_data(serialized);
                info!(%session_id, "card tokenized, re-triggering submission");

                self.pass_through(session_id, form)
                    .await
                    .map(PlaceOrderOutcome::Submitted)
            }
            Err(err) => {
                warn!(
                    %session_id,
                    error = %err,
                    recoverable = err.is_recoverable(),
                    "tokenization failed, blocking submission"
                );
                self.attempts.reset(session_id);
                form.submit_error(&err.response_message());
                Err(err)
            }
        }
    }

    async fn pass_through(
        &self,
        session_id: Uuid,
        form: &mut dyn CheckoutForm,
    ) -> Result<SubmissionResult, GatewayError> {
        self.attempts.begin_submitting(session_id);

        match form.submit().await {
            Ok(result) => {
                self.attempts.finish(session_id, result.is_success());
                if !result.is_success() {
                    if let Some(messages) = &result.messages {
                        form.submit_error(messages);
                    }
                    // Back to Idle so the buyer can retry.
                    self.attempts.reset(session_id);
                }
                Ok(result)
            }
            Err(err) => {
                self.attempts.finish(session_id, false);
                form.submit_error(&err.response_message());
                self.attempts.reset(session_id);
                Err(err)
            }
        }
    }
}
