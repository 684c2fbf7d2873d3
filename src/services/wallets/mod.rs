//! Wallet session adapters.
//!
//! Apple Pay and Google Pay are driven through their native UIs, which act
//! as a second asynchronous actor. Each adapter owns one active session at
//! a time; platform callbacks are messages on a single-consumer channel
//! bound to that session, and messages arriving after a terminal state are
//! ignored.

pub mod apple;
pub mod google;

pub use apple::{ApplePayAdapter, ApplePayUi};
pub use google::{GooglePayAdapter, GooglePayUi};

/// Shared life cycle of a wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletSessionState {
    /// Platform capability absent; the payment button is hidden.
    Unavailable,
    /// Fetching the wallet descriptor and opening the session.
    Requesting,
    /// Session open, waiting for the buyer to authorize in the native UI.
    AwaitingUserAuth,
    /// Buyer authorized; the encrypted payment blob is being submitted.
    AuthorizedPending,
    Completed,
    Cancelled,
    Failed,
}

impl WalletSessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WalletSessionState::Completed
                | WalletSessionState::Cancelled
                | WalletSessionState::Failed
                | WalletSessionState::Unavailable
        )
    }
}

/// Callback raised by the platform wallet UI.
#[derive(Debug, Clone)]
pub enum WalletCallback {
    /// The wallet asks the merchant to prove its identity.
    ValidateMerchant { validation_url: String },
    /// The buyer authorized payment; `payment_data` is the encrypted blob,
    /// absent when the platform delivered an empty authorization.
    PaymentAuthorized {
        payment_data: Option<serde_json::Value>,
    },
    /// The buyer dismissed the sheet.
    Cancelled,
}

/// Verdict reported back into the wallet UI to close the native sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCompletion {
    Success,
    Failure,
}

/// Pretransact failures during wallet bootstrap read as the processor
/// being unavailable, whatever the transport detail was.
pub(crate) fn wallet_bootstrap_error(err: crate::errors::GatewayError) -> crate::errors::GatewayError {
    use crate::errors::GatewayError;

    match err {
        GatewayError::Processor {
            status, message, ..
        } => GatewayError::ProcessorUnavailable(format!(
            "pretransact failed with status {status}: {message}"
        )),
        GatewayError::Transport(msg) => GatewayError::ProcessorUnavailable(msg),
        other => other,
    }
}
