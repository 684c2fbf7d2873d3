use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error envelope returned by the HTTP surface
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Gateway", "Payment Required")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing keys, certificates, or other operator-supplied settings.
    /// Fatal for the attempt, never retryable by the buyer.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad buyer input. Recoverable: the buyer corrects and resubmits.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The processor could not be reached or returned an unusable
    /// pretransact response.
    #[error("Processor unavailable: {0}")]
    ProcessorUnavailable(String),

    /// Network-level failure talking to an external endpoint.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The token endpoint answered but violated its contract.
    #[error("Tokenization error: {0}")]
    Tokenization(String),

    /// The processor accepted the charge but returned no transaction id,
    /// which makes later capture/refund/void impossible.
    #[error("Processor response is missing a transaction id")]
    MissingTransactionId,

    /// Wallet merchant validation was rejected by the wallet servers.
    #[error("Merchant validation rejected: {0}")]
    ValidationRejected(String),

    /// Non-2xx response from the ChargX API. Callers decide how to surface
    /// it; the raw body is for operator logs only.
    #[error("ChargX API error ({status}): {message}")]
    Processor {
        status: u16,
        body: String,
        message: String,
    },

    /// The processor refused the charge. `body` holds the raw response for
    /// operator logs; `message` is what the buyer may see.
    #[error("Payment declined: {message}")]
    PaymentDeclined {
        status: u16,
        body: String,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Build an API error from a processor response, pulling the `message`
    /// field out of the body when one is present.
    pub fn processor(status: u16, body: String) -> Self {
        let message = extract_processor_message(&body);
        GatewayError::Processor {
            status,
            body,
            message,
        }
    }

    /// Build a declined-payment error from a processor response, pulling the
    /// `message` field out of the body when one is present.
    pub fn declined(status: u16, body: String) -> Self {
        let message = extract_processor_message(&body);
        GatewayError::PaymentDeclined {
            status,
            body,
            message,
        }
    }

    /// Reinterpret a processor API error as a declined payment so its
    /// message reaches the buyer verbatim. Other errors pass through.
    pub fn into_declined(self) -> Self {
        match self {
            GatewayError::Processor {
                status,
                body,
                message,
            } => GatewayError::PaymentDeclined {
                status,
                body,
                message,
            },
            other => other,
        }
    }

    /// HTTP status for this error. Single source of truth for the mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ProcessorUnavailable(_)
            | Self::Transport(_)
            | Self::Tokenization(_)
            | Self::MissingTransactionId
            | Self::ValidationRejected(_)
            | Self::Processor { .. } => StatusCode::BAD_GATEWAY,
            Self::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Serialization(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for buyer-facing responses. Transport-level detail
    /// and raw processor bodies stay in the operator logs only.
    pub fn response_message(&self) -> String {
        match self {
            Self::ProcessorUnavailable(_) | Self::Transport(_) | Self::Processor { .. } => {
                "The payment service is temporarily unavailable. Please try again.".to_string()
            }
            Self::ValidationRejected(_) => "Merchant validation failed.".to_string(),
            Self::PaymentDeclined { message, .. } => message.clone(),
            Self::Serialization(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// True when the buyer can fix the problem and resubmit.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::PaymentDeclined { .. } | Self::Tokenization(_)
        )
    }
}

fn extract_processor_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| "Unknown ChargX API error".to_string())
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
