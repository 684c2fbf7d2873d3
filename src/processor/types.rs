use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data descriptor the processor expects for Apple Pay payment blobs.
pub const APPLE_PAY_DATA_DESCRIPTOR: &str = "COMMON.APPLE.INAPP.PAYMENT";

/// Data descriptor the processor expects for Google Pay payment blobs.
pub const GOOGLE_PAY_DATA_DESCRIPTOR: &str = "COMMON.GOOGLE.INAPP.PAYMENT";

/// Placeholder tokens the pretransact params template carries. The
/// tokenization engine substitutes these with literal card values in the
/// buyer's context only.
pub const CARD_NUMBER_PLACEHOLDER: &str = "#cardNumber#";
pub const EXPIRATION_DATE_PLACEHOLDER: &str = "#expirationDate#";
pub const CARD_CODE_PLACEHOLDER: &str = "#cardCode#";

/// Short-lived token-request descriptor issued by `GET /pretransact`.
/// Fetched fresh per payment attempt; never cached or persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PretransactDescriptor {
    /// URL the card token request is POSTed to
    pub card_token_request_url: Option<String>,
    /// Templated request body containing the card placeholders
    pub card_token_request_params: Option<serde_json::Value>,
    /// Apple Pay session bootstrap, when the store has Apple Pay enabled
    pub apple_pay: Option<ApplePayDescriptor>,
    /// Google Pay method data, when the store has Google Pay enabled
    pub google_pay: Option<GooglePayDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePayDescriptor {
    /// Payment-request object handed to the native wallet session
    pub payment_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePayDescriptor {
    /// Payment-method data handed to the browser PaymentRequest
    pub method_data: Option<serde_json::Value>,
}

/// Processor-issued stand-in for sensitive payment credentials. Opaque to
/// the merchant: no card data is recoverable from it. Transmitted to the
/// server exactly once per checkout attempt and never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueToken {
    /// Card and wallet tokens: `{dataDescriptor, dataValue}`
    Descriptor {
        #[serde(rename = "dataDescriptor")]
        data_descriptor: String,
        #[serde(rename = "dataValue")]
        data_value: String,
    },
    /// Some token endpoints return a bare token string
    Raw(String),
}

impl OpaqueToken {
    /// Wrap a base64-encoded wallet payment blob with its descriptor.
    pub fn wallet(data_descriptor: &str, data_value: String) -> Self {
        OpaqueToken::Descriptor {
            data_descriptor: data_descriptor.to_string(),
            data_value,
        }
    }
}

// The token value stands in for card credentials; keep it out of debug
// output so `{:?}` on surrounding structs cannot leak it into logs.
impl fmt::Debug for OpaqueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaqueToken::Descriptor {
                data_descriptor, ..
            } => f
                .debug_struct("OpaqueToken")
                .field("data_descriptor", data_descriptor)
                .field("data_value", &"<redacted>")
                .finish(),
            OpaqueToken::Raw(_) => f.debug_tuple("OpaqueToken").field(&"<redacted>").finish(),
        }
    }
}

/// Buyer contact record sent with a charge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Billing address record sent with a charge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddress {
    pub street: String,
    pub unit: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub phone: String,
}

/// Body for `POST /transact` and `POST /card/authorize`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactPayload {
    pub currency: String,
    /// Decimal amount serialized as a string, e.g. "19.90"
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub opaque_data: OpaqueToken,
    pub customer: Customer,
    pub billing_address: BillingAddress,
    pub order_id: String,
}

impl TransactPayload {
    pub fn fiat(
        currency: String,
        amount: Decimal,
        opaque_data: OpaqueToken,
        customer: Customer,
        billing_address: BillingAddress,
        order_id: String,
    ) -> Self {
        Self {
            currency,
            amount: amount.to_string(),
            kind: "fiat".to_string(),
            opaque_data,
            customer,
            billing_address,
            order_id,
        }
    }
}

/// Response envelope for `transact` / `authorize`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactResponse {
    pub result: Option<TransactResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactResult {
    /// Processor transaction id; required for capture/refund/void later
    pub order_id: Option<String>,
    /// Human-readable id shown in the processor dashboard
    pub order_display_id: Option<String>,
}

/// Customer record for subscription creation. The processor splits the name
/// here, unlike the charge payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriptionCustomer {
    pub email: String,
    pub name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub phone: String,
}

/// Body for `POST /subscription`.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPayload {
    pub variant_id: String,
    #[serde(rename = "opaqueData")]
    pub opaque_data: OpaqueToken,
    pub customer: SubscriptionCustomer,
    pub address: BillingAddress,
}

/// Response for `POST /subscription`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResponse {
    pub id: Option<String>,
}
