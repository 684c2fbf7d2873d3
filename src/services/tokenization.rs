use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    errors::GatewayError,
    processor::{
        client::ProcessorClient,
        types::{
            OpaqueToken, CARD_CODE_PLACEHOLDER, CARD_NUMBER_PLACEHOLDER,
            EXPIRATION_DATE_PLACEHOLDER,
        },
    },
};

/// Raw card input as typed by the buyer.
#[derive(Clone, Default)]
pub struct CardFields {
    pub number: String,
    /// `MM/YY` or `MM/YYYY`
    pub expiry: String,
    pub cvc: String,
}

// Card fields must never reach a log line, so `{:?}` shows nothing useful.
impl std::fmt::Debug for CardFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardFields")
            .field("number", &"<redacted>")
            .field("expiry", &"<redacted>")
            .field("cvc", &"<redacted>")
            .finish()
    }
}

/// Card fields after local validation, ready for template substitution.
#[derive(Debug)]
struct ValidatedCard {
    number: String,
    /// `MMYY`
    expiration_date: String,
    cvc: String,
}

/// Exchanges raw card input for a processor-issued opaque token in two
/// round trips: `GET /pretransact` for the token-request descriptor, then a
/// POST of the substituted template to the descriptor's URL. Card data goes
/// to that URL and nowhere else.
pub struct TokenizationEngine {
    client: Arc<ProcessorClient>,
    http: reqwest::Client,
}

impl TokenizationEngine {
    pub fn new(client: Arc<ProcessorClient>, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, http })
    }

    /// Tokenize card input. The descriptor is fetched fresh for every
    /// attempt; it is single-use and never cached.
    #[instrument(skip(self, fields))]
    pub async fn tokenize_card(&self, fields: &CardFields) -> Result<OpaqueToken, GatewayError> {
        if self.client.publishable_key().is_empty() {
            return Err(GatewayError::Configuration(
                "ChargX publishable API key is not configured".to_string(),
            ));
        }

        let descriptor = self.client.pretransact().await.map_err(|e| match e {
            GatewayError::Transport(msg) | GatewayError::ProcessorUnavailable(msg) => {
                GatewayError::ProcessorUnavailable(msg)
            }
            GatewayError::Processor { status, message, .. } => GatewayError::ProcessorUnavailable(
                format!("pretransact failed with status {status}: {message}"),
            ),
            other => other,
        })?;

        let token_url = descriptor
            .card_token_request_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::ProcessorUnavailable(
                    "pretransact response is missing cardTokenRequestUrl".to_string(),
                )
            })?;
        let token_params = descriptor.card_token_request_params.ok_or_else(|| {
            GatewayError::ProcessorUnavailable(
                "pretransact response is missing cardTokenRequestParams".to_string(),
            )
        })?;

        let card = validate_card_fields(fields)?;
        let body = substitute_card_placeholders(&token_params, &card)?;

        info!(token_url = %token_url, "requesting card token");

        let response = self
            .http
            .post(&token_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "token request rejected");
            return Err(GatewayError::Tokenization(format!(
                "token request failed with status {}",
                status.as_u16()
            )));
        }

        extract_token(&text)
    }
}

/// Validate card fields locally, yielding a distinct error per failing
/// category so the buyer knows what to fix.
fn validate_card_fields(fields: &CardFields) -> Result<ValidatedCard, GatewayError> {
    let number: String = fields.number.chars().filter(|c| !c.is_whitespace()).collect();
    if number.is_empty() {
        return Err(GatewayError::Validation(
            "Card number is required".to_string(),
        ));
    }
    if !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::Validation(
            "Card number must contain only digits".to_string(),
        ));
    }

    let expiry: String = fields.expiry.chars().filter(|c| !c.is_whitespace()).collect();
    if expiry.is_empty() {
        return Err(GatewayError::Validation(
            "Card expiry is required".to_string(),
        ));
    }
    let (month, year) = parse_expiry(&expiry)?;

    let cvc = fields.cvc.trim();
    if cvc.is_empty() {
        return Err(GatewayError::Validation(
            "Card security code is required".to_string(),
        ));
    }
    if !cvc.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::Validation(
            "Card security code must contain only digits".to_string(),
        ));
    }

    Ok(ValidatedCard {
        number,
        expiration_date: format!("{:02}{:02}", month, year % 100),
        cvc: cvc.to_string(),
    })
}

/// Parse `MM/YY` or `MM/YYYY` into a month and a 4-digit year.
///
/// Two-digit years expand with the current century: `YY` becomes
/// `current_century * 100 + YY`. This is a simple heuristic, not
/// calendar-accurate near century boundaries ("00" in 2090 still resolves
/// to 2000).
pub(crate) fn parse_expiry(expiry: &str) -> Result<(u32, u32), GatewayError> {
    let invalid =
        || GatewayError::Validation("Card expiry must be in MM/YY or MM/YYYY format".to_string());

    let (month_part, year_part) = expiry.split_once('/').ok_or_else(invalid)?;
    if year_part.contains('/') {
        return Err(invalid());
    }

    let month: u32 = month_part.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }

    let year = match year_part.len() {
        2 => {
            let yy: u32 = year_part.parse().map_err(|_| invalid())?;
            let century = (Utc::now().year() as u32 / 100) * 100;
            century + yy
        }
        4 => year_part.parse().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    Ok((month, year))
}

/// Serialize the params template and substitute the card placeholders with
/// the literal values.
fn substitute_card_placeholders(
    template: &Value,
    card: &ValidatedCard,
) -> Result<String, GatewayError> {
    let serialized = serde_json::to_string(template)?;
    Ok(serialized
        .replace(CARD_NUMBER_PLACEHOLDER, &card.number)
        .replace(EXPIRATION_DATE_PLACEHOLDER, &card.expiration_date)
        .replace(CARD_CODE_PLACEHOLDER, &card.cvc))
}

/// Pull the opaque token out of the token-endpoint response: `opaqueData`
/// first, then `token`.
fn extract_token(body: &str) -> Result<OpaqueToken, GatewayError> {
    let value: Value = serde_json::from_str(body).map_err(|_| {
        GatewayError::Tokenization("non-JSON response from token endpoint".to_string())
    })?;

    if let Some(opaque) = value.get("opaqueData") {
        if !opaque.is_null() {
            return serde_json::from_value(opaque.clone()).map_err(|_| {
                GatewayError::Tokenization(
                    "invalid card tokenization response from processor".to_string(),
                )
            });
        }
    }

    if let Some(token) = value.get("token").and_then(|t| t.as_str()) {
        return Ok(OpaqueToken::Raw(token.to_string()));
    }

    Err(GatewayError::Tokenization(
        "invalid card tokenization response from processor".to_string(),
    ))
}
