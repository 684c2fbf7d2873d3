use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, instrument};
use url::Url;

use crate::{
    config::GatewayConfig,
    errors::GatewayError,
    processor::types::{
        PretransactDescriptor, SubscriptionPayload, SubscriptionResponse, TransactPayload,
        TransactResponse,
    },
};

const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

/// Client for the ChargX API. One method per endpoint; every call is a
/// single bounded round trip. Non-2xx responses and transport failures come
/// back as typed errors carrying status and raw body. Retries are a caller
/// decision: retrying a charge risks duplication.
pub struct ProcessorClient {
    http: reqwest::Client,
    endpoint: Url,
    admin_endpoint: Url,
    publishable_key: String,
    secret_key: Option<String>,
}

impl ProcessorClient {
    pub fn new(
        endpoint: &str,
        admin_endpoint: &str,
        publishable_key: &str,
        secret_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: parse_base_url(endpoint)?,
            admin_endpoint: parse_base_url(admin_endpoint)?,
            publishable_key: publishable_key.trim().to_string(),
            secret_key: secret_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        })
    }

    /// Build a client from gateway configuration, using the key pair the
    /// test-mode flag selects.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(
            &config.endpoint,
            &config.admin_endpoint,
            config.active_publishable_key(),
            config.active_secret_key(),
            config.request_timeout(),
        )
    }

    pub fn publishable_key(&self) -> &str {
        &self.publishable_key
    }

    /// Retrieve the short-lived token-request descriptor.
    ///
    /// `GET /pretransact`
    #[instrument(skip(self))]
    pub async fn pretransact(&self) -> Result<PretransactDescriptor, GatewayError> {
        let value = self.get("pretransact").await?;
        serde_json::from_value(value)
            .map_err(|e| GatewayError::ProcessorUnavailable(format!("bad pretransact body: {e}")))
    }

    /// Charge (authorize + capture in one call).
    ///
    /// `POST /transact`
    #[instrument(skip(self, payload), fields(order_id = %payload.order_id))]
    pub async fn transact(&self, payload: &TransactPayload) -> Result<TransactResponse, GatewayError> {
        let value = self.post("transact", payload).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Authorize only; capture happens later.
    ///
    /// `POST /card/authorize`
    #[instrument(skip(self, payload), fields(order_id = %payload.order_id))]
    pub async fn authorize(
        &self,
        payload: &TransactPayload,
    ) -> Result<TransactResponse, GatewayError> {
        let value = self.post("card/authorize", payload).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Capture a previously authorized transaction.
    ///
    /// `POST /transaction/capture`
    #[instrument(skip(self))]
    pub async fn capture(&self, order_id: &str) -> Result<Value, GatewayError> {
        self.post("transaction/capture", &order_id_body(order_id))
            .await
    }

    /// `POST /transaction/refund`
    #[instrument(skip(self))]
    pub async fn refund(&self, order_id: &str) -> Result<Value, GatewayError> {
        self.post("transaction/refund", &order_id_body(order_id))
            .await
    }

    /// `POST /transaction/void`
    #[instrument(skip(self))]
    pub async fn void(&self, order_id: &str) -> Result<Value, GatewayError> {
        self.post("transaction/void", &order_id_body(order_id)).await
    }

    /// Create a subscription for recurring payments.
    ///
    /// `POST /subscription`
    #[instrument(skip(self, payload), fields(variant_id = %payload.variant_id))]
    pub async fn create_subscription(
        &self,
        payload: &SubscriptionPayload,
    ) -> Result<SubscriptionResponse, GatewayError> {
        let value = self.post("subscription", payload).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `GET /subscription/{id}`
    #[instrument(skip(self))]
    pub async fn get_subscription(&self, id: &str) -> Result<Value, GatewayError> {
        self.get(&format!("subscription/{}", urlencode(id))).await
    }

    /// `DELETE /subscription/{id}`
    #[instrument(skip(self))]
    pub async fn delete_subscription(&self, id: &str) -> Result<Value, GatewayError> {
        self.delete(&format!("subscription/{}", urlencode(id))).await
    }

    /// Payout via the admin API. Requires the secret key.
    ///
    /// `POST /admin/payout`
    #[instrument(skip(self, payload))]
    pub async fn payout(&self, payload: &Value) -> Result<Value, GatewayError> {
        self.admin_post("payout", payload).await
    }

    async fn get(&self, path: &str) -> Result<Value, GatewayError> {
        let url = self.join(&self.endpoint, path)?;
        let response = self
            .http
            .get(url)
            .headers(self.public_headers())
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, GatewayError> {
        let url = self.join(&self.endpoint, path)?;
        let response = self
            .http
            .post(url)
            .headers(self.public_headers())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(response).await
    }

    async fn delete(&self, path: &str) -> Result<Value, GatewayError> {
        let url = self.join(&self.endpoint, path)?;
        let response = self
            .http
            .delete(url)
            .headers(self.public_headers())
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(response).await
    }

    async fn admin_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, GatewayError> {
        let secret = self.secret_key.as_deref().ok_or_else(|| {
            GatewayError::Configuration("ChargX secret key is missing".to_string())
        })?;

        let url = self.join(&self.admin_endpoint, path)?;
        let mut headers = json_headers();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {secret}"))
                .map_err(|_| GatewayError::Configuration("secret key is not a valid header value".to_string()))?,
        );

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(response).await
    }

    fn public_headers(&self) -> HeaderMap {
        let mut headers = json_headers();
        if let Ok(value) = HeaderValue::from_str(&self.publishable_key) {
            headers.insert(PUBLISHABLE_KEY_HEADER, value);
        }
        headers
    }

    fn join(&self, base: &Url, path: &str) -> Result<Url, GatewayError> {
        base.join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::Internal(format!("bad API path {path:?}: {e}")))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, GatewayError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|e| GatewayError::Configuration(format!("invalid API endpoint {raw:?}: {e}")))
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

fn order_id_body(order_id: &str) -> Value {
    serde_json::json!({ "orderId": order_id })
}

fn urlencode(raw: &str) -> String {
    // Percent-encode everything outside the unreserved set, enough for
    // subscription ids in a path segment.
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{:02X}", other),
        })
        .collect()
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Transport(format!("request timed out: {err}"))
    } else {
        GatewayError::Transport(err.to_string())
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let err = GatewayError::processor(status.as_u16(), body);
        if let GatewayError::Processor {
            status,
            body,
            message,
        } = &err
        {
            error!(%status, %message, response = %body, "ChargX API error");
        }
        return Err(err);
    }

    // Successful responses with a non-JSON body collapse to an empty
    // object; callers treat missing fields as contract failures.
    Ok(serde_json::from_str(&body).unwrap_or_else(|_| Value::Object(serde_json::Map::new())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> ProcessorClient {
        ProcessorClient::new(
            endpoint,
            &format!("{endpoint}/admin"),
            "pk_test_123",
            Some("sk_test_123"),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn base_url_normalization_keeps_path_joins_stable() {
        let c = client("https://api.chargx.io");
        let url = c.join(&c.endpoint, "transaction/refund").unwrap();
        assert_eq!(url.as_str(), "https://api.chargx.io/transaction/refund");

        let url = c.join(&c.endpoint, "/pretransact").unwrap();
        assert_eq!(url.as_str(), "https://api.chargx.io/pretransact");
    }

    #[test]
    fn subscription_ids_are_path_encoded() {
        assert_eq!(urlencode("sub_123"), "sub_123");
        assert_eq!(urlencode("sub/../x"), "sub%2F..%2Fx");
        assert_eq!(urlencode("a b"), "a%20b");
    }

    #[tokio::test]
    async fn admin_post_without_secret_key_is_a_config_error() {
        let c = ProcessorClient::new(
            "https://api.chargx.io",
            "https://api.chargx.io/admin",
            "pk_test_123",
            None,
            Duration::from_secs(30),
        )
        .unwrap();

        let err = c.payout(&serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }
}
