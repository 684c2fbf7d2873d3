use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::{config::ApplePayConfig, errors::GatewayError};

/// Server-side merchant validation as the wallet adapters consume it.
#[async_trait]
pub trait MerchantValidator: Send + Sync {
    /// Exchange the wallet-supplied validation URL for a signed session.
    async fn validate(&self, validation_url: &str) -> Result<Value, GatewayError>;
}

/// Payload posted to the wallet-supplied validation URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MerchantValidationRequest<'a> {
    merchant_identifier: &'a str,
    domain_name: &'a str,
    display_name: &'a str,
}

/// Signs wallet domain-validation requests with the merchant's TLS
/// credentials and relays the result back to the browser. Wallet APIs
/// require the server-held private key, so this must never run client-side;
/// the key never leaves this process.
pub struct MerchantValidationRelay {
    config: ApplePayConfig,
    timeout: Duration,
}

impl MerchantValidationRelay {
    pub fn new(config: ApplePayConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Whether enough credentials are present to attempt validation.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Build a client holding the merchant identity certificate and key.
    /// Read per call so rotated credentials are picked up without restart.
    async fn build_mtls_client(&self) -> Result<reqwest::Client, GatewayError> {
        let cert_path = self.config.cert_path.as_deref().unwrap_or_default();
        let key_path = self.config.key_path.as_deref().unwrap_or_default();

        let cert = tokio::fs::read(cert_path).await.map_err(|e| {
            GatewayError::Configuration(format!(
                "cannot read merchant certificate {cert_path:?}: {e}"
            ))
        })?;
        let key = tokio::fs::read(key_path).await.map_err(|e| {
            GatewayError::Configuration(format!("cannot read merchant key {key_path:?}: {e}"))
        })?;

        let mut identity_pem = cert;
        identity_pem.push(b'\n');
        identity_pem.extend_from_slice(&key);

        let identity = reqwest::Identity::from_pem(&identity_pem).map_err(|e| {
            GatewayError::Configuration(format!("invalid merchant identity material: {e}"))
        })?;

        reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(self.timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build mTLS client: {e}")))
    }
}

#[async_trait]
impl MerchantValidator for MerchantValidationRelay {
    /// POST the merchant identity to `validation_url` over mutual TLS and
    /// return the signed session object for the wallet UI.
    #[instrument(skip(self))]
    async fn validate(&self, validation_url: &str) -> Result<Value, GatewayError> {
        if !self.config.is_configured() {
            return Err(GatewayError::Configuration(
                "Apple Pay merchant credentials are not fully configured in the gateway settings"
                    .to_string(),
            ));
        }

        if self
            .config
            .key_passphrase
            .as_deref()
            .is_some_and(|p| !p.is_empty())
        {
            return Err(GatewayError::Configuration(
                "passphrase-protected merchant keys are not supported; install an unencrypted PEM key"
                    .to_string(),
            ));
        }

        let url: url::Url = validation_url.parse().map_err(|_| {
            GatewayError::Validation("merchant validation URL is not a valid URL".to_string())
        })?;
        if url.scheme() != "https" {
            return Err(GatewayError::Validation(
                "merchant validation URL must use https".to_string(),
            ));
        }

        let merchant_id = self.config.merchant_id.as_deref().unwrap_or_default();
        let domain = self.config.merchant_domain.as_deref().unwrap_or_default();
        let display_name = self.config.merchant_name.as_deref().unwrap_or_default();

        let payload = MerchantValidationRequest {
            merchant_identifier: merchant_id,
            domain_name: domain,
            display_name,
        };

        let client = self.build_mtls_client().await?;

        info!(domain, "validating Apple Pay merchant");

        let response = client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!(status = status.as_u16(), response = %body, "merchant validation failed");
            return Err(GatewayError::ValidationRejected(format!(
                "wallet servers answered with status {}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&body).map_err(|_| {
            error!(response = %body, "merchant validation returned non-JSON body");
            GatewayError::ValidationRejected("wallet servers returned a non-JSON body".to_string())
        })
    }
}
