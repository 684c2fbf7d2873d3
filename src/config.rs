use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_ENDPOINT: &str = "https://api.chargx.io";
const DEFAULT_ADMIN_ENDPOINT: &str = "https://api.chargx.io/admin";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How settled card charges are captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Authorize and capture in one call (sale).
    Capture,
    /// Authorize only; capture happens later via the admin operations.
    Authorize,
}

impl Default for CaptureMode {
    fn default() -> Self {
        CaptureMode::Capture
    }
}

/// Apple Pay merchant credentials held server-side for the validation relay.
/// The private key never leaves the server.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ApplePayConfig {
    /// Apple Pay Merchant ID from the Apple Developer account
    #[serde(default)]
    pub merchant_id: Option<String>,

    /// Name shown in the Apple Pay sheet
    #[serde(default)]
    pub merchant_name: Option<String>,

    /// Fully qualified domain registered for Apple Pay
    #[serde(default)]
    pub merchant_domain: Option<String>,

    /// Absolute path to the merchant identity certificate (PEM)
    #[serde(default)]
    pub cert_path: Option<String>,

    /// Absolute path to the merchant private key (PEM)
    #[serde(default)]
    pub key_path: Option<String>,

    /// Passphrase for the private key, if set
    #[serde(default)]
    pub key_passphrase: Option<String>,
}

impl ApplePayConfig {
    /// True when enough is configured to attempt merchant validation.
    pub fn is_configured(&self) -> bool {
        self.merchant_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.cert_path.as_deref().is_some_and(|s| !s.is_empty())
            && self.key_path.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Gateway configuration with live/test credential pairs. Immutable within a
/// request; the test-mode flag selects which pair is used.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GatewayConfig {
    /// ChargX public API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// ChargX admin API base URL
    #[serde(default = "default_admin_endpoint")]
    pub admin_endpoint: String,

    /// Live publishable API key (pk_...)
    #[serde(default)]
    pub publishable_key: String,

    /// Live secret API key (sk_..., admin API)
    #[serde(default)]
    pub secret_key: String,

    /// Test publishable API key for the sandbox store
    #[serde(default)]
    pub test_publishable_key: String,

    /// Test secret API key for the sandbox admin API
    #[serde(default)]
    pub test_secret_key: String,

    /// Use the sandbox store and test keys
    #[serde(default)]
    pub testmode: bool,

    /// Capture immediately or authorize only
    #[serde(default)]
    pub capture_mode: CaptureMode,

    /// Timeout for processor and wallet-validation calls, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Apple Pay merchant credentials
    #[serde(default)]
    #[validate]
    pub apple_pay: ApplePayConfig,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

impl GatewayConfig {
    /// Publishable key for the active mode. Empty when not configured.
    pub fn active_publishable_key(&self) -> &str {
        if self.testmode {
            &self.test_publishable_key
        } else {
            &self.publishable_key
        }
    }

    /// Secret key for the active mode, when configured.
    pub fn active_secret_key(&self) -> Option<&str> {
        let key = if self.testmode {
            &self.test_secret_key
        } else {
            &self.secret_key
        };
        if key.trim().is_empty() {
            None
        } else {
            Some(key)
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            admin_endpoint: default_admin_endpoint(),
            publishable_key: String::new(),
            secret_key: String::new(),
            test_publishable_key: String::new(),
            test_secret_key: String::new(),
            testmode: true,
            capture_mode: CaptureMode::default(),
            request_timeout_secs: default_request_timeout_secs(),
            apple_pay: ApplePayConfig::default(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum GatewayConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_admin_endpoint() -> String {
    DEFAULT_ADMIN_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("chargx_gateway={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads gateway configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<GatewayConfig, GatewayConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("endpoint", DEFAULT_ENDPOINT)?
        .set_default("admin_endpoint", DEFAULT_ADMIN_ENDPOINT)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("testmode", true)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let gateway_config: GatewayConfig = config.try_deserialize()?;

    gateway_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        GatewayConfigError::Validation(e)
    })?;

    if !gateway_config.testmode && gateway_config.publishable_key.trim().is_empty() {
        error!(
            "Live mode is enabled but no live publishable key is configured; \
             card tokenization will fail until APP__PUBLISHABLE_KEY is set"
        );
    }

    info!("Configuration loaded successfully");
    Ok(gateway_config)
}
