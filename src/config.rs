use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use url::Url;
use validator::{Validate, ValidationError};

use crate::services::checkout::totals::PricingPolicy;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_CALLBACK_PATH: &str = "/payment/callback";
const DEFAULT_ADMIN_REDIRECT_DELAY_MS: u64 = 1000;
const DEFAULT_PAYMENT_REDIRECT_DELAY_MS: u64 = 2000;
const DEFAULT_CURRENCY: &str = "GHS";
const CONFIG_DIR: &str = "config";

/// Checkout pricing rules applied client-side
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Subtotals strictly above this amount ship for free
    #[serde(default = "default_free_shipping_threshold")]
    #[validate(custom = "validate_non_negative")]
    pub free_shipping_threshold: Decimal,

    /// Flat shipping fee charged at or below the threshold
    #[serde(default = "default_flat_shipping_fee")]
    #[validate(custom = "validate_non_negative")]
    pub flat_shipping_fee: Decimal,

    /// Tax rate applied to subtotal + shipping (as decimal, e.g. 0.125 for 12.5%)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: Decimal,

    /// Currency code shown next to amounts
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            flat_shipping_fee: default_flat_shipping_fee(),
            tax_rate: default_tax_rate(),
            currency: default_currency(),
        }
    }
}

impl PricingConfig {
    pub fn policy(&self) -> PricingPolicy {
        PricingPolicy {
            free_shipping_threshold: self.free_shipping_threshold,
            flat_shipping_fee: self.flat_shipping_fee,
            tax_rate: self.tax_rate,
            currency: self.currency.clone(),
        }
    }
}

/// Client configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the shop backend API
    #[serde(default = "default_api_base_url")]
    #[validate(custom = "validate_base_url")]
    pub api_base_url: String,

    /// Origin the payment gateway sends the shopper back to; follows
    /// `api_base_url` when unset
    #[serde(default)]
    #[validate(custom = "validate_base_url")]
    pub storefront_origin: String,

    /// Path of the payment callback page on the storefront origin
    #[serde(default = "default_callback_path")]
    pub payment_callback_path: String,

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

    /// Request timeout in seconds; unset leaves the HTTP client default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// File backing the token store (CLI only)
    #[serde(default)]
    pub token_store_path: Option<String>,

    /// Delay before an admin is sent to the dashboard after login
    #[serde(default = "default_admin_redirect_delay_ms")]
    pub admin_redirect_delay_ms: u64,

    /// Delay before a verified payment sends the shopper to their orders
    #[serde(default = "default_payment_redirect_delay_ms")]
    pub payment_success_redirect_delay_ms: u64,

    /// Keep the stored token when the current-user fetch fails for reasons
    /// other than 401/403
    #[serde(default)]
    pub keep_token_on_transient_failure: bool,

    /// Checkout pricing
    #[serde(default)]
    #[validate]
    pub pricing: PricingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            storefront_origin: default_api_base_url(),
            payment_callback_path: default_callback_path(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            request_timeout_secs: None,
            token_store_path: None,
            admin_redirect_delay_ms: default_admin_redirect_delay_ms(),
            payment_success_redirect_delay_ms: default_payment_redirect_delay_ms(),
            keep_token_on_transient_failure: false,
            pricing: PricingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration pointing at the given backend with every other
    /// value defaulted
    pub fn for_backend(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into();
        Self {
            storefront_origin: api_base_url.clone(),
            api_base_url,
            ..Default::default()
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn admin_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.admin_redirect_delay_ms)
    }

    pub fn payment_success_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.payment_success_redirect_delay_ms)
    }

    /// Absolute URL handed to the payment gateway as `callback_url`
    pub fn payment_callback_url(&self) -> String {
        format!(
            "{}{}",
            self.storefront_origin.trim_end_matches('/'),
            self.payment_callback_path
        )
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_callback_path() -> String {
    DEFAULT_CALLBACK_PATH.to_string()
}

fn default_admin_redirect_delay_ms() -> u64 {
    DEFAULT_ADMIN_REDIRECT_DELAY_MS
}

fn default_payment_redirect_delay_ms() -> u64 {
    DEFAULT_PAYMENT_REDIRECT_DELAY_MS
}

fn default_free_shipping_threshold() -> Decimal {
    dec!(1000)
}

fn default_flat_shipping_fee() -> Decimal {
    dec!(50)
}

fn default_tax_rate() -> Decimal {
    dec!(0.125) // 12.5% VAT
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
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

fn validate_base_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("base_url");
            err.message = Some("Must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("tax_rate must be between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        let mut err = ValidationError::new("amount");
        err.message = Some("amount must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_client={},storefront_cli={}", level, level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);

    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads client configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (STOREFRONT__*)
pub fn load_config() -> Result<ClientConfig, ClientConfigError> {
    let run_env = env::var("STOREFRONT_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("STOREFRONT").separator("__"))
        .build()?;

    resolve_config(config)
}

/// Deserializes a built `Config`, fills derived defaults and validates.
fn resolve_config(config: Config) -> Result<ClientConfig, ClientConfigError> {
    let mut client_config: ClientConfig = config.try_deserialize()?;
    if client_config.storefront_origin.trim().is_empty() {
        client_config.storefront_origin = client_config.api_base_url.clone();
    }

    client_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        ClientConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(client_config)
}
