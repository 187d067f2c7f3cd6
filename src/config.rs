use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BACKEND: &str = "memory";
const DEFAULT_WEBSITE_URL: &str = "http://localhost:5173";
const DEFAULT_NOTIFICATION_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_CLIENT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Prefix used by every credential placeholder shipped in the defaults.
pub const PLACEHOLDER_PREFIX: &str = "YOUR_";

/// Pricing rules applied at submission time.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default)]
pub struct PricingConfig {
    /// Flat delivery fee added to every order
    #[validate(custom = "validate_delivery_fee")]
    pub delivery_fee: Decimal,

    /// Tax rate applied to the subtotal (0.08 = 8%)
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: Decimal,

    /// ISO currency code sent to the payment gateway
    #[validate(length(equal = 3))]
    pub currency: String,

    /// Label used in summaries and customer messages
    pub currency_label: String,

    /// Order number prefix (`ORD` -> `ORD-<millis>`)
    #[validate(length(min = 1))]
    pub order_number_prefix: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_fee: dec!(4.99),
            tax_rate: dec!(0.08),
            currency: "PHP".to_string(),
            currency_label: "Php".to_string(),
            order_number_prefix: "ORD".to_string(),
        }
    }
}

/// PayMongo-style payment gateway settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PaymongoConfig {
    pub secret_key: String,
    pub api_base: String,
    /// When set, inbound webhooks must carry a valid `Paymongo-Signature`
    pub webhook_secret: Option<String>,
    pub webhook_tolerance_secs: u64,
}

impl Default for PaymongoConfig {
    fn default() -> Self {
        Self {
            secret_key: "sk_test_YOUR_SECRET_KEY_HERE".to_string(),
            api_base: "https://api.paymongo.com/v1".to_string(),
            webhook_secret: None,
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
        }
    }
}

impl PaymongoConfig {
    /// The webhook secret, unless blank or still a shipped placeholder.
    pub fn configured_webhook_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty() && !secret.contains(PLACEHOLDER_PREFIX))
    }
}

/// Semaphore-style SMS settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub enabled: bool,
    pub api_key: String,
    pub sender_name: String,
    pub api_base: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: "YOUR_SEMAPHORE_API_KEY_HERE".to_string(),
            sender_name: "Kuchefnero".to_string(),
            api_base: "https://api.semaphore.co/api/v4".to_string(),
        }
    }
}

impl SmsConfig {
    /// Real keys are long; short values and shipped placeholders are treated as unset.
    pub fn has_api_key(&self) -> bool {
        let key = self.api_key.trim();
        key.len() >= 20 && !key.starts_with(PLACEHOLDER_PREFIX)
    }
}

/// OneSignal-style push settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub enabled: bool,
    pub app_id: String,
    pub rest_api_key: String,
    pub api_base: String,
    pub icon_url: Option<String>,
    pub launch_url: Option<String>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_id: "YOUR_ONESIGNAL_APP_ID_HERE".to_string(),
            rest_api_key: "YOUR_ONESIGNAL_REST_API_KEY_HERE".to_string(),
            api_base: "https://onesignal.com/api/v1".to_string(),
            icon_url: None,
            launch_url: None,
        }
    }
}

impl PushConfig {
    pub fn has_app_id(&self) -> bool {
        let app_id = self.app_id.trim();
        !app_id.is_empty() && !app_id.starts_with(PLACEHOLDER_PREFIX)
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Order store backend: "memory" (sheet rows) or "database" (sea-orm)
    #[serde(default = "default_store_backend")]
    #[validate(custom = "validate_store_backend")]
    pub store_backend: String,

    /// Database connection URL, used by the "database" store backend
    pub database_url: String,

    /// Optional JSON snapshot of the products sheet
    #[serde(default)]
    pub catalog_snapshot_path: Option<String>,

    /// Public storefront URL used for payment redirects
    #[serde(default = "default_website_url")]
    #[validate(url)]
    pub website_url: String,

    /// Upper bound for the notification fan-out after submission
    #[serde(default = "default_notification_timeout_secs")]
    #[validate(range(min = 1))]
    pub notification_timeout_secs: u64,

    /// Per-request timeout for outbound vendor calls
    #[serde(default = "default_http_client_timeout_secs")]
    #[validate(range(min = 1))]
    pub http_client_timeout_secs: u64,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default)]
    #[validate]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub paymongo: PaymongoConfig,

    #[serde(default)]
    pub sms: SmsConfig,

    #[serde(default)]
    pub push: PushConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            store_backend: default_store_backend(),
            database_url: "sqlite://orders.db?mode=rwc".to_string(),
            catalog_snapshot_path: None,
            website_url: default_website_url(),
            notification_timeout_secs: DEFAULT_NOTIFICATION_TIMEOUT_SECS,
            http_client_timeout_secs: DEFAULT_HTTP_CLIENT_TIMEOUT_SECS,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            pricing: PricingConfig::default(),
            paymongo: PaymongoConfig::default(),
            sms: SmsConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn uses_database_store(&self) -> bool {
        self.store_backend.eq_ignore_ascii_case("database")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }

    pub fn http_client_timeout(&self) -> Duration {
        Duration::from_secs(self.http_client_timeout_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.is_production() && self.paymongo.configured_webhook_secret().is_none() {
            // Unsigned webhooks are accepted but worth flagging loudly.
            tracing::warn!("paymongo.webhook_secret is not set; webhook signatures will not be verified");
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_store_backend() -> String {
    DEFAULT_STORE_BACKEND.to_string()
}

fn default_website_url() -> String {
    DEFAULT_WEBSITE_URL.to_string()
}

fn default_notification_timeout_secs() -> u64 {
    DEFAULT_NOTIFICATION_TIMEOUT_SECS
}

fn default_http_client_timeout_secs() -> u64 {
    DEFAULT_HTTP_CLIENT_TIMEOUT_SECS
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

fn validate_store_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "memory" | "database" => Ok(()),
        _ => {
            let mut err = ValidationError::new("store_backend");
            err.message = Some("Must be one of: memory, database".into());
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

fn validate_delivery_fee(fee: &Decimal) -> Result<(), ValidationError> {
    if fee.is_sign_negative() {
        let mut err = ValidationError::new("delivery_fee");
        err.message = Some("delivery_fee must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("restaurant_orders={},tower_http=debug", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_directive));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
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

    load_config_from(Path::new(CONFIG_DIR), &run_env, true)
}

/// Loads configuration from an explicit directory. `with_env` controls whether
/// `APP__*` variables are layered on top.
pub fn load_config_from(
    config_dir: &Path,
    run_env: &str,
    with_env: bool,
) -> Result<AppConfig, AppConfigError> {
    let dir = config_dir.to_string_lossy();
    let mut builder = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("store_backend", DEFAULT_STORE_BACKEND)?
        .set_default("database_url", "sqlite://orders.db?mode=rwc")?
        .add_source(File::with_name(&format!("{}/default", dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", dir, run_env)).required(false));

    if with_env {
        builder = builder.add_source(Environment::with_prefix("APP").separator("__"));
    }

    let app_config: AppConfig = builder.build()?.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
