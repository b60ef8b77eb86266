use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::lpo::{CompanyProfile, CurrencyWords};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const CONFIG_DIR: &str = "config";
const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";

/// Content backend selection
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// "graphql" or "memory"
    #[serde(default = "default_backend_kind")]
    #[validate(custom = "validate_backend_kind")]
    pub kind: String,

    /// GraphQL endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token for the content API
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            endpoint: None,
            auth_token: None,
        }
    }
}

impl BackendConfig {
    pub fn is_graphql(&self) -> bool {
        self.kind.eq_ignore_ascii_case("graphql")
    }
}

/// Outbound email provider
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// "resend" or "log"
    #[serde(default = "default_email_provider")]
    #[validate(custom = "validate_email_provider")]
    pub provider: String,

    #[serde(default = "default_resend_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_email_from")]
    pub from: String,

    #[serde(default)]
    pub reply_to: Option<String>,

    /// Sign-off line of the approval notice
    #[serde(default = "default_email_signature")]
    pub signature: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: default_email_provider(),
            api_base: default_resend_api_base(),
            api_key: None,
            from: default_email_from(),
            reply_to: None,
            signature: default_email_signature(),
        }
    }
}

impl EmailConfig {
    pub fn is_resend(&self) -> bool {
        self.provider.eq_ignore_ascii_case("resend")
    }
}

/// Request number generation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NumberingConfig {
    /// "random" or "sequential"
    #[serde(default = "default_serial")]
    #[validate(custom = "validate_serial")]
    pub serial: String,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            serial: default_serial(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Abort an approval when the supplier notice cannot be delivered
    #[serde(default)]
    pub require_notification: bool,
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
    #[validate(length(min = 1))]
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

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// Timeout for outbound HTTP calls (content backend, email provider)
    #[serde(default = "default_http_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub http_timeout_secs: u64,

    #[serde(default)]
    #[validate]
    pub backend: BackendConfig,

    #[serde(default)]
    #[validate]
    pub email: EmailConfig,

    #[serde(default)]
    #[validate]
    pub numbering: NumberingConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Letterhead and signatory printed on purchase orders
    #[serde(default)]
    pub company: CompanyProfile,

    /// Unit names used when spelling out totals
    #[serde(default)]
    pub currency: CurrencyWords,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            backend: BackendConfig::default(),
            email: EmailConfig::default(),
            numbering: NumberingConfig::default(),
            lifecycle: LifecycleConfig::default(),
            company: CompanyProfile::default(),
            currency: CurrencyWords::default(),
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

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub(crate) fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.backend.is_graphql() {
            if is_blank(&self.backend.endpoint) {
                let mut err = ValidationError::new("backend_endpoint_required");
                err.message = Some("Set APP__BACKEND__ENDPOINT when backend.kind = graphql".into());
                errors.add("backend", err);
            }
            if is_blank(&self.backend.auth_token) {
                let mut err = ValidationError::new("backend_token_required");
                err.message =
                    Some("Set APP__BACKEND__AUTH_TOKEN when backend.kind = graphql".into());
                errors.add("backend", err);
            }
        }

        if self.email.is_resend() && is_blank(&self.email.api_key) {
            let mut err = ValidationError::new("email_api_key_required");
            err.message = Some("Set APP__EMAIL__API_KEY when email.provider = resend".into());
            errors.add("email", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
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

impl From<AppConfigError> for crate::errors::ServiceError {
    fn from(err: AppConfigError) -> Self {
        crate::errors::ServiceError::ValidationError(err.to_string())
    }
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_backend_kind() -> String {
    "memory".to_string()
}

fn default_email_provider() -> String {
    "log".to_string()
}

fn default_resend_api_base() -> String {
    DEFAULT_RESEND_API_BASE.to_string()
}

fn default_email_from() -> String {
    "Newell <purchase@newellmepco.com>".to_string()
}

fn default_email_signature() -> String {
    "Newell MEP Team".to_string()
}

fn default_serial() -> String {
    "random".to_string()
}

fn one_of(value: &str, allowed: &[&str], code: &'static str) -> Result<(), ValidationError> {
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        let mut err = ValidationError::new(code);
        err.message = Some(format!("Must be one of: {}", allowed.join(", ")).into());
        Err(err)
    }
}

fn validate_backend_kind(value: &str) -> Result<(), ValidationError> {
    one_of(value, &["graphql", "memory"], "backend_kind")
}

fn validate_email_provider(value: &str) -> Result<(), ValidationError> {
    one_of(value, &["resend", "log"], "email_provider")
}

fn validate_serial(value: &str) -> Result<(), ValidationError> {
    one_of(value, &["random", "sequential"], "numbering_serial")
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    one_of(level, &["trace", "debug", "info", "warn", "error"], "log_level")
}

pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("mrf_portal={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
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
    load_config_from(Path::new(CONFIG_DIR))
}

pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

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
