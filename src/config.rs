use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::locale::Locale;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DATA_BACKEND: &str = "rest";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HERO_AUTOPLAY_MS: u64 = 5000;
const DEFAULT_HERO_PAUSE_MS: u64 = 5000;

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

    /// Base URL of the hosted table/auth API (e.g. `https://xyz.supabase.co`)
    #[serde(default)]
    #[validate(url)]
    pub backend_url: Option<String>,

    /// Public (anon) key sent as `apikey` on every request
    #[serde(default)]
    pub backend_anon_key: Option<String>,

    /// Service-role key used as the bearer for table calls when present
    #[serde(default)]
    pub backend_service_key: Option<String>,

    /// Per-request timeout for backend calls
    #[serde(default = "default_backend_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub backend_timeout_secs: u64,

    /// Non-default schema exposed by the table API
    #[serde(default)]
    pub backend_schema: Option<String>,

    /// Data backend selection ("rest" or "memory")
    #[serde(default = "default_data_backend")]
    #[validate(custom = "validate_data_backend")]
    pub data_backend: String,

    /// JSON fixture loaded into the memory backend at startup
    #[serde(default)]
    pub seed_file: Option<String>,

    /// Locale used when a request names none
    #[serde(default)]
    pub default_locale: Locale,

    /// Require a bearer token on the CMS routes
    #[serde(default)]
    pub require_admin_auth: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// Hero carousel: autoplay step
    #[serde(default = "default_hero_autoplay_interval_ms")]
    #[validate(range(min = 500))]
    pub hero_autoplay_interval_ms: u64,

    /// Hero carousel: autoplay pause after manual navigation
    #[serde(default = "default_hero_pause_after_interaction_ms")]
    pub hero_pause_after_interaction_ms: u64,

    /// Maximum request body size in bytes (default 2MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl AppConfig {
    /// Development configuration with the memory backend selected.
    pub fn new(host: String, port: u16, environment: String) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            backend_url: None,
            backend_anon_key: None,
            backend_service_key: None,
            backend_timeout_secs: default_backend_timeout_secs(),
            backend_schema: None,
            data_backend: "memory".to_string(),
            seed_file: None,
            default_locale: Locale::default(),
            require_admin_auth: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            hero_autoplay_interval_ms: default_hero_autoplay_interval_ms(),
            hero_pause_after_interaction_ms: default_hero_pause_after_interaction_ms(),
            max_body_size: default_max_body_size(),
        }
    }

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

    /// True when the REST backend has what it needs to connect.
    pub fn has_backend_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_ref().map_or(false, |s| !s.trim().is_empty());
        present(&self.backend_url) && present(&self.backend_anon_key)
    }

    pub fn hero_autoplay_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.hero_autoplay_interval_ms)
    }

    pub fn hero_pause_after_interaction(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.hero_pause_after_interaction_ms)
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

        if self.is_production() && !self.require_admin_auth {
            let mut err = ValidationError::new("require_admin_auth");
            err.message =
                Some("CMS routes must require authentication in production (APP__REQUIRE_ADMIN_AUTH=true)".into());
            errors.add("require_admin_auth", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
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

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_backend() -> String {
    DEFAULT_DATA_BACKEND.to_string()
}

fn default_backend_timeout_secs() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

fn default_hero_autoplay_interval_ms() -> u64 {
    DEFAULT_HERO_AUTOPLAY_MS
}

fn default_hero_pause_after_interaction_ms() -> u64 {
    DEFAULT_HERO_PAUSE_MS
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn validate_data_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "rest" | "memory" => Ok(()),
        _ => {
            let mut err = ValidationError::new("data_backend");
            err.message = Some("Must be one of: rest, memory".into());
            Err(err)
        }
    }
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

    let default_directive = format!("storefront_cms={},tower_http=debug", level);
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

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("data_backend", DEFAULT_DATA_BACKEND)?
        .set_default("default_locale", "en")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
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

    if app_config.data_backend.eq_ignore_ascii_case("rest") && !app_config.has_backend_credentials() {
        warn!("Backend URL or anon key missing; the service will start with an unconfigured data backend");
    }

    info!("Configuration loaded successfully");
    Ok(app_config)
}
