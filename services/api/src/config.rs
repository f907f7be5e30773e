//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Missing CRM credentials or custom-field
//! ids fail the process here rather than surfacing as 500s per request.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The ids of the GoHighLevel custom fields this application reads and
/// writes on CRM contact records.
#[derive(Clone, Debug)]
pub struct CrmFieldIds {
    pub password: String,
    pub quota: String,
    pub used: String,
    pub plan: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub gemini_api_key: String,
    pub ghl_api_key: String,
    pub ghl_base_url: String,
    pub crm_fields: CrmFieldIds,
    pub image_model: String,
    pub text_model: String,
    pub imagen_model: String,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load External Service Credentials ---
        let gemini_api_key = required("GEMINI_API_KEY")?;
        let ghl_api_key = required("GHL_API_KEY")?;
        let ghl_base_url = std::env::var("GHL_BASE_URL")
            .unwrap_or_else(|_| "https://rest.gohighlevel.com/v1".to_string());

        let crm_fields = CrmFieldIds {
            password: required("GHL_PASSWORD_FIELD_ID")?,
            quota: required("GHL_QUOTA_FIELD_ID")?,
            used: required("GHL_USED_FIELD_ID")?,
            plan: required("GHL_PLAN_FIELD_ID")?,
        };

        // --- Load Model Settings ---
        let image_model = std::env::var("IMAGE_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash-image-preview".to_string());
        let text_model =
            std::env::var("TEXT_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        let imagen_model = std::env::var("IMAGEN_MODEL")
            .unwrap_or_else(|_| "imagen-3.0-generate-002".to_string());

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            ghl_api_key,
            ghl_base_url,
            crm_fields,
            image_model,
            text_model,
            imagen_model,
        })
    }
}
