//! Environment-provided configuration.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Cerebras model used for the chat fallback.
pub const DEFAULT_MODEL: &str = "llama3.1-8b";

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// LINE channel secret — HMAC key for webhook signature validation.
    pub channel_secret: SecretString,
    /// LINE channel access token — bearer token for the reply API.
    pub channel_access_token: SecretString,
    /// Cerebras API key for the AI chat fallback.
    pub cerebras_api_key: SecretString,
    /// Cerebras model name.
    pub cerebras_model: String,
    /// Path of the local state database file.
    pub db_path: PathBuf,
    /// Port the HTTP server binds to.
    pub port: u16,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// The three credentials are required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("BOT_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BOT_PORT".to_string(),
                message: format!("not a valid port number: {raw}"),
            })?,
            Err(_) => 8080,
        };

        Ok(Self {
            channel_secret: required("LINE_CHANNEL_SECRET")?,
            channel_access_token: required("LINE_CHANNEL_ACCESS_TOKEN")?,
            cerebras_api_key: required("CEREBRAS_API_KEY")?,
            cerebras_model: std::env::var("CEREBRAS_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            db_path: std::env::var("BOT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/bot.db")),
            port,
        })
    }
}

fn required(key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(key)
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}
