/// Configuration module for managing environment variables and API keys
///
/// This module loads and validates all configuration values from
/// environment variables (typically from a .env file).

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::catalog::CatalogLoadPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token from BotFather
    pub telegram_token: String,

    /// Path to the JSON file holding the tour catalog
    pub tours_file: PathBuf,

    /// What to do when the catalog file is missing or malformed
    pub catalog_load_policy: CatalogLoadPolicy,

    /// SQLite database URL for the lead log (e.g., "sqlite://leads.db")
    pub database_url: String,

    /// OpenAI API key. When unset the AI fallback is disabled
    pub openai_api_key: Option<String>,

    /// Base URL of the chat completions API
    pub openai_base_url: String,

    /// GPT model to use (e.g., "gpt-4o-mini")
    pub gpt_model: String,

    /// Request timeout for the completion call, in seconds
    pub completion_timeout_secs: u64,

    /// Port for the health HTTP server (disabled if not set)
    pub health_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if the Telegram token is missing or a value fails to parse
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Ok(Config {
            telegram_token: env::var("TELEGRAM_TOKEN")
                .or_else(|_| env::var("TELEGRAM_BOT_TOKEN"))
                .context("TELEGRAM_TOKEN must be set")?,

            tours_file: env::var("TOURS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/tours.json")),

            catalog_load_policy: match env::var("CATALOG_LOAD_POLICY") {
                Ok(value) => value.parse()?,
                Err(_) => CatalogLoadPolicy::default(),
            },

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://leads.db".to_string()),

            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),

            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),

            gpt_model: env::var("GPT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),

            completion_timeout_secs: parse_optional("COMPLETION_TIMEOUT_SECS")?
                .unwrap_or(60),

            health_port: parse_optional("HEALTH_PORT")?,
        })
    }

    /// Whether free-text questions without a catalog match go to the language model
    pub fn completion_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Validate the loaded values before anything connects
    pub fn validate(&self) -> Result<()> {
        log::info!("Validating configuration...");

        if self.telegram_token.trim().is_empty() {
            anyhow::bail!("TELEGRAM_TOKEN is empty");
        }

        if self.completion_timeout_secs == 0 {
            anyhow::bail!("COMPLETION_TIMEOUT_SECS must be greater than zero");
        }

        if !self.completion_enabled() {
            log::info!("OPENAI_API_KEY not set - AI fallback disabled, search only");
        }

        log::info!("Configuration validated successfully");
        Ok(())
    }
}

/// Parse an optional numeric variable, failing loudly on garbage instead of
/// silently falling back to the default
fn parse_optional<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(None),
    }
}
