use sdr_core::{pipeline::LlmProvider, reference::DEFAULT_REFERENCE_PATH};
use std::path::PathBuf;
use tracing::Level;

/// The local environment file loaded at startup.
pub const ENV_FILE: &str = ".env";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// Credentials for the speech providers are read by the host framework
/// directly and are not modelled here.
#[derive(Clone, Debug)]
pub struct Config {
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub log_level: Level,
    pub reference_data_path: PathBuf,
    pub leads_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::from_filename(ENV_FILE).ok();
        }

        let google_api_key = non_empty_var("GOOGLE_API_KEY");
        let openai_api_key = non_empty_var("OPENAI_API_KEY");

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let reference_data_path = std::env::var("REFERENCE_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REFERENCE_PATH));

        let leads_dir = std::env::var("LEADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            google_api_key,
            openai_api_key,
            log_level,
            reference_data_path,
            leads_dir,
        })
    }

    /// The credential for an LLM provider.
    pub fn api_key_for(&self, provider: LlmProvider) -> Result<&str, ConfigError> {
        let (key, var) = match provider {
            LlmProvider::Google => (&self.google_api_key, "GOOGLE_API_KEY"),
            LlmProvider::OpenAI => (&self.openai_api_key, "OPENAI_API_KEY"),
        };
        key.as_deref().ok_or_else(|| {
            ConfigError::MissingVar(format!("{} must be set for the {:?} provider", var, provider))
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
