//! # LLM Providers
//!
//! Contains the wire-level implementation for the Anthropic Messages API.

pub mod anthropic;

use crate::domain::config::ModelConfig;
use crate::infrastructure::llm::{Context, Error, Response};

/// Configuration for a provider
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key
    pub api_key: String,
    /// Base URL (for non-default endpoints)
    pub base_url: Option<String>,
    /// Default model
    pub default_model: String,
    /// Timeout in seconds
    pub timeout: Option<u64>,
}

impl ProviderConfig {
    pub fn from_model_config(config: &ModelConfig) -> Result<Self, Error> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::new("anthropic", "No API key provided - set ANTHROPIC_API_KEY")
        })?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            default_model: config.model.clone(),
            timeout: config.timeout_secs,
        })
    }
}

/// Execute a chat request
pub async fn chat(config: ProviderConfig, context: Context) -> Result<Response, Error> {
    anthropic::chat(config, context).await
}
