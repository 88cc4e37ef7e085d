//! # LLM Client
//!
//! Provides the `Client` struct, the production `LlmProvider`. It fills in the
//! configured model and token budget and routes requests to the provider.

use crate::domain::config::ModelConfig;
use crate::domain::traits::LlmProvider;
use crate::infrastructure::llm::providers;
use crate::infrastructure::llm::{Context, Error, Response};
use async_trait::async_trait;

/// Simple LLM client
pub struct Client {
    config: ModelConfig,
}

impl Client {
    /// Create a new client from the model configuration
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Send a context, filling in the configured model and max tokens when unset
    pub async fn chat(&self, mut context: Context) -> Result<Response, Error> {
        let provider_config = providers::ProviderConfig::from_model_config(&self.config)?;
        if context.model.is_none() {
            context.model = Some(self.config.model.clone());
        }
        if context.max_tokens.is_none() {
            context.max_tokens = Some(self.config.max_tokens);
        }
        providers::chat(provider_config, context).await
    }
}

#[async_trait]
impl LlmProvider for Client {
    async fn complete(&self, context: Context) -> Result<Response, Error> {
        self.chat(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::Message;

    #[tokio::test]
    async fn test_missing_api_key_is_reported() {
        let client = Client::new(ModelConfig::default());
        let err = client
            .complete(Context::new().with_messages(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.provider, "anthropic");
        assert!(err.message.contains("ANTHROPIC_API_KEY"));
    }
}
