//! # Domain Traits
//!
//! Abstract interfaces for the external collaborators (language model, web search).
//! Allows for pluggable implementations in the Infrastructure layer and scripted fakes in tests.

use async_trait::async_trait;

use crate::infrastructure::llm::{Context, Error, Response};

/// Abstract interface for a language-model provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the full context and wait for one response
    async fn complete(&self, context: Context) -> Result<Response, Error>;
}

/// Abstract interface for a web-search provider
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Human-readable provider name (e.g. "SEARXNG")
    fn name(&self) -> &str;

    /// Run a query and return formatted text/HTML results
    async fn search(&self, query: &str) -> Result<String, String>;
}
