//! # Search Providers
//!
//! Web search backends behind the `SearchProvider` trait: a self-hosted SearXNG
//! instance (markdown results) or the Tavily API (HTML results).

pub mod searxng;
pub mod tavily;

use std::sync::Arc;

use crate::domain::config::{SearchConfig, SearchProviderKind};
use crate::domain::traits::SearchProvider;

/// HTTP client reused across search requests
pub(crate) fn http_client() -> &'static reqwest::Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .user_agent(concat!("projectd/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Builds the provider selected in the configuration.
pub fn from_config(config: &SearchConfig) -> Arc<dyn SearchProvider> {
    match config.provider {
        SearchProviderKind::Searxng => Arc::new(searxng::SearxngSearch::new(
            config.searxng_url.clone(),
            config.results,
        )),
        SearchProviderKind::Tavily => Arc::new(tavily::TavilySearch::new(
            config.tavily_api_key.clone(),
            config.results,
        )),
    }
}
