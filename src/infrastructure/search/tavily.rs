//! Tavily search API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::traits::SearchProvider;

const TAVILY_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

pub struct TavilySearch {
    api_key: Option<String>,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(api_key: Option<String>, max_results: usize) -> Self {
        Self {
            api_key,
            max_results,
        }
    }
}

/// Host part of a URL, used when a result has no title.
fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, rest)| rest)?;
    let host = rest.split(['/', '?', '#']).next()?;
    (!host.is_empty()).then_some(host)
}

fn format_results(results: &[TavilyResult]) -> String {
    let formatted: Vec<String> = results
        .iter()
        .map(|r| {
            let url = r.url.as_deref().unwrap_or("No URL");
            let content = r.content.as_deref().unwrap_or("No content");
            let title = r
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .or_else(|| host_of(url))
                .unwrap_or("No title");
            format!(
                "<div class='search-result'><h3><a href='{}' target='_blank'>{}</a></h3><p>{}</p></div>",
                url, title, content
            )
        })
        .collect();

    if formatted.is_empty() {
        "<div class='search-result'><p>No results found.</p></div>".to_string()
    } else {
        formatted.join("\n")
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "TAVILY"
    }

    async fn search(&self, query: &str) -> Result<String, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "TAVILY_API_KEY is not configured".to_string())?;

        let request = TavilyRequest {
            api_key,
            query,
            search_depth: "advanced",
            max_results: self.max_results,
        };

        let response = super::http_client()
            .post(TAVILY_URL)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Error performing Tavily search: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Error performing Tavily search: HTTP {}: {}", status, body));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| format!("Error performing Tavily search: {}", e))?;

        tracing::debug!(query, results = body.results.len(), "Tavily search completed");
        Ok(format_results(&body.results))
    }
}
