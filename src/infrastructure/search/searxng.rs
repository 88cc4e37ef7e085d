//! SearXNG search over its JSON API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::traits::SearchProvider;

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
}

pub struct SearxngSearch {
    url: Option<String>,
    limit: usize,
}

impl SearxngSearch {
    pub fn new(url: Option<String>, limit: usize) -> Self {
        Self { url, limit }
    }
}

fn format_results(results: &[SearxngResult], limit: usize) -> String {
    let formatted: Vec<String> = results
        .iter()
        .take(limit)
        .map(|r| {
            let snippet = r
                .content
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or("No snippet available");
            format!("**{}**\n[Link]({})\n*{}*\n", r.title, r.url, snippet)
        })
        .collect();

    if formatted.is_empty() {
        "No results found.".to_string()
    } else {
        formatted.join("\n\n")
    }
}

#[async_trait]
impl SearchProvider for SearxngSearch {
    fn name(&self) -> &str {
        "SEARXNG"
    }

    async fn search(&self, query: &str) -> Result<String, String> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| "SEARXNG_URL is not configured".to_string())?;

        let response = super::http_client()
            .get(url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| format!("Error performing SearXNG search: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Error performing SearXNG search: HTTP {}", status));
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| format!("Error performing SearXNG search: {}", e))?;

        tracing::debug!(query, results = body.results.len(), "SearXNG search completed");
        Ok(format_results(&body.results, self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_results_limit_and_snippet() {
        let results = vec![
            SearxngResult {
                title: "Rust".to_string(),
                url: "https://rust-lang.org".to_string(),
                content: Some("A language".to_string()),
            },
            SearxngResult {
                title: "Crates".to_string(),
                url: "https://crates.io".to_string(),
                content: None,
            },
            SearxngResult {
                title: "Hidden".to_string(),
                url: "https://example.com".to_string(),
                content: None,
            },
        ];

        let text = format_results(&results, 2);
        assert_eq!(
            text,
            "**Rust**\n[Link](https://rust-lang.org)\n*A language*\n\n\n**Crates**\n[Link](https://crates.io)\n*No snippet available*\n"
        );
        assert!(!text.contains("Hidden"));
    }

    #[test]
    fn test_format_results_empty() {
        assert_eq!(format_results(&[], 5), "No results found.");
    }

    #[tokio::test]
    async fn test_missing_url_is_an_error() {
        let provider = SearxngSearch::new(None, 5);
        let err = provider.search("rust").await.unwrap_err();
        assert!(err.contains("SEARXNG_URL"));
    }
}
