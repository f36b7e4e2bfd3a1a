//! Tavily search API client
//!
//! Tavily takes the API key in the request body rather than a header, and
//! supports a "search_depth" knob; research always asks for "advanced".

use crate::search::client::SearchClient;
use crate::types::{AppError, Result, SearchResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_API_URL: &str = "https://api.tavily.com/search";

/// Tavily web search client
pub struct TavilyClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    snippet: Option<String>,
    score: Option<f32>,
}

impl TavilyClient {
    /// Create a new client against the public Tavily endpoint
    pub fn new(api_key: String) -> Self {
        Self::with_api_url(api_key, DEFAULT_API_URL.to_string())
    }

    /// Create a client against a custom endpoint (used by tests)
    pub fn with_api_url(api_key: String, api_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
            "search_depth": "advanced",
            "include_domains": [],
            "exclude_domains": [],
        });

        let response = self
            .http
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to search: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Tavily returned {}: {}",
                status, detail
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Invalid Tavily response: {}", e)))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                content: r.content,
                snippet: r.snippet,
                score: r.score,
            })
            .collect())
    }
}
