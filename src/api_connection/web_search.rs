use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

use super::connection::ApiConnectionError;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebSearchRequest {
    pub query: String,
    pub result_count: usize,
    pub depth: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, request: &WebSearchRequest) -> Result<Vec<WebResult>, ApiConnectionError>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<WebResult>,
}

/// Tavily search client. The key is read from `api_key_env` at call time.
#[derive(Debug, Clone)]
pub struct TavilySearch {
    api_key_env: String,
}

impl TavilySearch {
    pub fn new(api_key_env: &str) -> Self {
        Self {
            api_key_env: api_key_env.to_string(),
        }
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, request: &WebSearchRequest) -> Result<Vec<WebResult>, ApiConnectionError> {
        let api_key = env::var(&self.api_key_env)
            .map_err(|_| ApiConnectionError::MissingApiKey(self.api_key_env.clone()))?;

        let body = TavilyRequest {
            api_key: &api_key,
            query: &request.query,
            search_depth: &request.depth,
            max_results: request.result_count,
        };

        let response = Client::new().post(TAVILY_SEARCH_URL).json(&body).send().await?;

        if response.status().is_success() {
            let parsed = response.json::<TavilyResponse>().await?;
            Ok(parsed.results.into_iter().take(request.result_count).collect())
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            Err(ApiConnectionError::ApiError { status, error_body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tavily_response_tolerates_missing_fields() {
        let raw = r#"{"results": [{"title": "Chili", "url": "https://x.test"}], "query": "q"}"#;
        let parsed: TavilyResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].content, "");
    }

    #[tokio::test]
    async fn missing_search_key_is_an_error() {
        let search = TavilySearch::new("THIS_SEARCH_KEY_SHOULD_NOT_EXIST_QWERTY");
        let request = WebSearchRequest {
            query: "vegan chili recipe".to_string(),
            result_count: 5,
            depth: "advanced".to_string(),
        };
        let result = search.search(&request).await;
        assert!(matches!(result, Err(ApiConnectionError::MissingApiKey(_))));
    }
}
