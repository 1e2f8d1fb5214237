// SPDX-License-Identifier: MIT

//! Brave Search implementation of [WebSearch]

use super::WebSearch;
use crate::error::VerityError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::time::Duration;

/// Default number of web results per query
pub const DEFAULT_RESULT_COUNT: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// Brave Search API client
pub struct BraveSearch {
    client: Client,
    api_key: String,
    count: u32,
}

impl BraveSearch {
    /// Create a new BraveSearch client
    ///
    /// Requires `BRAVE_API_KEY` environment variable to be set.
    pub fn new() -> Result<Self, VerityError> {
        let api_key = env::var("BRAVE_API_KEY")
            .map_err(|_| VerityError::config("BRAVE_API_KEY must be set"))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(VerityError::Http)?;

        Ok(Self {
            client,
            api_key,
            count: DEFAULT_RESULT_COUNT,
        })
    }

    /// Override the number of results per query (max 20)
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.min(20);
        self
    }
}

/// Pull result descriptions out of a Brave web-search response body
fn extract_snippets(body: &Value) -> Result<Vec<String>, VerityError> {
    let results = body
        .get("web")
        .and_then(|w| w.get("results"))
        .and_then(|r| r.as_array())
        .ok_or_else(|| {
            VerityError::search("brave", "invalid response format: missing web.results")
        })?;

    Ok(results
        .iter()
        .filter_map(|r| r.get("description").and_then(|d| d.as_str()))
        .map(|s| s.to_string())
        .collect())
}

#[async_trait]
impl WebSearch for BraveSearch {
    async fn search(&self, question: &str) -> Result<Vec<String>, VerityError> {
        let mut url = reqwest::Url::parse("https://api.search.brave.com/res/v1/web/search")
            .map_err(|e| VerityError::search("brave", e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("q", question)
            .append_pair("count", &self.count.to_string());

        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| VerityError::search("brave", e.to_string()))?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(VerityError::search(
                "brave",
                format!("Brave API error: {}", text),
            ));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| VerityError::search("brave", e.to_string()))?;

        extract_snippets(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_snippets() {
        let body = json!({
            "web": {
                "results": [
                    { "title": "A", "url": "https://a", "description": "first snippet" },
                    { "title": "B", "url": "https://b", "description": "second snippet" }
                ]
            }
        });

        let snippets = extract_snippets(&body).unwrap();
        assert_eq!(snippets, vec!["first snippet", "second snippet"]);
    }

    #[test]
    fn test_extract_snippets_missing_results() {
        let body = json!({ "web": {} });
        let err = extract_snippets(&body).unwrap_err();
        assert!(err.to_string().contains("web.results"));
    }

    #[test]
    fn test_extract_snippets_skips_results_without_description() {
        let body = json!({
            "web": {
                "results": [
                    { "title": "A", "url": "https://a" },
                    { "title": "B", "url": "https://b", "description": "kept" }
                ]
            }
        });

        let snippets = extract_snippets(&body).unwrap();
        assert_eq!(snippets, vec!["kept"]);
    }
}
