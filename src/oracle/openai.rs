// SPDX-License-Identifier: MIT

//! OpenAI oracle - chat-completions implementation of [ChatOracle]

use super::ChatOracle;
use crate::error::VerityError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI chat-completions oracle
pub struct OpenAiOracle {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAiOracle {
    /// Create a new OpenAiOracle
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self, VerityError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| VerityError::config("OPENAI_API_KEY must be set"))?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(VerityError::Http)?;

        Ok(Self {
            client,
            api_key,
            model_name,
            base_url,
        })
    }

    async fn post_chat(&self, stage: &str, body: Value) -> Result<Value, VerityError> {
        let url = format!("{}/chat/completions", self.base_url);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| VerityError::oracle(stage, e.to_string()))?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(VerityError::oracle(
                stage,
                format!("OpenAI API error: {}", text),
            ));
        }

        resp.json()
            .await
            .map_err(|e| VerityError::oracle(stage, e.to_string()))
    }

    fn message_content(response: &Value) -> Option<&str> {
        response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|choice| choice["message"]["content"].as_str())
    }
}

#[async_trait]
impl ChatOracle for OpenAiOracle {
    async fn complete(&self, system: &str, user: &str) -> Result<String, VerityError> {
        let body = json!({
            "model": self.model_name,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let resp = self.post_chat("completion", body).await?;
        Self::message_content(&resp)
            .map(|s| s.to_string())
            .ok_or_else(|| VerityError::oracle("completion", "no text content in response"))
    }

    async fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, VerityError> {
        let body = json!({
            "model": self.model_name,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                    "strict": true
                }
            }
        });

        let resp = self.post_chat(schema_name, body).await?;
        let content = Self::message_content(&resp)
            .ok_or_else(|| VerityError::oracle(schema_name, "no text content in response"))?;

        serde_json::from_str(content).map_err(|e| {
            VerityError::oracle(
                schema_name,
                format!("malformed structured output '{}': {}", content, e),
            )
        })
    }
}
