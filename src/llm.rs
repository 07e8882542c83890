use crate::error::{InsightError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Outcome of one text-generation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Generated(String),
    Unavailable(String),
}

/// Single-shot text generation. Implementations must not retry and must
/// fold every failure into [`Generation::Unavailable`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Generation;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
            http,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a concise real estate market analyst."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.4,
            "max_tokens": 400
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InsightError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightError::Llm(format!("LLM API returned {}", status)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InsightError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Generation {
        debug!("Requesting summary from {}", self.model);
        match tokio::time::timeout(self.timeout, self.call_llm(prompt)).await {
            Ok(Ok(text)) => Generation::Generated(text),
            Ok(Err(e)) => Generation::Unavailable(e.to_string()),
            Err(_) => Generation::Unavailable(format!(
                "LLM call timed out after {}s",
                self.timeout.as_secs()
            )),
        }
    }
}

/// Pull the first choice's message text out of a chat completion.
fn extract_content(response: &serde_json::Value) -> Result<String> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| InsightError::Llm("No content in LLM response".to_string()))?
        .trim();

    if content.is_empty() {
        return Err(InsightError::Llm("Empty content in LLM response".to_string()));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_content() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "  Prices are rising.\n"}}]
        });
        assert_eq!(extract_content(&response).unwrap(), "Prices are rising.");
    }

    #[test]
    fn test_extract_content_rejects_malformed() {
        assert!(extract_content(&json!({"error": {"message": "quota"}})).is_err());
        assert!(extract_content(&json!({"choices": [{"message": {"content": "  "}}]})).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let client = LlmClient::new(
            "test-key".to_string(),
            DEFAULT_MODEL.to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(2),
        );
        assert!(matches!(
            client.generate("hello").await,
            Generation::Unavailable(_)
        ));
    }
}
