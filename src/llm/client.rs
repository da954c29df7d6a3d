//! HTTP client for the OpenAI-compatible chat-completion endpoint

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Default per-call timeout when the caller does not supply one
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default token budget for a completion
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Per-call knobs for a completion request
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Model override; falls back to the client's default model
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Hard ceiling on the whole HTTP exchange
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl CompletionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl LlmClient {
    /// Create a new client. Fails when the API key is missing, so the
    /// configuration error surfaces before any call is attempted.
    pub fn new(base_url: &str, api_key: &str, default_model: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow!("LLM API key is not configured"));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            default_model: default_model.to_string(),
        })
    }

    /// Send a single-message completion request and return the response text.
    ///
    /// The whole exchange is bounded by `opts.timeout`; a timeout is the same
    /// error class as any other upstream failure.
    pub async fn complete(&self, prompt: &str, opts: &CompletionOptions) -> Result<String> {
        let request = ChatCompletionRequest {
            model: opts
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let send = async {
            let response = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await
                .map_err(|e| anyhow!("LLM request failed: {}", e))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("LLM API error ({}): {}", status, body));
            }

            let parsed: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| anyhow!("Failed to parse LLM response: {}", e))?;

            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| anyhow!("LLM response contained no choices"))
        };

        match tokio::time::timeout(opts.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "LLM call timed out after {}s",
                opts.timeout.as_secs()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_api_key() {
        let result = LlmClient::new("https://api.example.com/v1", "  ", "gpt-4o");
        assert!(result.is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = LlmClient::new("https://api.example.com/v1/", "key", "gpt-4o").unwrap();
        assert_eq!(client.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_completion_request_shape() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            max_tokens: 100,
            temperature: 0.2,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 100);
    }
}
