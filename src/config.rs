//! Environment-driven application configuration
//!
//! Built once in `main.rs` and injected through `AppState`. Absent LLM
//! credentials are not an error: the pipeline runs on its fallback path, so
//! the server stays useful for demos and tests.

use std::path::PathBuf;

/// LLM provider settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Bearer API key; empty means no LLM, fallback-only operation
    pub api_key: String,
    /// Default model identifier
    pub model: String,
}

/// ScopeStack connection settings
#[derive(Debug, Clone)]
pub struct ScopeStackConfig {
    pub api_url: String,
    /// Host carrying the fixed OAuth token endpoint
    pub auth_url: String,
    /// Legacy long-lived API token, when configured
    pub api_token: Option<String>,
    pub account_slug: Option<String>,
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub scopestack: ScopeStackConfig,
    /// Request-log file; `None` means console-only logging
    pub request_log_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read configuration from the environment
    pub fn from_env() -> Self {
        let llm = LlmConfig {
            base_url: env_or("LLM_API_URL", "https://api.openai.com/v1"),
            api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            model: env_or("LLM_MODEL", "gpt-4o"),
        };
        let scopestack = ScopeStackConfig {
            api_url: env_or("SCOPESTACK_API_URL", "https://api.scopestack.io"),
            auth_url: env_or("SCOPESTACK_AUTH_URL", "https://app.scopestack.io"),
            api_token: std::env::var("SCOPESTACK_API_TOKEN").ok().filter(|t| !t.is_empty()),
            account_slug: std::env::var("SCOPESTACK_ACCOUNT_SLUG")
                .ok()
                .filter(|s| !s.is_empty()),
        };
        let request_log_path = std::env::var("REQUEST_LOG_FILE")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Self {
            llm,
            scopestack,
            request_log_path,
        }
    }

    /// Whether LLM credentials are configured
    pub fn has_llm_credentials(&self) -> bool {
        !self.llm.api_key.trim().is_empty()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
