//! Server application state shared across handlers

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::rate_limit::RateLimiter;
use crate::request_log::RequestLogger;
use crate::shutdown::ShutdownState;

/// Shared state injected into every route handler. Explicit process-scoped
/// state rather than module-level singletons, so tests control the lifecycle.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// LLM client, absent when no credentials are configured
    pub llm: Option<LlmClient>,

    /// Request logger (JSON-lines file or console-only)
    pub logger: Arc<RequestLogger>,

    /// Fixed-window rate limiter
    pub rate_limiter: Arc<RateLimiter>,

    /// Shutdown state
    pub shutdown_state: ShutdownState,
}

impl AppState {
    /// Build state from configuration. A missing LLM key leaves `llm` unset
    /// and the pipeline on its fallback path.
    pub fn new(config: AppConfig) -> Self {
        let llm = if config.has_llm_credentials() {
            match LlmClient::new(&config.llm.base_url, &config.llm.api_key, &config.llm.model) {
                Ok(client) => Some(client),
                Err(e) => {
                    log::warn!("LLM client unavailable, running fallback-only: {}", e);
                    None
                }
            }
        } else {
            log::info!("No LLM credentials configured, running fallback-only");
            None
        };

        let logger = match config.request_log_path {
            Some(ref path) => Arc::new(RequestLogger::with_file(path.clone())),
            None => Arc::new(RequestLogger::console_only()),
        };

        Self {
            config: Arc::new(config),
            llm,
            logger,
            rate_limiter: Arc::new(RateLimiter::default()),
            shutdown_state: ShutdownState::new(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{LlmConfig, ScopeStackConfig};

    pub fn test_config() -> AppConfig {
        AppConfig {
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o".to_string(),
            },
            scopestack: ScopeStackConfig {
                api_url: "https://api.scopestack.io".to_string(),
                auth_url: "https://app.scopestack.io".to_string(),
                api_token: None,
                account_slug: None,
            },
            request_log_path: None,
        }
    }

    #[test]
    fn test_state_without_credentials_has_no_llm() {
        let state = AppState::new(test_config());
        assert!(state.llm.is_none());
    }
}
