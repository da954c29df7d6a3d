//! Push endpoint: drive generated content into ScopeStack
//!
//! `POST /api/push-to-scopestack`. Content is validated locally before any
//! external call; ScopeStack failures after project creation surface as
//! `warnings` on a `success: true` response rather than failing the push.

use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::error_body;
use crate::models::{GeneratedContent, RequestLogEntry, RequestType};
use crate::scopestack::{push_to_scopestack, PushOptions, ScopeStackClient};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub content: GeneratedContent,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub skip_survey: bool,
    #[serde(default)]
    pub skip_document: bool,
}

/// Resolve the bearer token for this push: an Authorization header wins
/// (OAuth session from the UI), otherwise the configured legacy API token.
fn resolve_token(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }
    state.config.scopestack.api_token.clone()
}

/// Handle `POST /api/push-to-scopestack`
pub async fn push_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PushRequest>,
) -> Response {
    // Local validation first: no external call for obviously bad content
    if body.content.services.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body(
                "content validation failed: at least one service is required",
            )),
        )
            .into_response();
    }

    let Some(token) = resolve_token(&state, &headers) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body(
                "ScopeStack API token is not configured; set SCOPESTACK_API_TOKEN or \
                 authenticate via /api/auth/token",
            )),
        )
            .into_response();
    };
    let Some(account_slug) = state.config.scopestack.account_slug.clone() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body(
                "ScopeStack account slug is not configured; set SCOPESTACK_ACCOUNT_SLUG",
            )),
        )
            .into_response();
    };

    let started = RequestLogEntry::started(
        RequestType::PushToScopestack,
        format!("push: {}", body.content.technology),
    )
    .with_technology(body.content.technology.clone());
    state.logger.log_request(&started);
    let start_time = Instant::now();

    let client = ScopeStackClient::new(&state.config.scopestack.api_url, &account_slug, &token);
    let opts = PushOptions {
        client_name: body.client_name,
        project_name: body.project_name,
        skip_survey: body.skip_survey,
        skip_document: body.skip_document,
    };

    match push_to_scopestack(&client, &body.content, &opts).await {
        Ok(outcome) => {
            let duration_ms = start_time.elapsed().as_millis() as u64;
            state.logger.log_request(&started.completed(duration_ms));
            if !outcome.warnings.is_empty() {
                log::warn!(
                    "Push completed with {} warnings: {:?}",
                    outcome.warnings.len(),
                    outcome.warnings
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "project": outcome.project,
                    "client": outcome.client,
                    "survey": outcome.survey,
                    "document": outcome.document,
                    "details": outcome.details,
                    "warnings": outcome.warnings,
                    "metadata": outcome.metadata,
                })),
            )
                .into_response()
        }
        Err(e) => {
            let duration_ms = start_time.elapsed().as_millis() as u64;
            state
                .logger
                .log_request(&started.failed(duration_ms, e.to_string()));
            let status =
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(error_body(&e.to_string()))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::static_fallback_content;
    use crate::server::state::tests::test_config;

    fn push_request(content: GeneratedContent) -> PushRequest {
        PushRequest {
            content,
            client_name: None,
            project_name: None,
            skip_survey: false,
            skip_document: false,
        }
    }

    #[tokio::test]
    async fn test_empty_services_is_400_before_any_external_call() {
        let state = AppState::new(test_config());
        let mut content = static_fallback_content("Test", None, &[]);
        content.services.clear();

        let response =
            push_handler(State(state), HeaderMap::new(), Json(push_request(content))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_token_is_400() {
        let state = AppState::new(test_config());
        let content = static_fallback_content("Test", None, &[]);

        let response =
            push_handler(State(state), HeaderMap::new(), Json(push_request(content))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bearer_header_overrides_configured_token() {
        let state = AppState::new(test_config());
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer session-token".parse().unwrap());
        assert_eq!(
            resolve_token(&state, &headers).as_deref(),
            Some("session-token")
        );
    }

    #[test]
    fn test_push_request_flags_default_false() {
        let body: PushRequest = serde_json::from_value(serde_json::json!({
            "content": static_fallback_content("Test", None, &[]),
        }))
        .unwrap();
        assert!(!body.skip_survey);
        assert!(!body.skip_document);
        assert!(body.client_name.is_none());
    }
}
