// Integration tests for the HTTP API surface

#[cfg(test)]
mod server_integration_tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use scopegen_lib::config::{AppConfig, LlmConfig, ScopeStackConfig};
    use scopegen_lib::llm::static_fallback_content;
    use scopegen_lib::server::{build_router, AppState};

    fn test_state() -> AppState {
        AppState::new(AppConfig {
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
        })
    }

    async fn body_json(body: Body) -> serde_json::Value {
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/api/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_research_streams_sse() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/research")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"input": "SD-WAN rollout for 12 sites"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert!(content_type.starts_with("text/event-stream"));
    }

    #[tokio::test]
    async fn test_research_empty_input_is_400() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/research")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"input": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_push_rejects_empty_services() {
        let mut content = static_fallback_content("Test", None, &[]);
        content.services.clear();
        let body = serde_json::json!({ "content": content });

        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/push-to-scopestack")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_push_without_token_is_400() {
        let content = static_fallback_content("Test", None, &[]);
        let body = serde_json::json!({ "content": content });

        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/push-to-scopestack")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response.into_body()).await;
        assert!(json["error"].as_str().unwrap().contains("token"));
    }

    #[tokio::test]
    async fn test_analytics_default_action() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/api/analytics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["analytics"]["totalRequests"], 0);
    }

    #[tokio::test]
    async fn test_analytics_unknown_action_is_400() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::get("/api/analytics?action=bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analytics_logs_action() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::get("/api/analytics?action=logs&limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert!(json["logs"].is_array());
    }
}
