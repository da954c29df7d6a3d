//! HTTP route handlers
//!
//! Organized by domain:
//! - research_routes: generation pipeline with SSE progress
//! - push_routes: push generated content into ScopeStack
//! - analytics_routes: request log queries and aggregate stats
//! - auth_routes: OAuth password-grant helpers for the UI

pub mod analytics_routes;
pub mod auth_routes;
pub mod push_routes;
pub mod research_routes;

use axum::http::HeaderMap;
use serde_json::{json, Value};

/// Standard error response body
pub fn error_body(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

/// Rate-limit key for a request: the forwarded client address when present,
/// otherwise a shared local bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "local".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.1.2.3, 172.16.0.1".parse().unwrap());
        assert_eq!(client_key(&headers), "10.1.2.3");
    }

    #[test]
    fn test_client_key_defaults_to_local() {
        assert_eq!(client_key(&HeaderMap::new()), "local");
    }

    #[test]
    fn test_error_body_shape() {
        let body = error_body("nope");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "nope");
    }
}
