//! OAuth helper endpoints for the browser UI
//!
//! `POST /api/auth/token` exchanges credentials for a session
//! (`grant_type=password`); `POST /api/auth/refresh` rotates it. The UI keeps
//! the session in local storage and sends the access token as a bearer header
//! on push requests.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::error_body;
use crate::scopestack::{password_grant, refresh_grant};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Handle `POST /api/auth/token`
pub async fn token_handler(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Response {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body("username and password are required")),
        )
            .into_response();
    }

    match password_grant(&state.config.scopestack.auth_url, &body.username, &body.password).await {
        Ok(session) => Json(json!({ "session": session })).into_response(),
        Err(e) => {
            log::warn!("Password grant failed: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(error_body("authentication failed")),
            )
                .into_response()
        }
    }
}

/// Handle `POST /api/auth/refresh`
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Response {
    if body.refresh_token.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body("refreshToken is required")),
        )
            .into_response();
    }

    match refresh_grant(&state.config.scopestack.auth_url, &body.refresh_token).await {
        Ok(session) => Json(json!({ "session": session })).into_response(),
        Err(e) => {
            log::warn!("Token refresh failed: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(error_body("refresh failed, re-authentication required")),
            )
                .into_response()
        }
    }
}
