//! ScopeStack authentication
//!
//! Two schemes coexist: a long-lived API bearer token (legacy) and an OAuth2
//! password-grant session with refresh. Whichever is available yields the
//! bearer string attached to every API request.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ScopeStackError;

/// Path of the fixed OAuth token endpoint on the ScopeStack host
pub const TOKEN_PATH: &str = "/oauth/token";

/// An OAuth2 password-grant session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl OAuthSession {
    /// Whether the access token is expired (with a 60 second safety margin)
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(60) >= self.expires_at
    }
}

/// How the client authenticates against ScopeStack
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Legacy long-lived API token
    ApiToken(String),
    /// OAuth2 password-grant session
    OAuth(OAuthSession),
}

impl Credentials {
    /// The bearer string for the Authorization header
    pub fn bearer(&self) -> &str {
        match self {
            Credentials::ApiToken(token) => token,
            Credentials::OAuth(session) => &session.access_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

fn session_from_response(response: TokenResponse) -> OAuthSession {
    OAuthSession {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at: Utc::now() + Duration::seconds(response.expires_in),
    }
}

async fn token_request(
    auth_base_url: &str,
    form: &[(&str, &str)],
) -> Result<OAuthSession, ScopeStackError> {
    let url = format!("{}{}", auth_base_url.trim_end_matches('/'), TOKEN_PATH);
    let response = reqwest::Client::new().post(&url).form(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ScopeStackError::Auth(format!(
            "token endpoint returned {}: {}",
            status, body
        )));
    }

    let parsed: TokenResponse = response
        .json()
        .await
        .map_err(|e| ScopeStackError::Auth(format!("invalid token response: {}", e)))?;
    Ok(session_from_response(parsed))
}

/// Exchange a username/password for an OAuth session (`grant_type=password`)
pub async fn password_grant(
    auth_base_url: &str,
    username: &str,
    password: &str,
) -> Result<OAuthSession, ScopeStackError> {
    token_request(
        auth_base_url,
        &[
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ],
    )
    .await
}

/// Exchange a refresh token for a fresh session (`grant_type=refresh_token`)
pub async fn refresh_grant(
    auth_base_url: &str,
    refresh_token: &str,
) -> Result<OAuthSession, ScopeStackError> {
    token_request(
        auth_base_url,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await
}
