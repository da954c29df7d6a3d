// ScopeStack integration: JSON:API client, auth, and the push workflow

pub mod auth;
pub mod client;
pub mod push;
pub mod types;

pub use auth::{password_grant, refresh_grant, Credentials, OAuthSession};
pub use client::ScopeStackClient;
pub use push::{push_to_scopestack, PushError, PushOptions, PushOutcome};

use thiserror::Error;

/// Failure from a ScopeStack API call. Status and body are preserved so the
/// route layer can classify auth vs validation vs generic upstream failures.
#[derive(Debug, Error)]
pub enum ScopeStackError {
    #[error("ScopeStack API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("ScopeStack request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected ScopeStack response: {0}")]
    UnexpectedResponse(String),
    #[error("ScopeStack authentication failed: {0}")]
    Auth(String),
}

impl ScopeStackError {
    /// Credentials are missing, invalid, or forbidden
    pub fn is_auth_error(&self) -> bool {
        match self {
            ScopeStackError::Api { status, .. } => *status == 401 || *status == 403,
            ScopeStackError::Auth(_) => true,
            _ => false,
        }
    }

    /// ScopeStack rejected the payload itself
    pub fn is_validation_error(&self) -> bool {
        matches!(self, ScopeStackError::Api { status, .. } if *status == 400 || *status == 422)
    }
}
