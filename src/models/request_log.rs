//! Request log entry model
//!
//! Entries are append-only: every lifecycle transition (started, completed,
//! failed) is written as a new record, never an in-place update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of request being logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    Research,
    PushToScopestack,
    Test,
}

/// Lifecycle status of a logged request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Started,
    Completed,
    Failed,
}

/// One request log record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// The raw user input that triggered the request
    pub user_request: String,
    pub request_type: RequestType,
    pub status: RequestStatus,
    /// Duration in milliseconds, present on completed/failed records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Technology resolved from the input, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl RequestLogEntry {
    /// Create a `started` record for a new request
    pub fn started(request_type: RequestType, user_request: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_request: user_request.into(),
            request_type,
            status: RequestStatus::Started,
            duration: None,
            error_message: None,
            technology: None,
            metadata: None,
        }
    }

    /// Derive a `completed` record from this one
    pub fn completed(&self, duration_ms: u64) -> Self {
        let mut entry = self.clone();
        entry.timestamp = Utc::now();
        entry.status = RequestStatus::Completed;
        entry.duration = Some(duration_ms);
        entry
    }

    /// Derive a `failed` record from this one
    pub fn failed(&self, duration_ms: u64, error: impl Into<String>) -> Self {
        let mut entry = self.clone();
        entry.timestamp = Utc::now();
        entry.status = RequestStatus::Failed;
        entry.duration = Some(duration_ms);
        entry.error_message = Some(error.into());
        entry
    }

    /// Attach the resolved technology
    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_records_share_id() {
        let started = RequestLogEntry::started(RequestType::Research, "O365 migration");
        let completed = started.completed(1200);
        assert_eq!(started.id, completed.id);
        assert_eq!(completed.status, RequestStatus::Completed);
        assert_eq!(completed.duration, Some(1200));
    }

    #[test]
    fn test_request_type_serializes_kebab_case() {
        let json = serde_json::to_string(&RequestType::PushToScopestack).unwrap();
        assert_eq!(json, "\"push-to-scopestack\"");
    }

    #[test]
    fn test_failed_record_carries_error() {
        let started = RequestLogEntry::started(RequestType::Test, "ping");
        let failed = started.failed(30, "upstream timed out");
        assert_eq!(failed.status, RequestStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("upstream timed out"));
    }
}
