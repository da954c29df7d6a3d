//! Analytics endpoint: request log queries and aggregate stats
//!
//! `GET /api/analytics?action=analytics|logs&limit=N`

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::error_body;
use crate::server::AppState;

/// Default number of log records returned when no limit is given
const DEFAULT_LOG_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Handle `GET /api/analytics`
pub async fn analytics_handler(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Response {
    match query.action.as_deref().unwrap_or("analytics") {
        "analytics" => {
            let analytics = state.logger.get_analytics();
            Json(json!({ "analytics": analytics })).into_response()
        }
        "logs" => {
            let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
            let logs = state.logger.get_request_logs(limit);
            Json(json!({ "logs": logs })).into_response()
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(error_body(&format!(
                "unknown action '{}', expected 'analytics' or 'logs'",
                other
            ))),
        )
            .into_response(),
    }
}
