//! Research endpoint: runs the generation pipeline, streaming progress as SSE
//!
//! `POST /api/research` with `{"input": "..."}`. The response is an SSE
//! stream of `step`, `progress`, `complete`, and `error` events. Client
//! disconnects stop event delivery but not the pipeline run.

use std::convert::Infallible;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use super::{client_key, error_body};
use crate::models::{RequestLogEntry, RequestType};
use crate::pipeline::{ProgressEvent, ResearchPipeline};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub input: String,
}

/// Handle `POST /api/research`
pub async fn research_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResearchRequest>,
) -> Response {
    let input = body.input.trim().to_string();
    if input.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body("input must not be empty")),
        )
            .into_response();
    }

    if !state.rate_limiter.check(&client_key(&headers)) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(error_body("rate limit exceeded, try again shortly")),
        )
            .into_response();
    }

    let started = RequestLogEntry::started(RequestType::Research, input.clone());
    state.logger.log_request(&started);

    let (tx, rx) = mpsc::channel::<ProgressEvent>(64);
    let pipeline = ResearchPipeline::new(state.llm.clone());
    let logger = state.logger.clone();
    let start_time = Instant::now();

    tokio::spawn(async move {
        let content = pipeline.run(&input, tx).await;
        let duration_ms = start_time.elapsed().as_millis() as u64;
        logger.log_request(
            &started
                .completed(duration_ms)
                .with_technology(content.technology.clone()),
        );
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let sse_event = Event::default().event(event.event_name());
        Ok::<Event, Infallible>(match sse_event.json_data(&event) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Failed to serialize progress event: {}", e);
                Event::default().event("error").data("{}")
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::state::tests::test_config;

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let state = AppState::new(test_config());
        let response = research_handler(
            State(state),
            HeaderMap::new(),
            Json(ResearchRequest {
                input: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_research_returns_event_stream() {
        let state = AppState::new(test_config());
        let response = research_handler(
            State(state),
            HeaderMap::new(),
            Json(ResearchRequest {
                input: "Office 365 migration for 100 mailboxes".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert!(content_type.starts_with("text/event-stream"));
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429() {
        let state = AppState::new(test_config());
        // Exhaust the default window budget
        for _ in 0..crate::rate_limit::DEFAULT_MAX_REQUESTS {
            assert!(state.rate_limiter.check("local"));
        }
        let response = research_handler(
            State(state),
            HeaderMap::new(),
            Json(ResearchRequest {
                input: "Network refresh".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
