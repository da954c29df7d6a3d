//! Content generation pipeline
//!
//! Five sequential stages: parse → research → analyze → generate → format.
//! The user-visible contract is that the pipeline always terminates with
//! usable content: stages 1-3 substitute placeholders on failure, stage 4
//! falls back to [`generate_fallback`], and stage 5 degrades to the
//! unformatted content. Progress is reported through an mpsc channel the SSE
//! route drains; a dropped receiver stops event delivery but not the run.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::llm::{
    fallback::{generate_fallback, PartialResults},
    prompts,
    sanitizer::{parse_content, try_repair_json},
    CompletionOptions, LlmClient,
};
use crate::models::{GeneratedContent, Source};

/// Stage identifiers as they appear in progress events
pub const STAGES: [&str; 5] = ["parse", "research", "analyze", "generate", "format"];

/// Per-stage timeouts. Generation and research are the slow calls.
fn stage_timeout(stage: &str) -> Duration {
    match stage {
        "parse" => Duration::from_secs(60),
        "research" => Duration::from_secs(180),
        "analyze" => Duration::from_secs(120),
        "generate" => Duration::from_secs(180),
        "format" => Duration::from_secs(120),
        _ => Duration::from_secs(60),
    }
}

/// Status of a stage within a `step` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Active,
    Completed,
}

/// A progress event emitted while the pipeline runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    Step {
        id: String,
        status: StepStatus,
        percentage: u8,
    },
    #[serde(rename_all = "camelCase")]
    Progress { message: String, percentage: u8 },
    #[serde(rename_all = "camelCase")]
    Complete { content: GeneratedContent },
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

impl ProgressEvent {
    /// SSE event name for this variant
    pub fn event_name(&self) -> &'static str {
        match self {
            ProgressEvent::Step { .. } => "step",
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Complete { .. } => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }
}

/// The five-stage generation pipeline
pub struct ResearchPipeline {
    llm: Option<LlmClient>,
}

impl ResearchPipeline {
    /// Build a pipeline. `llm` is `None` when no credentials are configured;
    /// every stage then fails over and the static fallback carries the run.
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    /// Run the pipeline to completion, emitting progress into `tx` and
    /// returning the final content. Never fails.
    pub async fn run(&self, input: &str, tx: mpsc::Sender<ProgressEvent>) -> GeneratedContent {
        let mut partial = PartialResults::default();

        // Stage 1: parse the technology out of the request
        emit_step(&tx, "parse", StepStatus::Active, 10).await;
        let technology = match self.call_stage("parse", prompts::parse_prompt(input)).await {
            Ok(text) => {
                let tech = text.trim().lines().next().unwrap_or("").trim().to_string();
                if tech.is_empty() {
                    input.trim().to_string()
                } else {
                    tech
                }
            }
            Err(e) => {
                log::warn!("Parse stage failed, using raw input: {}", e);
                input.trim().to_string()
            }
        };
        partial.parsed_technology = Some(technology.clone());
        emit_step(&tx, "parse", StepStatus::Completed, 20).await;

        // Stage 2: research the technology
        emit_step(&tx, "research", StepStatus::Active, 25).await;
        let research = match self
            .call_stage("research", prompts::research_prompt(input, &technology))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Research stage failed, using placeholder: {}", e);
                format!(
                    "No research available. Standard implementation practices for {} apply.",
                    technology
                )
            }
        };
        partial.research = Some(research.clone());
        emit_step(&tx, "research", StepStatus::Completed, 40).await;

        // Stage 3: analyze into questions and calculations
        emit_step(&tx, "analyze", StepStatus::Active, 45).await;
        let analysis = match self
            .call_stage("analyze", prompts::analyze_prompt(&technology, &research))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Analyze stage failed, using placeholder: {}", e);
                "Standard discovery questions covering user count, site count, and \
                 environment complexity."
                    .to_string()
            }
        };
        partial.analysis = Some(analysis.clone());
        emit_step(&tx, "analyze", StepStatus::Completed, 60).await;

        // Stage 4: generate the full scope
        emit_step(&tx, "generate", StepStatus::Active, 65).await;
        let generated = match self
            .call_stage(
                "generate",
                prompts::generate_prompt(input, &technology, &research, &analysis),
            )
            .await
        {
            Ok(raw) => match parse_content(&raw) {
                Ok(content) => Some(content),
                Err(e) => {
                    log::warn!("Generated content failed validation: {}", e);
                    // Keep any sources the model did produce for the fallback
                    partial.dynamic_sources = recover_sources(&raw);
                    None
                }
            },
            Err(e) => {
                log::warn!("Generate stage failed: {}", e);
                None
            }
        };
        emit_step(&tx, "generate", StepStatus::Completed, 85).await;

        // Fallback replaces the content entirely; format is skipped for it
        let (content, is_fallback) = match generated {
            Some(content) => (content, false),
            None => {
                emit_progress(&tx, "Primary generation failed, using fallback content", 85).await;
                (generate_fallback(self.llm.as_ref(), input, &partial).await, true)
            }
        };

        // Stage 5: format, only on non-fallback content, degrading on failure
        let content = if is_fallback {
            content
        } else {
            emit_step(&tx, "format", StepStatus::Active, 90).await;
            let formatted = self.format_stage(&content).await;
            emit_step(&tx, "format", StepStatus::Completed, 95).await;
            formatted
        };

        let _ = tx
            .send(ProgressEvent::Complete {
                content: content.clone(),
            })
            .await;
        content
    }

    /// One bounded LLM call for a stage. Errors here are expected and caught
    /// by the caller; `Err` when no client is configured.
    async fn call_stage(&self, stage: &str, prompt: String) -> anyhow::Result<String> {
        let client = self
            .llm
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no LLM client configured"))?;
        let opts = CompletionOptions::default().with_timeout(stage_timeout(stage));
        client.complete(&prompt, &opts).await
    }

    /// Reformat narrative fields for the document schema. Any failure, at the
    /// call or at re-validation, returns the original content unchanged.
    async fn format_stage(&self, content: &GeneratedContent) -> GeneratedContent {
        let json = match serde_json::to_string(content) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Format stage serialization failed: {}", e);
                return content.clone();
            }
        };
        match self.call_stage("format", prompts::format_prompt(&json)).await {
            Ok(raw) => match parse_content(&raw) {
                Ok(formatted) => formatted,
                Err(e) => {
                    log::warn!("Format stage output rejected, keeping unformatted: {}", e);
                    content.clone()
                }
            },
            Err(e) => {
                log::warn!("Format stage failed, keeping unformatted: {}", e);
                content.clone()
            }
        }
    }
}

/// Pull whatever sources survive in otherwise-invalid generated output
fn recover_sources(raw: &str) -> Vec<Source> {
    let Some(repaired) = try_repair_json(raw) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&repaired) else {
        return Vec::new();
    };
    value
        .get("sources")
        .and_then(|s| s.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

async fn emit_step(tx: &mpsc::Sender<ProgressEvent>, id: &str, status: StepStatus, percentage: u8) {
    let _ = tx
        .send(ProgressEvent::Step {
            id: id.to_string(),
            status,
            percentage,
        })
        .await;
}

async fn emit_progress(tx: &mpsc::Sender<ProgressEvent>, message: &str, percentage: u8) {
    let _ = tx
        .send(ProgressEvent::Progress {
            message: message.to_string(),
            percentage,
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validate_content;

    #[tokio::test]
    async fn test_pipeline_without_llm_completes_via_fallback() {
        let pipeline = ResearchPipeline::new(None);
        let (tx, mut rx) = mpsc::channel(64);

        let content = pipeline
            .run("Office 365 migration for 100 mailboxes", tx)
            .await;

        validate_content(&content).expect("fallback content must validate");
        assert!(content.services.len() >= 10);
        assert!(!content.technology.is_empty());

        // Drain the events: every stage step must appear, ending in complete
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        for stage in ["parse", "research", "analyze", "generate"] {
            assert!(
                events.iter().any(|e| matches!(
                    e,
                    ProgressEvent::Step { id, status: StepStatus::Completed, .. } if id == stage
                )),
                "missing completed step for {}",
                stage
            );
        }
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Complete { .. })
        ));
        // Fallback content skips the format stage
        assert!(!events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Step { id, .. } if id == "format")));
    }

    #[tokio::test]
    async fn test_pipeline_survives_dropped_receiver() {
        let pipeline = ResearchPipeline::new(None);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let content = pipeline.run("Network refresh", tx).await;
        assert!(validate_content(&content).is_ok());
    }

    #[test]
    fn test_event_names_match_sse_contract() {
        let step = ProgressEvent::Step {
            id: "parse".to_string(),
            status: StepStatus::Active,
            percentage: 10,
        };
        assert_eq!(step.event_name(), "step");

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["percentage"], 10);
    }

    #[test]
    fn test_recover_sources_from_invalid_content() {
        let raw = r#"{"technology": "X", "sources": [
            {"url": "https://a.example", "title": "A", "relevance": "ref"},
            {"bad": true}
        ]}"#;
        let sources = recover_sources(raw);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "A");
    }
}
