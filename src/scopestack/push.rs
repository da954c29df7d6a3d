//! Push workflow: drive generated content into ScopeStack
//!
//! Sequence: current user → find-or-create client → create project →
//! survey (create, calculate, apply) → services → document → final details.
//! Partial success is preserved: once the project exists, later step
//! failures become entries in `warnings` rather than a failed response.

use serde::Serialize;
use serde_json::{json, Value};

use super::client::ScopeStackClient;
use super::types::{ClientRecord, DocumentRecord, ProjectDetails, ProjectRecord, SurveyRecord};
use super::ScopeStackError;
use crate::models::{GeneratedContent, QuestionType};
use crate::retry::{with_retry, NonRetryableError, RetryOptions};

/// Questionnaire tag the survey step looks for
const QUESTIONNAIRE_TAG: &str = "technology";

/// Caller-supplied options for a push
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub client_name: Option<String>,
    pub project_name: Option<String>,
    pub skip_survey: bool,
    pub skip_document: bool,
}

/// Result of a push, including steps that degraded into warnings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub project: ProjectRecord,
    pub client: ClientRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey: Option<SurveyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ProjectDetails>,
    pub warnings: Vec<String>,
    pub metadata: Value,
}

/// Push failure, classified for HTTP status mapping
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Request content failed local validation; no external call was made
    #[error("invalid content: {0}")]
    InvalidContent(String),
    /// Required configuration is missing; no external call was made
    #[error("missing configuration: {0}")]
    MissingConfig(String),
    /// ScopeStack rejected our credentials
    #[error("authentication failed: {0}")]
    Auth(String),
    /// ScopeStack rejected the payload
    #[error("validation failed: {0}")]
    Validation(String),
    /// Any other upstream failure
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl PushError {
    /// HTTP status this failure maps to
    pub fn http_status(&self) -> u16 {
        match self {
            PushError::InvalidContent(_) | PushError::MissingConfig(_) => 400,
            PushError::Auth(_) => 401,
            PushError::Validation(_) => 422,
            PushError::Upstream(_) => 502,
        }
    }
}

/// Wrap a ScopeStack failure for the retry layer. Auth and validation
/// failures will not change on a second attempt, so they carry the
/// non-retryable marker.
fn to_retry_error(err: ScopeStackError) -> anyhow::Error {
    if err.is_auth_error() || err.is_validation_error() {
        anyhow::Error::new(err).context(NonRetryableError::new("non-retryable ScopeStack failure"))
    } else {
        anyhow::Error::new(err)
    }
}

/// Classify an exhausted retry error back into a [`PushError`]
fn classify(err: anyhow::Error) -> PushError {
    for cause in err.chain() {
        if let Some(ss) = cause.downcast_ref::<ScopeStackError>() {
            if ss.is_auth_error() {
                return PushError::Auth(ss.to_string());
            }
            if ss.is_validation_error() {
                return PushError::Validation(ss.to_string());
            }
            return PushError::Upstream(ss.to_string());
        }
    }
    PushError::Upstream(err.to_string())
}

fn retry_opts(step: &'static str) -> RetryOptions {
    RetryOptions::new(3, 1000).with_on_retry(Box::new(move |attempt, err| {
        log::warn!("ScopeStack {} attempt {} failed: {}", step, attempt, err);
    }))
}

/// Default survey responses derived from the generated questions: the
/// flagged default option where one exists, otherwise a neutral value for
/// the question type.
pub fn default_survey_responses(content: &GeneratedContent) -> Value {
    let mut responses = serde_json::Map::new();
    for question in &content.questions {
        let value = match question.question_type {
            QuestionType::MultipleChoice => question
                .options
                .iter()
                .find(|o| o.default == Some(true))
                .or_else(|| question.options.first())
                .map(|o| o.value.clone())
                .unwrap_or(Value::Null),
            QuestionType::Number => json!(0),
            QuestionType::Boolean => json!(false),
            QuestionType::Text => json!(""),
        };
        responses.insert(question.slug.clone(), value);
    }
    Value::Object(responses)
}

/// Run the full push workflow.
///
/// Content is validated locally before any external call: an empty service
/// list is a 400-class failure with zero API traffic. After the project is
/// created, survey/services/document failures degrade into warnings.
pub async fn push_to_scopestack(
    client: &ScopeStackClient,
    content: &GeneratedContent,
    opts: &PushOptions,
) -> Result<PushOutcome, PushError> {
    if content.services.is_empty() {
        return Err(PushError::InvalidContent(
            "content must include at least one service".to_string(),
        ));
    }
    if content.technology.trim().is_empty() {
        return Err(PushError::InvalidContent(
            "content is missing a technology name".to_string(),
        ));
    }

    let mut warnings = Vec::new();

    // Identity and account resolution
    let user = with_retry(
        || async { client.get_current_user().await.map_err(to_retry_error) },
        retry_opts("get_current_user"),
    )
    .await
    .map_err(classify)?;
    log::info!(
        "Pushing to ScopeStack account '{}' as {}",
        user.account_slug,
        user.name
    );

    // Find or create the client record. Reusing an existing match is what
    // keeps re-runs from piling up duplicate clients.
    let client_name = opts
        .client_name
        .clone()
        .unwrap_or_else(|| format!("{} Client", content.technology));
    let existing = with_retry(
        || async {
            client
                .search_clients(&client_name)
                .await
                .map_err(to_retry_error)
        },
        retry_opts("search_clients"),
    )
    .await
    .map_err(classify)?;

    let client_record = match existing.into_iter().find(|c| c.name == client_name) {
        Some(found) => {
            log::info!("Reusing existing client '{}' ({})", found.name, found.id);
            found
        }
        None => with_retry(
            || async {
                client
                    .create_client(&client_name, &user.account_id)
                    .await
                    .map_err(to_retry_error)
            },
            retry_opts("create_client"),
        )
        .await
        .map_err(classify)?,
    };

    // Project creation. From here on, failures degrade into warnings.
    let project_name = opts
        .project_name
        .clone()
        .unwrap_or_else(|| format!("{} Implementation", content.technology));
    let executive_summary = format!(
        "Professional services scope for {}: {} services across {} total hours.",
        content.technology,
        content.services.len(),
        content.total_hours
    );
    let project = with_retry(
        || async {
            client
                .create_project(
                    &project_name,
                    &client_record.id,
                    &user.account_id,
                    &executive_summary,
                )
                .await
                .map_err(to_retry_error)
        },
        retry_opts("create_project"),
    )
    .await
    .map_err(classify)?;
    log::info!("Created project '{}' ({})", project.name, project.id);

    // Survey: create, calculate, apply. Best-effort.
    let survey = if opts.skip_survey {
        None
    } else {
        match run_survey_step(client, content, &project, &user.account_id).await {
            Ok(survey) => survey,
            Err(e) => {
                log::warn!("Survey step failed: {}", e);
                warnings.push(format!("survey step failed: {}", e));
                None
            }
        }
    };

    // Services
    match with_retry(
        || async {
            client
                .add_services_to_project(&project.id, &content.services)
                .await
                .map_err(to_retry_error)
        },
        retry_opts("add_services_to_project"),
    )
    .await
    {
        Ok(created) => {
            log::info!("Added {} services to project {}", created.len(), project.id);
        }
        Err(e) => {
            let e = classify(e);
            log::warn!("Adding services failed: {}", e);
            warnings.push(format!("adding services failed: {}", e));
        }
    }

    // Document generation
    let document = if opts.skip_document {
        None
    } else {
        match with_retry(
            || async {
                client
                    .create_project_document(&project.id)
                    .await
                    .map_err(to_retry_error)
            },
            retry_opts("create_project_document"),
        )
        .await
        {
            Ok(doc) => Some(doc),
            Err(e) => {
                let e = classify(e);
                log::warn!("Document generation failed: {}", e);
                warnings.push(format!("document generation failed: {}", e));
                None
            }
        }
    };

    // Final project state with pricing
    let details = match client.get_project_details(&project.id).await {
        Ok(details) => Some(details),
        Err(e) => {
            log::warn!("Fetching project details failed: {}", e);
            warnings.push(format!("fetching project details failed: {}", e));
            None
        }
    };

    let metadata = json!({
        "serviceCount": content.services.len(),
        "totalHours": content.total_hours,
        "technology": content.technology,
        "pushedAt": chrono::Utc::now().to_rfc3339(),
    });

    Ok(PushOutcome {
        project,
        client: client_record,
        survey,
        document,
        details,
        warnings,
        metadata,
    })
}

/// Create a survey from the first matching questionnaire, then calculate and
/// apply its recommendations. `Ok(None)` when no questionnaire is available.
async fn run_survey_step(
    client: &ScopeStackClient,
    content: &GeneratedContent,
    project: &ProjectRecord,
    account_id: &str,
) -> Result<Option<SurveyRecord>, PushError> {
    let questionnaires = with_retry(
        || async {
            client
                .get_questionnaires(Some(QUESTIONNAIRE_TAG))
                .await
                .map_err(to_retry_error)
        },
        retry_opts("get_questionnaires"),
    )
    .await
    .map_err(classify)?;

    let Some(questionnaire) = questionnaires.into_iter().next() else {
        log::info!("No questionnaire tagged '{}', skipping survey", QUESTIONNAIRE_TAG);
        return Ok(None);
    };

    let responses = default_survey_responses(content);
    let survey_name = format!("{} Discovery", content.technology);
    let survey = with_retry(
        || async {
            client
                .create_survey(
                    &project.id,
                    &questionnaire.id,
                    &survey_name,
                    responses.clone(),
                    account_id,
                )
                .await
                .map_err(to_retry_error)
        },
        retry_opts("create_survey"),
    )
    .await
    .map_err(classify)?;

    with_retry(
        || async {
            client
                .calculate_survey(&survey.id)
                .await
                .map_err(to_retry_error)
        },
        retry_opts("calculate_survey"),
    )
    .await
    .map_err(classify)?;

    let applied = with_retry(
        || async {
            client
                .apply_survey_recommendations(&survey.id)
                .await
                .map_err(to_retry_error)
        },
        retry_opts("apply_survey_recommendations"),
    )
    .await
    .map_err(classify)?;

    Ok(Some(applied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::static_fallback_content;

    #[tokio::test]
    async fn test_empty_services_rejected_without_api_calls() {
        // An unroutable URL: any network attempt would error differently
        // than the InvalidContent we expect.
        let client = ScopeStackClient::new("http://127.0.0.1:1", "acct", "token");
        let mut content = static_fallback_content("Test", None, &[]);
        content.services.clear();
        content.recompute_total_hours();

        let err = push_to_scopestack(&client, &content, &PushOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::InvalidContent(_)));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(PushError::InvalidContent("x".into()).http_status(), 400);
        assert_eq!(PushError::Auth("x".into()).http_status(), 401);
        assert_eq!(PushError::Validation("x".into()).http_status(), 422);
        assert_eq!(PushError::Upstream("x".into()).http_status(), 502);
    }

    #[test]
    fn test_classify_finds_scopestack_error_in_chain() {
        let err = to_retry_error(ScopeStackError::Api {
            status: 401,
            body: "bad token".to_string(),
        });
        assert!(matches!(classify(err), PushError::Auth(_)));

        let err = to_retry_error(ScopeStackError::Api {
            status: 422,
            body: "name required".to_string(),
        });
        assert!(matches!(classify(err), PushError::Validation(_)));

        let err = to_retry_error(ScopeStackError::Api {
            status: 500,
            body: "oops".to_string(),
        });
        assert!(matches!(classify(err), PushError::Upstream(_)));
    }

    #[test]
    fn test_default_survey_responses_prefer_flagged_defaults() {
        let content = static_fallback_content("Test", None, &[]);
        let responses = default_survey_responses(&content);
        // environment-complexity carries a default option of 1.0
        assert_eq!(responses["environment-complexity"], serde_json::json!(1.0));
        assert_eq!(responses["user-count"], serde_json::json!(0));
        assert_eq!(responses["existing-directory"], serde_json::json!(false));
    }
}
