//! Fallback scope generation
//!
//! The pipeline's termination guarantee. When the primary generation stage
//! produces output that cannot be repaired or fails validation, this module
//! first retries with a stricter, example-laden prompt (bounded attempts),
//! then falls through to a hard-coded catalog that always satisfies the
//! structural invariants. [`generate_fallback`] never fails.

use std::time::Duration;

use crate::llm::client::{CompletionOptions, LlmClient};
use crate::llm::prompts;
use crate::llm::sanitizer::parse_content;
use crate::models::{
    Calculation, GeneratedContent, Question, QuestionOption, QuestionType, ResultType, Service,
    Source, Subservice,
};

/// How many stricter-prompt LLM attempts to make before going fully static
pub const FALLBACK_LLM_ATTEMPTS: u32 = 2;

/// Timeout for each stricter-prompt attempt
const FALLBACK_LLM_TIMEOUT: Duration = Duration::from_secs(90);

/// Partial results recovered from earlier pipeline stages, fed into the
/// fallback so a degraded scope still reflects what was learned.
#[derive(Debug, Clone, Default)]
pub struct PartialResults {
    pub parsed_technology: Option<String>,
    pub research: Option<String>,
    pub analysis: Option<String>,
    pub dynamic_sources: Vec<Source>,
}

/// Produce a structurally valid scope, no matter what.
///
/// Tier 1: up to [`FALLBACK_LLM_ATTEMPTS`] LLM calls with the strict prompt,
/// each sanitized and validated. Tier 2: the static catalog. Every internal
/// failure degrades to the next tier.
pub async fn generate_fallback(
    llm: Option<&LlmClient>,
    input: &str,
    partial: &PartialResults,
) -> GeneratedContent {
    let technology = resolve_technology(input, partial.parsed_technology.as_deref());

    if let Some(client) = llm {
        let opts = CompletionOptions::default()
            .with_timeout(FALLBACK_LLM_TIMEOUT)
            .with_temperature(0.3);
        for attempt in 1..=FALLBACK_LLM_ATTEMPTS {
            let prompt = prompts::strict_generate_prompt(
                input,
                &technology,
                partial.research.as_deref(),
                partial.analysis.as_deref(),
            );
            match client.complete(&prompt, &opts).await {
                Ok(raw) => match parse_content(&raw) {
                    Ok(mut content) => {
                        log::info!(
                            "Fallback LLM attempt {} produced valid content",
                            attempt
                        );
                        content
                            .sources
                            .extend(partial.dynamic_sources.iter().cloned());
                        return content;
                    }
                    Err(e) => {
                        log::warn!("Fallback LLM attempt {} failed validation: {}", attempt, e);
                    }
                },
                Err(e) => {
                    log::warn!("Fallback LLM attempt {} failed: {}", attempt, e);
                }
            }
        }
    }

    log::info!("Using static fallback catalog for '{}'", technology);
    static_fallback_content(input, Some(&technology), &partial.dynamic_sources)
}

/// Pick a non-empty technology label from what the pipeline recovered
fn resolve_technology(input: &str, parsed: Option<&str>) -> String {
    if let Some(tech) = parsed {
        let tech = tech.trim();
        if !tech.is_empty() {
            return tech.to_string();
        }
    }
    let input = input.trim();
    if input.is_empty() {
        return "General Technology Implementation".to_string();
    }
    // First line of the request, capped, makes a serviceable label
    let first_line = input.lines().next().unwrap_or(input);
    let mut label: String = first_line.chars().take(60).collect();
    if first_line.chars().count() > 60 {
        label.push('…');
    }
    label
}

/// The fully static, always-valid scope catalog: 14 services across six
/// delivery phases, three subservices each.
pub fn static_fallback_content(
    input: &str,
    technology: Option<&str>,
    dynamic_sources: &[Source],
) -> GeneratedContent {
    let technology = resolve_technology(input, technology);

    let services: Vec<Service> = catalog_entries()
        .into_iter()
        .map(|entry| build_service(&technology, entry))
        .collect();
    let total_hours = services.iter().map(|s| s.hours).sum();

    let mut sources = static_sources();
    sources.extend(dynamic_sources.iter().cloned());

    GeneratedContent {
        technology: technology.clone(),
        questions: default_questions(),
        calculations: default_calculations(),
        services,
        total_hours,
        sources,
    }
}

/// One row of the static catalog: phase, name, description, hours, and the
/// three subservice names with their hour split.
struct CatalogEntry {
    phase: &'static str,
    name: &'static str,
    description: &'static str,
    hours: f64,
    subservices: [(&'static str, f64); 3],
}

fn catalog_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            phase: "Planning",
            name: "Project Kickoff & Governance",
            description: "Engagement initiation, stakeholder alignment, and delivery governance setup",
            hours: 24.0,
            subservices: [
                ("Kickoff workshop", 8.0),
                ("Project plan and RACI", 8.0),
                ("Governance and escalation model", 8.0),
            ],
        },
        CatalogEntry {
            phase: "Planning",
            name: "Requirements & Discovery",
            description: "Current-state assessment and requirements gathering workshops",
            hours: 32.0,
            subservices: [
                ("Current-state assessment", 12.0),
                ("Requirements workshops", 12.0),
                ("Success criteria definition", 8.0),
            ],
        },
        CatalogEntry {
            phase: "Planning",
            name: "Readiness Assessment",
            description: "Technical and organizational readiness evaluation",
            hours: 24.0,
            subservices: [
                ("Environment readiness review", 10.0),
                ("Dependency and licensing review", 8.0),
                ("Risk register creation", 6.0),
            ],
        },
        CatalogEntry {
            phase: "Design",
            name: "Solution Architecture",
            description: "Target-state architecture and design documentation",
            hours: 40.0,
            subservices: [
                ("Target architecture design", 16.0),
                ("Integration design", 12.0),
                ("Design review and sign-off", 12.0),
            ],
        },
        CatalogEntry {
            phase: "Design",
            name: "Security & Compliance Design",
            description: "Security controls, identity model, and compliance mapping",
            hours: 24.0,
            subservices: [
                ("Identity and access design", 10.0),
                ("Security baseline definition", 8.0),
                ("Compliance requirements mapping", 6.0),
            ],
        },
        CatalogEntry {
            phase: "Design",
            name: "Migration & Rollout Planning",
            description: "Wave planning, scheduling, and rollback strategy",
            hours: 24.0,
            subservices: [
                ("Wave and batch planning", 10.0),
                ("Cutover runbook", 8.0),
                ("Rollback strategy", 6.0),
            ],
        },
        CatalogEntry {
            phase: "Implementation",
            name: "Environment Build",
            description: "Core platform provisioning and baseline configuration",
            hours: 48.0,
            subservices: [
                ("Platform provisioning", 20.0),
                ("Baseline configuration", 16.0),
                ("Environment validation", 12.0),
            ],
        },
        CatalogEntry {
            phase: "Implementation",
            name: "Core Configuration & Integration",
            description: "Feature configuration and integration with existing systems",
            hours: 56.0,
            subservices: [
                ("Feature configuration", 24.0),
                ("Systems integration", 20.0),
                ("Integration validation", 12.0),
            ],
        },
        CatalogEntry {
            phase: "Implementation",
            name: "Data Migration Execution",
            description: "Migration tooling setup and wave execution",
            hours: 48.0,
            subservices: [
                ("Migration tooling setup", 16.0),
                ("Pilot wave execution", 16.0),
                ("Production wave execution", 16.0),
            ],
        },
        CatalogEntry {
            phase: "Testing",
            name: "System & Integration Testing",
            description: "Functional, integration, and performance test execution",
            hours: 40.0,
            subservices: [
                ("Test plan and cases", 12.0),
                ("Test execution", 18.0),
                ("Defect triage and resolution", 10.0),
            ],
        },
        CatalogEntry {
            phase: "Testing",
            name: "User Acceptance Testing Support",
            description: "UAT coordination, issue triage, and sign-off support",
            hours: 24.0,
            subservices: [
                ("UAT coordination", 10.0),
                ("Issue triage support", 8.0),
                ("Acceptance sign-off", 6.0),
            ],
        },
        CatalogEntry {
            phase: "Go-Live",
            name: "Cutover & Go-Live Execution",
            description: "Production cutover execution and go-live verification",
            hours: 32.0,
            subservices: [
                ("Cutover execution", 14.0),
                ("Go-live verification", 10.0),
                ("Command center support", 8.0),
            ],
        },
        CatalogEntry {
            phase: "Go-Live",
            name: "End-User Enablement",
            description: "Administrator and end-user training delivery",
            hours: 24.0,
            subservices: [
                ("Administrator training", 10.0),
                ("End-user training sessions", 8.0),
                ("Training materials handover", 6.0),
            ],
        },
        CatalogEntry {
            phase: "Support",
            name: "Hypercare & Transition",
            description: "Post-go-live hypercare and transition to steady-state operations",
            hours: 40.0,
            subservices: [
                ("Hypercare support", 20.0),
                ("Knowledge transfer", 12.0),
                ("Operations handover", 8.0),
            ],
        },
    ]
}

fn build_service(technology: &str, entry: CatalogEntry) -> Service {
    let subservices = entry
        .subservices
        .iter()
        .map(|(name, hours)| Subservice {
            name: name.to_string(),
            description: format!("{} for the {} engagement", name, technology),
            hours: *hours,
            service_description: format!(
                "Delivery of {} as part of {} for {}.",
                name.to_lowercase(),
                entry.name.to_lowercase(),
                technology
            ),
            key_assumptions: "Client stakeholders are available for scheduled sessions and \
                              required access is provisioned before work begins."
                .to_string(),
            client_responsibilities: "Provide timely access to systems, documentation, and \
                                      decision-makers."
                .to_string(),
            out_of_scope: "Work outside the agreed engagement boundaries, including custom \
                           development not listed in this scope."
                .to_string(),
            mapped_questions: Vec::new(),
            calculation_slug: None,
        })
        .collect();

    Service {
        phase: entry.phase.to_string(),
        name: entry.name.to_string(),
        description: entry.description.to_string(),
        hours: entry.hours,
        service_description: format!(
            "{} for the {} implementation: {}.",
            entry.name, technology, entry.description
        ),
        key_assumptions: format!(
            "The {} environment meets vendor minimum requirements and client resources \
             are available per the project plan.",
            technology
        ),
        client_responsibilities: "Assign a project sponsor, provide environment access, and \
                                  complete prerequisite tasks on schedule."
            .to_string(),
        out_of_scope: "Hardware procurement, third-party licensing costs, and remediation of \
                       issues unrelated to this engagement."
            .to_string(),
        subservices,
    }
}

fn default_questions() -> Vec<Question> {
    vec![
        Question {
            id: "q1".to_string(),
            slug: "user-count".to_string(),
            text: "How many users are in scope?".to_string(),
            question_type: QuestionType::Number,
            options: vec![],
        },
        Question {
            id: "q2".to_string(),
            slug: "site-count".to_string(),
            text: "How many physical sites are involved?".to_string(),
            question_type: QuestionType::Number,
            options: vec![],
        },
        Question {
            id: "q3".to_string(),
            slug: "environment-complexity".to_string(),
            text: "How would you describe the environment complexity?".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: vec![
                QuestionOption {
                    key: "Simple".to_string(),
                    value: serde_json::json!(1.0),
                    default: Some(true),
                },
                QuestionOption {
                    key: "Moderate".to_string(),
                    value: serde_json::json!(1.25),
                    default: None,
                },
                QuestionOption {
                    key: "Complex".to_string(),
                    value: serde_json::json!(1.5),
                    default: None,
                },
            ],
        },
        Question {
            id: "q4".to_string(),
            slug: "existing-directory".to_string(),
            text: "Is there an existing identity directory to integrate with?".to_string(),
            question_type: QuestionType::Boolean,
            options: vec![],
        },
    ]
}

fn default_calculations() -> Vec<Calculation> {
    vec![
        Calculation {
            id: "c1".to_string(),
            slug: "user-scaling".to_string(),
            name: "User count scaling".to_string(),
            formula: "user-count > 500 ? 1.5 : user-count > 100 ? 1.25 : 1.0".to_string(),
            mapped_questions: vec!["user-count".to_string()],
            result_type: ResultType::Multiplier,
        },
        Calculation {
            id: "c2".to_string(),
            slug: "site-overhead".to_string(),
            name: "Multi-site overhead".to_string(),
            formula: "site-count > 1 ? (site-count - 1) * 8 : 0".to_string(),
            mapped_questions: vec!["site-count".to_string()],
            result_type: ResultType::Additive,
        },
        Calculation {
            id: "c3".to_string(),
            slug: "complexity-factor".to_string(),
            name: "Environment complexity factor".to_string(),
            formula: "environment-complexity".to_string(),
            mapped_questions: vec!["environment-complexity".to_string()],
            result_type: ResultType::Multiplier,
        },
    ]
}

fn static_sources() -> Vec<Source> {
    vec![
        Source {
            url: "https://learn.microsoft.com/en-us/microsoft-365/enterprise/".to_string(),
            title: "Microsoft 365 enterprise documentation".to_string(),
            relevance: "Vendor implementation and migration guidance".to_string(),
        },
        Source {
            url: "https://www.pmi.org/pmbok-guide-standards".to_string(),
            title: "PMI project delivery standards".to_string(),
            relevance: "Industry-standard delivery phase structure".to_string(),
        },
        Source {
            url: "https://www.gartner.com/en/information-technology".to_string(),
            title: "Gartner IT implementation research".to_string(),
            relevance: "Effort benchmarks for enterprise technology rollouts".to_string(),
        },
        Source {
            url: "https://csrc.nist.gov/publications".to_string(),
            title: "NIST security publications".to_string(),
            relevance: "Security and compliance design baselines".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validate_content;

    #[test]
    fn test_static_catalog_is_structurally_valid() {
        let content = static_fallback_content("Office 365 migration for 100 mailboxes", None, &[]);
        validate_content(&content).expect("static fallback must always validate");
        assert_eq!(content.services.len(), 14);
        assert!(content.services.iter().all(|s| s.subservices.len() == 3));
        let sum: f64 = content.services.iter().map(|s| s.hours).sum();
        assert!((content.total_hours - sum).abs() < 0.01);
    }

    #[test]
    fn test_covers_six_phases() {
        let content = static_fallback_content("anything", None, &[]);
        let phases: std::collections::HashSet<_> =
            content.services.iter().map(|s| s.phase.as_str()).collect();
        for phase in [
            "Planning",
            "Design",
            "Implementation",
            "Testing",
            "Go-Live",
            "Support",
        ] {
            assert!(phases.contains(phase), "missing phase {}", phase);
        }
    }

    #[test]
    fn test_technology_resolution() {
        let content = static_fallback_content("", None, &[]);
        assert!(!content.technology.is_empty());

        let content = static_fallback_content("SD-WAN rollout", Some("Cisco SD-WAN"), &[]);
        assert_eq!(content.technology, "Cisco SD-WAN");

        let content = static_fallback_content("SD-WAN rollout", Some("  "), &[]);
        assert_eq!(content.technology, "SD-WAN rollout");
    }

    #[test]
    fn test_dynamic_sources_appended() {
        let dynamic = vec![Source {
            url: "https://example.com/sizing".to_string(),
            title: "Sizing guide".to_string(),
            relevance: "Recovered from a failed generation attempt".to_string(),
        }];
        let content = static_fallback_content("input", None, &dynamic);
        assert!(content.sources.iter().any(|s| s.title == "Sizing guide"));
        // Static sources still present
        assert!(content.sources.len() > dynamic.len());
    }

    #[tokio::test]
    async fn test_generate_fallback_without_llm_never_fails() {
        let content = generate_fallback(None, "Office 365 migration", &PartialResults::default())
            .await;
        validate_content(&content).expect("fallback without LLM must validate");
    }
}
