//! Generated scope content data model
//!
//! These types mirror the JSON shape exchanged with the browser UI and with
//! ScopeStack: camelCase on the wire, snake_case in Rust. Structural rules that
//! cannot be expressed in the type system (minimum service count, exact
//! subservice count, hour totals) live in [`validate_content`].

use serde::{Deserialize, Serialize};

/// Minimum number of services a valid scope must carry
pub const MIN_SERVICES: usize = 10;

/// Exact number of subservices each service must carry
pub const SUBSERVICES_PER_SERVICE: usize = 3;

/// The canonical output of the generation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    /// Technology this scope covers (e.g., "Microsoft Office 365 Migration")
    pub technology: String,
    /// Discovery questions presented to the end customer
    pub questions: Vec<Question>,
    /// Hour calculations driven by question responses
    pub calculations: Vec<Calculation>,
    /// Billable services with subservices
    pub services: Vec<Service>,
    /// Sum of all service hours
    pub total_hours: f64,
    /// Research sources backing the scope
    pub sources: Vec<Source>,
}

impl GeneratedContent {
    /// Recompute `total_hours` from the current service list
    pub fn recompute_total_hours(&mut self) {
        self.total_hours = self.services.iter().map(|s| s.hours).sum();
    }
}

/// Question type presented to the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Number,
    Boolean,
    Text,
}

/// One selectable option of a multiple-choice question
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}

/// A discovery question
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    /// Unique kebab-case key, referenced by calculations and subservice mappings
    pub slug: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

/// How a calculation result is applied to service hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Multiplier,
    Additive,
    Conditional,
}

/// An hour calculation referencing question slugs in its formula
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    pub id: String,
    pub slug: String,
    pub name: String,
    /// Ternary/arithmetic expression over question slugs, evaluated by ScopeStack
    pub formula: String,
    #[serde(default)]
    pub mapped_questions: Vec<String>,
    pub result_type: ResultType,
}

/// A billable service line item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub phase: String,
    pub name: String,
    pub description: String,
    pub hours: f64,
    pub service_description: String,
    pub key_assumptions: String,
    pub client_responsibilities: String,
    pub out_of_scope: String,
    #[serde(default)]
    pub subservices: Vec<Subservice>,
}

/// A sub-line-item of a service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subservice {
    pub name: String,
    pub description: String,
    pub hours: f64,
    pub service_description: String,
    pub key_assumptions: String,
    pub client_responsibilities: String,
    pub out_of_scope: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mapped_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_slug: Option<String>,
}

/// A research source backing the generated scope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub url: String,
    pub title: String,
    pub relevance: String,
}

/// Why a piece of generated content failed structural validation
#[derive(Debug, Clone)]
pub struct ContentValidationError {
    pub reasons: Vec<String>,
}

impl std::fmt::Display for ContentValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "content validation failed: {}", self.reasons.join("; "))
    }
}

impl std::error::Error for ContentValidationError {}

/// Validate the structural invariants of generated content.
///
/// Checks everything the types cannot: minimum service count, exact
/// subservice count, positive hours, populated narrative fields, and the
/// hours total. Collects all reasons rather than stopping at the first.
pub fn validate_content(content: &GeneratedContent) -> Result<(), ContentValidationError> {
    let mut reasons = Vec::new();

    if content.technology.trim().is_empty() {
        reasons.push("technology is empty".to_string());
    }

    if content.services.len() < MIN_SERVICES {
        reasons.push(format!(
            "expected at least {} services, got {}",
            MIN_SERVICES,
            content.services.len()
        ));
    }

    for (i, service) in content.services.iter().enumerate() {
        if service.name.trim().is_empty() {
            reasons.push(format!("service {} has an empty name", i));
        }
        if service.hours <= 0.0 {
            reasons.push(format!(
                "service '{}' has non-positive hours ({})",
                service.name, service.hours
            ));
        }
        if service.subservices.len() != SUBSERVICES_PER_SERVICE {
            reasons.push(format!(
                "service '{}' has {} subservices, expected {}",
                service.name,
                service.subservices.len(),
                SUBSERVICES_PER_SERVICE
            ));
        }
        for narrative in [
            &service.service_description,
            &service.key_assumptions,
            &service.client_responsibilities,
            &service.out_of_scope,
        ] {
            if narrative.trim().is_empty() {
                reasons.push(format!(
                    "service '{}' has an empty narrative field",
                    service.name
                ));
                break;
            }
        }
    }

    let computed: f64 = content.services.iter().map(|s| s.hours).sum();
    if (computed - content.total_hours).abs() > 0.01 {
        reasons.push(format!(
            "totalHours is {} but service hours sum to {}",
            content.total_hours, computed
        ));
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(ContentValidationError { reasons })
    }
}
