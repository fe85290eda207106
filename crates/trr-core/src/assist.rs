//! # Assist Capability
//!
//! Optional, best-effort suggestion source (usually an AI service reached by
//! the app layer). The engine never depends on it being present:
//!
//! - [`AssistCapability`] is the seam. Implementations may fail with
//!   [`AugmentationUnavailable`] for any reason.
//! - [`NoAssist`] is the disabled capability.
//! - [`RuleBasedAssist`] is the deterministic fallback used whenever the
//!   capability cannot answer.

use crate::dor::DorEvaluator;
use crate::types::{Category, Trr, TrrError, TrrId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// What the caller wants a suggestion for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistField {
    Title,
    Description,
    ExpectedOutcome,
    AcceptanceCriteria,
    TestCases,
    /// A completeness opinion on the whole record.
    Completeness,
}

impl AssistField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::ExpectedOutcome => "expected_outcome",
            Self::AcceptanceCriteria => "acceptance_criteria",
            Self::TestCases => "test_cases",
            Self::Completeness => "completeness",
        }
    }
}

impl fmt::Display for AssistField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of the public TRR fields handed to a capability.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssistContext {
    pub trr_id: Option<TrrId>,
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub customer: Option<String>,
    pub assignee: Option<String>,
    pub expected_outcome: Option<String>,
    pub acceptance_criteria: Vec<String>,
}

impl AssistContext {
    #[must_use]
    pub fn from_trr(trr: &Trr) -> Self {
        Self {
            trr_id: Some(trr.id),
            title: trr.title.clone(),
            description: trr.description.clone(),
            category: trr.category,
            customer: trr.customer.clone(),
            assignee: trr.assignee.clone(),
            expected_outcome: trr.expected_outcome.clone(),
            acceptance_criteria: trr.acceptance_criteria.clone(),
        }
    }
}

/// A suggestion returned by a capability.
///
/// `values` holds the suggested text(s); for a completeness opinion it holds
/// the items the capability considers missing. `score` is a 0-100 confidence
/// or completeness figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub field: AssistField,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub rationale: String,
    /// Where the suggestion came from (model name, or `rule-based`).
    #[serde(default)]
    pub source: String,
}

/// The capability could not produce a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("assist unavailable: {reason}")]
pub struct AugmentationUnavailable {
    pub reason: String,
}

impl AugmentationUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<AugmentationUnavailable> for TrrError {
    fn from(e: AugmentationUnavailable) -> Self {
        Self::AugmentationUnavailable(e.reason)
    }
}

// =============================================================================
// CAPABILITY
// =============================================================================

/// A source of field suggestions.
pub trait AssistCapability: Send + Sync {
    fn suggest(
        &self,
        field: AssistField,
        context: &AssistContext,
    ) -> Result<Suggestion, AugmentationUnavailable>;
}

/// The disabled capability: always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssist;

impl AssistCapability for NoAssist {
    fn suggest(
        &self,
        _field: AssistField,
        _context: &AssistContext,
    ) -> Result<Suggestion, AugmentationUnavailable> {
        Err(AugmentationUnavailable::new("assist is disabled"))
    }
}

/// Deterministic template suggestions. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAssist;

/// Source label on every rule-based suggestion.
pub const RULE_BASED_SOURCE: &str = "rule-based";

impl RuleBasedAssist {
    /// Same as [`AssistCapability::suggest`], without the `Result`.
    #[must_use]
    pub fn suggest_for(&self, field: AssistField, context: &AssistContext) -> Suggestion {
        let subject = subject_of(context);
        let (values, score, rationale) = match field {
            AssistField::Title => (
                vec![format!("{} Validation", capitalize(&subject))],
                None,
                "Derived from the category".to_string(),
            ),
            AssistField::Description => (
                vec![format!(
                    "Validate {subject} requirements{} against the agreed acceptance criteria.",
                    context
                        .customer
                        .as_deref()
                        .map(|c| format!(" for {c}"))
                        .unwrap_or_default()
                )],
                None,
                "Template description".to_string(),
            ),
            AssistField::ExpectedOutcome => (
                vec![format!(
                    "All {subject} acceptance criteria are demonstrated and signed off."
                )],
                None,
                "Template outcome".to_string(),
            ),
            AssistField::AcceptanceCriteria => (
                criteria_template(context.category),
                None,
                "Category template".to_string(),
            ),
            AssistField::TestCases => (
                context
                    .acceptance_criteria
                    .iter()
                    .map(|c| format!("Verify: {c}"))
                    .collect(),
                None,
                "One test case per acceptance criterion".to_string(),
            ),
            AssistField::Completeness => {
                let missing = DorEvaluator::unmet_in_context(context);
                let score = DorEvaluator::score_for(missing.len());
                (missing, Some(score), "Readiness checks on visible fields".to_string())
            }
        };
        Suggestion {
            field,
            values,
            score,
            rationale,
            source: RULE_BASED_SOURCE.to_string(),
        }
    }
}

impl AssistCapability for RuleBasedAssist {
    fn suggest(
        &self,
        field: AssistField,
        context: &AssistContext,
    ) -> Result<Suggestion, AugmentationUnavailable> {
        Ok(self.suggest_for(field, context))
    }
}

/// Ask `assist`, falling back to [`RuleBasedAssist`] when it is unavailable.
///
/// Returns the suggestion plus the failure, if any, so the caller can log it.
pub fn suggest_or_fallback(
    assist: &dyn AssistCapability,
    field: AssistField,
    context: &AssistContext,
) -> (Suggestion, Option<AugmentationUnavailable>) {
    match assist.suggest(field, context) {
        Ok(suggestion) => (suggestion, None),
        Err(e) => (RuleBasedAssist.suggest_for(field, context), Some(e)),
    }
}

fn subject_of(context: &AssistContext) -> String {
    context
        .category
        .map_or_else(|| "technical".to_string(), |c| c.as_str().to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn criteria_template(category: Option<Category>) -> Vec<String> {
    let specific = match category {
        Some(Category::Security) => "No critical or high findings remain open",
        Some(Category::Performance) => "Latency and throughput targets are met under load",
        Some(Category::Compliance) => "Required controls are evidenced for the audit scope",
        Some(Category::Integration) => "Data flows end to end between the integrated systems",
        Some(Category::Usability) => "Target users complete the key tasks unaided",
        Some(Category::Scalability) => "The system scales to the projected peak volume",
        Some(Category::Reliability) => "Failover completes within the agreed recovery objective",
        None => "The stated requirement is demonstrated in the target environment",
    };
    vec![
        specific.to_string(),
        "Results are documented and reviewed by the customer".to_string(),
    ]
}
