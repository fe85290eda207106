//! # Definition of Ready
//!
//! Readiness gate computed from field completeness. Five checks run in a
//! fixed order; the score is the met share scaled to 0-100.
//!
//! | # | Check | Met when |
//! |---|-------|----------|
//! | 1 | Title | non-blank |
//! | 2 | Description | at least `MIN_DESCRIPTION_LENGTH` trimmed characters |
//! | 3 | Assignee | non-blank |
//! | 4 | Expected outcome | non-blank |
//! | 5 | Acceptance criteria | at least one |
//!
//! The rule-based result is authoritative. An [`AssistCapability`] can add a
//! second opinion, which is reported next to it and never changes it.

use crate::assist::{
    AssistCapability, AssistContext, AssistField, AugmentationUnavailable, Suggestion,
};
use crate::primitives::{DOR_CHECK_COUNT, MIN_DESCRIPTION_LENGTH};
use crate::types::Trr;
use serde::{Deserialize, Serialize};

// =============================================================================
// CRITERIA
// =============================================================================

/// One readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DorCriterion {
    Title,
    Description,
    Assignee,
    ExpectedOutcome,
    AcceptanceCriteria,
}

impl DorCriterion {
    /// Checks in evaluation order.
    pub const ALL: [Self; DOR_CHECK_COUNT as usize] = [
        Self::Title,
        Self::Description,
        Self::Assignee,
        Self::ExpectedOutcome,
        Self::AcceptanceCriteria,
    ];

    /// Name reported in `unmet_criteria`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Title => "Title is required",
            Self::Description => "Description must be at least 20 characters",
            Self::Assignee => "Must be assigned to someone",
            Self::ExpectedOutcome => "Expected outcome is required",
            Self::AcceptanceCriteria => "At least one acceptance criterion is required",
        }
    }

    fn is_met(self, view: &ReadinessView<'_>) -> bool {
        match self {
            Self::Title => present(Some(view.title)),
            Self::Description => view.description.trim().chars().count() >= MIN_DESCRIPTION_LENGTH,
            Self::Assignee => present(view.assignee),
            Self::ExpectedOutcome => present(view.expected_outcome),
            Self::AcceptanceCriteria => !view.acceptance_criteria.is_empty(),
        }
    }
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// The fields the checks look at, borrowed from a record or an assist context.
struct ReadinessView<'a> {
    title: &'a str,
    description: &'a str,
    assignee: Option<&'a str>,
    expected_outcome: Option<&'a str>,
    acceptance_criteria: &'a [String],
}

impl<'a> From<&'a Trr> for ReadinessView<'a> {
    fn from(trr: &'a Trr) -> Self {
        Self {
            title: &trr.title,
            description: &trr.description,
            assignee: trr.assignee.as_deref(),
            expected_outcome: trr.expected_outcome.as_deref(),
            acceptance_criteria: &trr.acceptance_criteria,
        }
    }
}

impl<'a> From<&'a AssistContext> for ReadinessView<'a> {
    fn from(ctx: &'a AssistContext) -> Self {
        Self {
            title: &ctx.title,
            description: &ctx.description,
            assignee: ctx.assignee.as_deref(),
            expected_outcome: ctx.expected_outcome.as_deref(),
            acceptance_criteria: &ctx.acceptance_criteria,
        }
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Readiness gate result stored on every TRR.
///
/// `is_ready` holds exactly when `unmet_criteria` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DorStatus {
    pub is_ready: bool,
    pub unmet_criteria: Vec<String>,
    /// 0-100, always a multiple of `100 / DOR_CHECK_COUNT`.
    pub score: u8,
}

/// Second opinion from an assist capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentedOpinion {
    pub completeness: Option<u8>,
    pub missing: Vec<String>,
    pub rationale: String,
    pub source: String,
}

impl From<Suggestion> for AugmentedOpinion {
    fn from(s: Suggestion) -> Self {
        Self {
            completeness: s.score.map(|v| v.min(100)),
            missing: s.values,
            rationale: s.rationale,
            source: s.source,
        }
    }
}

/// Rule-based status plus the optional opinion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DorReport {
    pub status: DorStatus,
    pub augmented: Option<AugmentedOpinion>,
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Computes the readiness gate.
pub struct DorEvaluator;

impl DorEvaluator {
    /// Run all checks against `trr`.
    #[must_use]
    pub fn evaluate(trr: &Trr) -> DorStatus {
        let unmet = unmet_names(&ReadinessView::from(trr));
        DorStatus {
            is_ready: unmet.is_empty(),
            score: Self::score_for(unmet.len()),
            unmet_criteria: unmet,
        }
    }

    /// Unmet check names for an assist context.
    #[must_use]
    pub fn unmet_in_context(context: &AssistContext) -> Vec<String> {
        unmet_names(&ReadinessView::from(context))
    }

    /// Score for a given number of unmet checks.
    #[must_use]
    pub fn score_for(unmet: usize) -> u8 {
        let total = usize::from(DOR_CHECK_COUNT);
        let met = total.saturating_sub(unmet);
        (met * 100 / total) as u8
    }

    /// Evaluate and ask `assist` for a completeness opinion.
    ///
    /// Returns the report plus the assist failure, if any. The failure never
    /// affects `report.status`.
    pub fn evaluate_assisted(
        trr: &Trr,
        assist: &dyn AssistCapability,
    ) -> (DorReport, Option<AugmentationUnavailable>) {
        let outcome = assist.suggest(AssistField::Completeness, &AssistContext::from_trr(trr));
        Self::with_augmentation(Self::evaluate(trr), outcome)
    }

    /// Merge a rule-based status with an assist outcome obtained elsewhere
    /// (for example, asynchronously by the app layer).
    pub fn with_augmentation(
        status: DorStatus,
        outcome: Result<Suggestion, AugmentationUnavailable>,
    ) -> (DorReport, Option<AugmentationUnavailable>) {
        match outcome {
            Ok(suggestion) => (
                DorReport {
                    status,
                    augmented: Some(suggestion.into()),
                },
                None,
            ),
            Err(e) => (
                DorReport {
                    status,
                    augmented: None,
                },
                Some(e),
            ),
        }
    }
}

fn unmet_names(view: &ReadinessView<'_>) -> Vec<String> {
    DorCriterion::ALL
        .into_iter()
        .filter(|c| !c.is_met(view))
        .map(|c| c.name().to_string())
        .collect()
}
