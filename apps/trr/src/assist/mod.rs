//! # Assist Integration
//!
//! Bridges the optional suggestion service into readiness evaluation and
//! field suggestions. A failed or slow service is logged and dropped; the
//! rule-based result is always returned.

mod client;

pub use client::AssistClient;

use trr_core::{
    AssistContext, AssistField, DorEvaluator, DorReport, RuleBasedAssist, Suggestion, Trr,
};

/// Readiness of `trr`, with the service's completeness opinion when available.
pub async fn assisted_dor(assist: Option<&AssistClient>, trr: &Trr) -> DorReport {
    let status = DorEvaluator::evaluate(trr);
    let Some(client) = assist else {
        return DorReport {
            status,
            augmented: None,
        };
    };

    let context = AssistContext::from_trr(trr);
    let outcome = client.suggest(AssistField::Completeness, &context).await;
    let (report, failure) = DorEvaluator::with_augmentation(status, outcome);
    if let Some(e) = failure {
        tracing::warn!(
            event = "assist_unavailable",
            trr = %trr.id,
            reason = %e.reason,
            "Assist unavailable, returning rule-based readiness only"
        );
    }
    report
}

/// Suggestion for `field`, falling back to the rule-based templates.
pub async fn suggest_field(
    assist: Option<&AssistClient>,
    field: AssistField,
    trr: &Trr,
) -> Suggestion {
    let context = AssistContext::from_trr(trr);
    if let Some(client) = assist {
        match client.suggest(field, &context).await {
            Ok(suggestion) => return suggestion,
            Err(e) => tracing::warn!(
                event = "assist_unavailable",
                trr = %trr.id,
                field = %field,
                reason = %e.reason,
                "Assist unavailable, using rule-based suggestion"
            ),
        }
    }
    RuleBasedAssist.suggest_for(field, &context)
}
