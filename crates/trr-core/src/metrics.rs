//! # Playbook Metrics View
//!
//! Read-only aggregation of an outcomes framework record and scenario results.
//! The view is computed on demand, never persisted, and never writes back to
//! either source.
//!
//! Each metric is present only when its source datum is present. Two derived
//! figures are heuristics and must be labelled as approximations wherever they
//! are shown:
//!
//! - `alert_grouping_ratio`: mean detection alerts per scenario that reports
//!   alert data.
//! - `coverage_estimate`: assumes each scenario with detections covers about
//!   17.5 of roughly 200 commonly used ATT&CK techniques.
//!
//! This is the one module allowed to use floating point.

use serde::{Deserialize, Serialize};

/// Assumed techniques exercised by one scenario with detections.
pub const TECHNIQUES_PER_SCENARIO: f64 = 17.5;

/// Approximate number of ATT&CK techniques in common use.
pub const COMMON_TECHNIQUE_COUNT: f64 = 200.0;

// =============================================================================
// SOURCES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationalMetrics {
    pub automation_rate: Option<f64>,
    pub mttr: Option<f64>,
    pub mttd: Option<f64>,
    pub threat_detection_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialMetrics {
    pub tool_consolidation: Option<u32>,
    pub estimated_cost_savings: Option<f64>,
}

/// Business outcomes agreed for an engagement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomesFramework {
    pub operational: OperationalMetrics,
    pub financial: FinancialMetrics,
}

/// A detection raised while running a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionAlert {
    pub id: String,
    pub technique: Option<String>,
    pub severity: Option<String>,
}

/// Result of one deployed scenario. `detection_alerts` is `None` when the
/// scenario reported no alert data at all, which differs from an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub status: String,
    pub detection_alerts: Option<Vec<DetectionAlert>>,
}

// =============================================================================
// VIEW
// =============================================================================

/// Computed metrics. Absent metrics are omitted from serialized output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybookMetricsView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mttr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mttd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_consolidation: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_savings: Option<f64>,
    /// Approximation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_grouping_ratio: Option<f64>,
    /// Approximation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_estimate: Option<f64>,
}

impl PlaybookMetricsView {
    /// Names of the metrics that are present, in field order.
    #[must_use]
    pub fn present(&self) -> Vec<&'static str> {
        [
            ("automation_rate", self.automation_rate.is_some()),
            ("mttr", self.mttr.is_some()),
            ("mttd", self.mttd.is_some()),
            ("detection_accuracy", self.detection_accuracy.is_some()),
            ("tool_consolidation", self.tool_consolidation.is_some()),
            ("cost_savings", self.cost_savings.is_some()),
            ("alert_grouping_ratio", self.alert_grouping_ratio.is_some()),
            ("coverage_estimate", self.coverage_estimate.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }
}

/// Build the metrics view. Pure; reads both sources, writes neither.
#[must_use]
pub fn compute_metrics_view(
    framework: &OutcomesFramework,
    scenarios: &[ScenarioResult],
) -> PlaybookMetricsView {
    let ops = &framework.operational;
    let fin = &framework.financial;
    PlaybookMetricsView {
        automation_rate: ops.automation_rate,
        mttr: ops.mttr,
        mttd: ops.mttd,
        detection_accuracy: ops.threat_detection_accuracy,
        tool_consolidation: fin.tool_consolidation,
        cost_savings: fin.estimated_cost_savings,
        alert_grouping_ratio: alert_grouping_ratio(scenarios),
        coverage_estimate: coverage_estimate(scenarios),
    }
}

/// Total alerts divided by the number of scenarios carrying alert data.
///
/// `None` when no scenario carries alert data or the total is zero.
#[must_use]
#[allow(clippy::float_arithmetic)]
pub fn alert_grouping_ratio(scenarios: &[ScenarioResult]) -> Option<f64> {
    let with_data: Vec<&Vec<DetectionAlert>> = scenarios
        .iter()
        .filter_map(|s| s.detection_alerts.as_ref())
        .collect();
    if with_data.is_empty() {
        return None;
    }
    let total: usize = with_data.iter().map(|alerts| alerts.len()).sum();
    if total == 0 {
        return None;
    }
    Some(total as f64 / with_data.len() as f64)
}

/// Estimated ATT&CK coverage in percent, capped at 100.
///
/// `None` when no scenario has at least one detection.
#[must_use]
#[allow(clippy::float_arithmetic)]
pub fn coverage_estimate(scenarios: &[ScenarioResult]) -> Option<f64> {
    let with_detections = scenarios
        .iter()
        .filter(|s| s.detection_alerts.as_ref().is_some_and(|a| !a.is_empty()))
        .count();
    if with_detections == 0 {
        return None;
    }
    let techniques = with_detections as f64 * TECHNIQUES_PER_SCENARIO;
    Some((techniques / COMMON_TECHNIQUE_COUNT * 100.0).min(100.0))
}
