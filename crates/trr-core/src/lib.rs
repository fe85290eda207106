//! # trr-core
//!
//! The deterministic workflow engine for Technical Requirement Reviews (TRRs).
//!
//! A TRR passes through a readiness gate (DOR), a multi-stage, role-gated
//! approval pipeline (SDW), and a set of read-only progress and metric views.
//!
//! ## Architectural Constraints
//!
//! The engine:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Reads time only from an injected [`Clock`]
//! - Stores records only through an injected [`TrrRepository`]
//! - Uses integer scores everywhere except the approximated metrics view
//! - Leaves stored state untouched when an operation fails

// =============================================================================
// MODULES
// =============================================================================

pub mod assist;
pub mod clock;
pub mod dor;
pub mod engine;
pub mod metrics;
pub mod primitives;
pub mod repository;
pub mod risk;
pub mod sdw;
pub mod status;
pub mod storage;
pub mod types;
pub mod validation_stage;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Category, Complexity, ExtensionValue, NewTrr, Priority, RiskLevel, StatusEvent, TestCase,
    TestCaseStatus, Timestamp, Trr, TrrError, TrrId, TrrPatch, TrrStatus,
};

// =============================================================================
// RE-EXPORTS: Workflow Components
// =============================================================================

pub use assist::{
    AssistCapability, AssistContext, AssistField, AugmentationUnavailable, NoAssist,
    RuleBasedAssist, Suggestion, suggest_or_fallback,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use dor::{AugmentedOpinion, DorCriterion, DorEvaluator, DorReport, DorStatus};
pub use sdw::{
    ApprovalDecision, ApprovalRecord, ApprovalRequest, ApprovalStatus, SdwPipeline, SdwProgress,
    SdwRole, SdwStage, SdwStatus, StageCompletion,
};
pub use status::StatusMachine;

// =============================================================================
// RE-EXPORTS: Views
// =============================================================================

pub use metrics::{
    DetectionAlert, FinancialMetrics, OperationalMetrics, OutcomesFramework, PlaybookMetricsView,
    ScenarioResult, compute_metrics_view,
};
pub use risk::{RiskAssessment, RiskInputs, score_risk};
pub use validation_stage::{StageDefinition, ValidationStage, derive_stage};

// =============================================================================
// RE-EXPORTS: Storage & Engine
// =============================================================================

pub use engine::{StorageBackend, TransitionRequest, TrrEngine};
pub use repository::{InMemoryRepository, TrrFilter, TrrRepository};
pub use storage::RedbRepository;

/// Evaluate the Definition of Ready for `trr`.
#[must_use]
pub fn evaluate_dor(trr: &Trr) -> DorStatus {
    DorEvaluator::evaluate(trr)
}
