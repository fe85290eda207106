//! # Core Type Definitions
//!
//! This module contains the record types of the TRR workflow engine:
//! - Identifiers and time (`TrrId`, `Timestamp`)
//! - Lifecycle and classification enums (`TrrStatus`, `Priority`, `RiskLevel`, ...)
//! - The TRR record itself (`Trr`) and its append-only `StatusEvent` log
//! - Creation and update payloads (`NewTrr`, `TrrPatch`)
//! - Error types (`TrrError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Use `BTreeMap`/`BTreeSet` for deterministic ordering
//! - Use saturating arithmetic for counters to prevent overflow
//!
//! Persisted types are postcard-encoded, so they avoid untagged enums and
//! skipped fields.

use crate::dor::{DorEvaluator, DorStatus};
use crate::primitives::{
    MAX_ACCEPTANCE_CRITERIA, MAX_ACTOR_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_EXTENSION_KEY_LENGTH,
    MAX_EXTENSIONS, MAX_NOTE_LENGTH, MAX_TAG_LENGTH, MAX_TAGS, MAX_TEST_CASES,
    MAX_TEXT_FIELD_LENGTH, MAX_TITLE_LENGTH, MILLIS_PER_DAY,
};
use crate::risk::{RiskInputs, score_risk};
use crate::sdw::{SdwRole, SdwStage, SdwStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS & TIME
// =============================================================================

/// Unique identifier of a TRR within one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrrId(pub u64);

impl fmt::Display for TrrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRR-{}", self.0)
    }
}

/// Milliseconds since the Unix epoch.
///
/// Always supplied by a [`Clock`](crate::clock::Clock); the engine never reads
/// the system time directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Whole days since the Unix epoch.
    #[must_use]
    pub const fn epoch_day(self) -> u32 {
        let days = self.0 / MILLIS_PER_DAY;
        if days > u32::MAX as u64 {
            u32::MAX
        } else {
            days as u32
        }
    }
}

// =============================================================================
// LIFECYCLE STATUS
// =============================================================================

/// Lifecycle state of a TRR. Transition rules live in [`crate::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrrStatus {
    Draft,
    Pending,
    InProgress,
    InReview,
    Validated,
    Approved,
    Completed,
    Failed,
    Rejected,
    Deferred,
    NotApplicable,
}

impl TrrStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 11] = [
        Self::Draft,
        Self::Pending,
        Self::InProgress,
        Self::InReview,
        Self::Validated,
        Self::Approved,
        Self::Completed,
        Self::Failed,
        Self::Rejected,
        Self::Deferred,
        Self::NotApplicable,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::InReview => "in-review",
            Self::Validated => "validated",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Deferred => "deferred",
            Self::NotApplicable => "not-applicable",
        }
    }
}

impl fmt::Display for TrrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrrStatus {
    type Err = TrrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| TrrError::validation("status", format!("unknown status '{s}'")))
    }
}

// =============================================================================
// CLASSIFICATION ENUMS
// =============================================================================

/// Generates `as_str`, `Display` and a case-insensitive `FromStr` for a
/// kebab-case enum.
macro_rules! labelled_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = TrrError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        TrrError::validation($field, format!("unknown {} '{}'", $field, s))
                    })
            }
        }
    };
}

/// Business priority of a TRR.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

labelled_enum!(Priority, "priority", {
    Critical => "critical",
    High => "high",
    Medium => "medium",
    Low => "low",
});

/// Risk level, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

labelled_enum!(RiskLevel, "risk_level", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

/// Area of technical validation the TRR belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Security,
    Performance,
    Compliance,
    Integration,
    Usability,
    Scalability,
    Reliability,
}

labelled_enum!(Category, "category", {
    Security => "security",
    Performance => "performance",
    Compliance => "compliance",
    Integration => "integration",
    Usability => "usability",
    Scalability => "scalability",
    Reliability => "reliability",
});

/// Implementation complexity estimate. Feeds the risk scorer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
    VeryComplex,
}

labelled_enum!(Complexity, "complexity", {
    Simple => "simple",
    Moderate => "moderate",
    Complex => "complex",
    VeryComplex => "very-complex",
});

/// Execution state of a single test case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum TestCaseStatus {
    #[default]
    NotStarted,
    InProgress,
    Passed,
    Failed,
    Blocked,
    Skipped,
}

labelled_enum!(TestCaseStatus, "test_case_status", {
    NotStarted => "not-started",
    InProgress => "in-progress",
    Passed => "passed",
    Failed => "failed",
    Blocked => "blocked",
    Skipped => "skipped",
});

// =============================================================================
// RECORD COMPONENTS
// =============================================================================

/// A test case attached to a TRR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default)]
    pub status: TestCaseStatus,
}

/// Typed value in the open extension map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    List(Vec<String>),
}

/// One entry in a TRR's status history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: TrrStatus,
    pub timestamp: Timestamp,
    pub author_id: String,
    pub note: Option<String>,
}

// =============================================================================
// TRR RECORD
// =============================================================================

/// A Technical Requirement Review.
///
/// Descriptive fields are public. Workflow state (status, history, version,
/// readiness, approvals, archival) is only changed through the engine's
/// operations so that its invariants hold:
/// - `status_history` only grows
/// - `version` increases by exactly 1 per successful mutation
/// - `dor_status` always reflects the current fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trr {
    pub id: TrrId,
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub priority: Priority,
    pub risk_level: RiskLevel,
    pub business_impact: String,
    pub assignee: Option<String>,
    pub expected_outcome: Option<String>,
    pub customer: Option<String>,
    pub complexity: Complexity,
    /// Due date as days since the Unix epoch.
    pub due_date: Option<u32>,
    pub acceptance_criteria: Vec<String>,
    pub test_cases: Vec<TestCase>,
    pub dependencies: BTreeSet<TrrId>,
    pub tags: BTreeSet<String>,
    pub extensions: BTreeMap<String, ExtensionValue>,
    pub(crate) status: TrrStatus,
    pub(crate) version: u64,
    pub(crate) status_history: Vec<StatusEvent>,
    pub(crate) dor_status: DorStatus,
    pub(crate) sdw_status: SdwStatus,
    pub(crate) archived: bool,
    pub(crate) created_at: Timestamp,
    pub(crate) updated_at: Timestamp,
}

impl Trr {
    /// Build a fresh draft: version 1, one initial status event, DOR evaluated,
    /// all approvals pending.
    ///
    /// When `fields.risk_level` is absent the level is scored from the
    /// complexity, deadline, and priority.
    #[must_use]
    pub fn draft(id: TrrId, fields: NewTrr, author: &str, at: Timestamp) -> Self {
        let explicit_risk = fields.risk_level;
        let mut trr = Self {
            id,
            title: fields.title,
            description: fields.description,
            category: fields.category,
            priority: fields.priority,
            risk_level: RiskLevel::default(),
            business_impact: fields.business_impact,
            assignee: fields.assignee,
            expected_outcome: fields.expected_outcome,
            customer: fields.customer,
            complexity: fields.complexity,
            due_date: fields.due_date,
            acceptance_criteria: fields.acceptance_criteria,
            test_cases: fields.test_cases,
            dependencies: fields.dependencies,
            tags: fields.tags,
            extensions: fields.extensions,
            status: TrrStatus::Draft,
            version: 1,
            status_history: vec![StatusEvent {
                status: TrrStatus::Draft,
                timestamp: at,
                author_id: author.to_string(),
                note: None,
            }],
            dor_status: DorStatus::default(),
            sdw_status: SdwStatus::new(),
            archived: false,
            created_at: at,
            updated_at: at,
        };
        trr.risk_level =
            explicit_risk.unwrap_or_else(|| score_risk(&RiskInputs::for_trr(&trr, at)).level);
        trr.refresh_dor();
        trr
    }

    #[must_use]
    pub const fn status(&self) -> TrrStatus {
        self.status
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn status_history(&self) -> &[StatusEvent] {
        &self.status_history
    }

    #[must_use]
    pub const fn dor_status(&self) -> &DorStatus {
        &self.dor_status
    }

    #[must_use]
    pub const fn sdw_status(&self) -> &SdwStatus {
        &self.sdw_status
    }

    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived
    }

    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Record one successful mutation: bump the version and touch `updated_at`.
    pub(crate) fn record_mutation(&mut self, at: Timestamp) {
        self.version = self.version.saturating_add(1);
        self.updated_at = at;
    }

    /// Recompute the readiness gate from the current fields.
    pub(crate) fn refresh_dor(&mut self) {
        self.dor_status = DorEvaluator::evaluate(self);
    }

    /// Logically delete the record. History and approvals are kept.
    pub(crate) fn archive(&mut self, at: Timestamp) {
        self.archived = true;
        self.record_mutation(at);
    }
}

// =============================================================================
// CREATE / UPDATE PAYLOADS
// =============================================================================

/// Fields supplied when creating a TRR.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTrr {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub priority: Priority,
    /// Explicit risk level. Scored automatically when absent.
    pub risk_level: Option<RiskLevel>,
    pub business_impact: String,
    pub assignee: Option<String>,
    pub expected_outcome: Option<String>,
    pub customer: Option<String>,
    pub complexity: Complexity,
    pub due_date: Option<u32>,
    pub acceptance_criteria: Vec<String>,
    pub test_cases: Vec<TestCase>,
    pub dependencies: BTreeSet<TrrId>,
    pub tags: BTreeSet<String>,
    pub extensions: BTreeMap<String, ExtensionValue>,
}

impl NewTrr {
    /// Shorthand for a payload carrying only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validate the payload. The title is the only required field; everything
    /// else is bounded.
    pub fn validate(&self) -> Result<(), TrrError> {
        require_text("title", &self.title, MAX_TITLE_LENGTH)?;
        bound_text("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        bound_text("business_impact", &self.business_impact, MAX_TEXT_FIELD_LENGTH)?;
        bound_optional("assignee", self.assignee.as_deref(), MAX_ACTOR_LENGTH)?;
        bound_optional(
            "expected_outcome",
            self.expected_outcome.as_deref(),
            MAX_TEXT_FIELD_LENGTH,
        )?;
        bound_optional("customer", self.customer.as_deref(), MAX_TEXT_FIELD_LENGTH)?;
        validate_criteria(&self.acceptance_criteria)?;
        validate_test_cases(&self.test_cases)?;
        validate_tags(&self.tags)?;
        validate_extensions(&self.extensions)
    }
}

/// Partial update of a TRR's descriptive fields.
///
/// Absent fields are left untouched. For optional text fields a blank string
/// clears the value; `clear_due_date` removes the due date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrrPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub risk_level: Option<RiskLevel>,
    pub business_impact: Option<String>,
    pub assignee: Option<String>,
    pub expected_outcome: Option<String>,
    pub customer: Option<String>,
    pub complexity: Option<Complexity>,
    pub due_date: Option<u32>,
    pub clear_due_date: bool,
    pub acceptance_criteria: Option<Vec<String>>,
    pub test_cases: Option<Vec<TestCase>>,
    pub dependencies: Option<BTreeSet<TrrId>>,
    pub tags: Option<BTreeSet<String>>,
    pub extensions: Option<BTreeMap<String, ExtensionValue>>,
}

impl TrrPatch {
    /// True when the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validate every field the patch carries.
    pub fn validate(&self) -> Result<(), TrrError> {
        if self.is_empty() {
            return Err(TrrError::validation("patch", "no fields to update"));
        }
        if self.due_date.is_some() && self.clear_due_date {
            return Err(TrrError::validation(
                "due_date",
                "cannot set and clear the due date in one update",
            ));
        }
        if let Some(title) = &self.title {
            require_text("title", title, MAX_TITLE_LENGTH)?;
        }
        if let Some(description) = &self.description {
            bound_text("description", description, MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(impact) = &self.business_impact {
            bound_text("business_impact", impact, MAX_TEXT_FIELD_LENGTH)?;
        }
        bound_optional("assignee", self.assignee.as_deref(), MAX_ACTOR_LENGTH)?;
        bound_optional(
            "expected_outcome",
            self.expected_outcome.as_deref(),
            MAX_TEXT_FIELD_LENGTH,
        )?;
        bound_optional("customer", self.customer.as_deref(), MAX_TEXT_FIELD_LENGTH)?;
        if let Some(criteria) = &self.acceptance_criteria {
            validate_criteria(criteria)?;
        }
        if let Some(cases) = &self.test_cases {
            validate_test_cases(cases)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        if let Some(extensions) = &self.extensions {
            validate_extensions(extensions)?;
        }
        Ok(())
    }

    /// Write the patch into `trr`. Call [`TrrPatch::validate`] first.
    pub(crate) fn apply(self, trr: &mut Trr) {
        if let Some(title) = self.title {
            trr.title = title;
        }
        if let Some(description) = self.description {
            trr.description = description;
        }
        if let Some(category) = self.category {
            trr.category = Some(category);
        }
        if let Some(priority) = self.priority {
            trr.priority = priority;
        }
        if let Some(risk_level) = self.risk_level {
            trr.risk_level = risk_level;
        }
        if let Some(impact) = self.business_impact {
            trr.business_impact = impact;
        }
        if let Some(assignee) = self.assignee {
            trr.assignee = non_blank(assignee);
        }
        if let Some(outcome) = self.expected_outcome {
            trr.expected_outcome = non_blank(outcome);
        }
        if let Some(customer) = self.customer {
            trr.customer = non_blank(customer);
        }
        if let Some(complexity) = self.complexity {
            trr.complexity = complexity;
        }
        if self.clear_due_date {
            trr.due_date = None;
        } else if let Some(day) = self.due_date {
            trr.due_date = Some(day);
        }
        if let Some(criteria) = self.acceptance_criteria {
            trr.acceptance_criteria = criteria;
        }
        if let Some(cases) = self.test_cases {
            trr.test_cases = cases;
        }
        if let Some(dependencies) = self.dependencies {
            trr.dependencies = dependencies;
        }
        if let Some(tags) = self.tags {
            trr.tags = tags;
        }
        if let Some(extensions) = self.extensions {
            trr.extensions = extensions;
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

// =============================================================================
// FIELD VALIDATION HELPERS
// =============================================================================

/// Reject a blank actor identifier (author, approver).
pub(crate) fn require_actor(field: &str, actor: &str) -> Result<(), TrrError> {
    require_text(field, actor, MAX_ACTOR_LENGTH)
}

/// Reject an over-long note.
pub(crate) fn bound_note(note: Option<&str>) -> Result<(), TrrError> {
    bound_optional("note", note, MAX_NOTE_LENGTH)
}

fn require_text(field: &str, value: &str, max: usize) -> Result<(), TrrError> {
    if value.trim().is_empty() {
        return Err(TrrError::validation(field, "is required"));
    }
    bound_text(field, value, max)
}

fn bound_text(field: &str, value: &str, max: usize) -> Result<(), TrrError> {
    let len = value.chars().count();
    if len > max {
        return Err(TrrError::validation(
            field,
            format!("length {len} exceeds maximum {max}"),
        ));
    }
    Ok(())
}

fn bound_optional(field: &str, value: Option<&str>, max: usize) -> Result<(), TrrError> {
    value.map_or(Ok(()), |v| bound_text(field, v, max))
}

fn validate_criteria(criteria: &[String]) -> Result<(), TrrError> {
    if criteria.len() > MAX_ACCEPTANCE_CRITERIA {
        return Err(TrrError::validation(
            "acceptance_criteria",
            format!("at most {MAX_ACCEPTANCE_CRITERIA} criteria allowed"),
        ));
    }
    for criterion in criteria {
        require_text("acceptance_criteria", criterion, MAX_TEXT_FIELD_LENGTH)?;
    }
    Ok(())
}

fn validate_test_cases(cases: &[TestCase]) -> Result<(), TrrError> {
    if cases.len() > MAX_TEST_CASES {
        return Err(TrrError::validation(
            "test_cases",
            format!("at most {MAX_TEST_CASES} test cases allowed"),
        ));
    }
    let mut seen = BTreeSet::new();
    for case in cases {
        require_text("test_cases", &case.id, MAX_TAG_LENGTH)?;
        require_text("test_cases", &case.name, MAX_TITLE_LENGTH)?;
        bound_text("test_cases", &case.expected_result, MAX_TEXT_FIELD_LENGTH)?;
        if !seen.insert(case.id.as_str()) {
            return Err(TrrError::validation(
                "test_cases",
                format!("duplicate test case id '{}'", case.id),
            ));
        }
    }
    Ok(())
}

fn validate_tags(tags: &BTreeSet<String>) -> Result<(), TrrError> {
    if tags.len() > MAX_TAGS {
        return Err(TrrError::validation(
            "tags",
            format!("at most {MAX_TAGS} tags allowed"),
        ));
    }
    for tag in tags {
        require_text("tags", tag, MAX_TAG_LENGTH)?;
    }
    Ok(())
}

fn validate_extensions(extensions: &BTreeMap<String, ExtensionValue>) -> Result<(), TrrError> {
    if extensions.len() > MAX_EXTENSIONS {
        return Err(TrrError::validation(
            "extensions",
            format!("at most {MAX_EXTENSIONS} extension fields allowed"),
        ));
    }
    for key in extensions.keys() {
        require_text("extensions", key, MAX_EXTENSION_KEY_LENGTH)?;
    }
    Ok(())
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the TRR engine.
///
/// Every operation that returns one of these has left stored state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrrError {
    /// A field is missing or malformed.
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// The requested status is not reachable from the current one.
    #[error("Invalid transition {from} -> {to}; allowed: [{}]", join_statuses(.allowed))]
    InvalidTransition {
        from: TrrStatus,
        to: TrrStatus,
        allowed: Vec<TrrStatus>,
    },

    /// The role is not required by the active SDW stage.
    #[error("Role '{role}' is not required in stage '{stage}'")]
    RoleNotApplicable { role: SdwRole, stage: SdwStage },

    /// The caller's observed version is stale.
    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// The optional AI assist could not answer. Recoverable; never shown to users.
    #[error("Assist unavailable: {0}")]
    AugmentationUnavailable(String),

    #[error("TRR not found: {0}")]
    NotFound(TrrId),

    #[error("TRR is archived: {0}")]
    Archived(TrrId),

    /// `advance_stage` called before every required role approved.
    #[error("Stage '{stage}' is only {percent}% complete")]
    StageIncomplete { stage: SdwStage, percent: u8 },

    /// `advance_stage` called on a completed final stage.
    #[error("SDW pipeline already finished")]
    PipelineFinished,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TrrError {
    /// Build a `Validation` error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's request rather than storage.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Serialization(_))
    }
}

fn join_statuses(statuses: &[TrrStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in TrrStatus::ALL {
            assert_eq!(status.as_str().parse::<TrrStatus>(), Ok(status));
        }
        assert_eq!("IN_PROGRESS".parse::<TrrStatus>(), Ok(TrrStatus::InProgress));
        assert!("unknown".parse::<TrrStatus>().is_err());
    }

    #[test]
    fn test_labelled_enums_parse() {
        assert_eq!("Very-Complex".parse::<Complexity>(), Ok(Complexity::VeryComplex));
        assert_eq!("critical".parse::<Priority>(), Ok(Priority::Critical));
        assert!(matches!(
            "nope".parse::<Category>(),
            Err(TrrError::Validation { field, .. }) if field == "category"
        ));
    }

    #[test]
    fn test_draft_starts_at_version_one_with_one_event() {
        let trr = Trr::draft(TrrId(1), NewTrr::titled("Check SSO"), "alice", at(10));
        assert_eq!(trr.status(), TrrStatus::Draft);
        assert_eq!(trr.version(), 1);
        assert_eq!(trr.status_history().len(), 1);
        assert_eq!(trr.status_history()[0].author_id, "alice");
        assert_eq!(trr.created_at(), at(10));
        assert!(!trr.is_archived());
        assert!(!trr.dor_status().is_ready);
    }

    #[test]
    fn test_draft_scores_missing_risk_level() {
        let fields = NewTrr {
            complexity: Complexity::VeryComplex,
            priority: Priority::Critical,
            ..NewTrr::titled("Risky")
        };
        let trr = Trr::draft(TrrId(1), fields, "a", at(0));
        assert_eq!(trr.risk_level, RiskLevel::High);

        let fields = NewTrr {
            risk_level: Some(RiskLevel::Low),
            complexity: Complexity::VeryComplex,
            priority: Priority::Critical,
            ..NewTrr::titled("Overridden")
        };
        let trr = Trr::draft(TrrId(2), fields, "a", at(0));
        assert_eq!(trr.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_new_trr_requires_title() {
        let err = NewTrr::default().validate();
        assert!(matches!(err, Err(TrrError::Validation { field, .. }) if field == "title"));
        assert!(NewTrr::titled("ok").validate().is_ok());
    }

    #[test]
    fn test_new_trr_rejects_overlong_title() {
        let fields = NewTrr::titled("x".repeat(MAX_TITLE_LENGTH + 1));
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_duplicate_test_case_ids_rejected() {
        let case = TestCase {
            id: "tc-1".into(),
            name: "Login".into(),
            expected_result: String::new(),
            status: TestCaseStatus::NotStarted,
        };
        let fields = NewTrr {
            test_cases: vec![case.clone(), case],
            ..NewTrr::titled("t")
        };
        assert!(matches!(
            fields.validate(),
            Err(TrrError::Validation { field, .. }) if field == "test_cases"
        ));
    }

    #[test]
    fn test_empty_patch_rejected() {
        assert!(TrrPatch::default().validate().is_err());
    }

    #[test]
    fn test_patch_blank_title_rejected() {
        let patch = TrrPatch {
            title: Some("  ".into()),
            ..TrrPatch::default()
        };
        assert!(matches!(
            patch.validate(),
            Err(TrrError::Validation { field, .. }) if field == "title"
        ));
    }

    #[test]
    fn test_patch_blank_assignee_clears() {
        let mut trr = Trr::draft(
            TrrId(1),
            NewTrr {
                assignee: Some("bob".into()),
                ..NewTrr::titled("t")
            },
            "a",
            at(0),
        );
        let patch = TrrPatch {
            assignee: Some(String::new()),
            ..TrrPatch::default()
        };
        patch.validate().expect("valid patch");
        patch.apply(&mut trr);
        assert_eq!(trr.assignee, None);
    }

    #[test]
    fn test_patch_cannot_set_and_clear_due_date() {
        let patch = TrrPatch {
            due_date: Some(10),
            clear_due_date: true,
            ..TrrPatch::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_invalid_transition_message_lists_allowed() {
        let err = TrrError::InvalidTransition {
            from: TrrStatus::InProgress,
            to: TrrStatus::Completed,
            allowed: vec![TrrStatus::InReview, TrrStatus::Deferred],
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition in-progress -> completed; allowed: [in-review, deferred]"
        );
    }

    #[test]
    fn test_epoch_day() {
        assert_eq!(Timestamp::from_millis(0).epoch_day(), 0);
        assert_eq!(Timestamp::from_millis(MILLIS_PER_DAY * 3 + 5).epoch_day(), 3);
    }

    #[test]
    fn test_trr_id_display() {
        assert_eq!(TrrId(42).to_string(), "TRR-42");
    }
}
