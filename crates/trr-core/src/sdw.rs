//! # SDW Approval Pipeline
//!
//! Five ordered stages, each gated by a fixed, ordered set of roles.
//!
//! | Stage | Title | Required roles |
//! |-------|-------|----------------|
//! | requirements | Requirements Review | Product Owner, Business Analyst, Technical Lead |
//! | design | Technical Design | Solution Architect, Technical Lead, Security Lead |
//! | implementation | Implementation Ready | Technical Lead, DevOps Engineer, QA Lead |
//! | testing | Testing Strategy | QA Lead, Test Manager, Security Lead |
//! | deployment | Deployment Ready | DevOps Engineer, Release Manager, Product Owner |
//!
//! ## Rules
//!
//! - Only roles required by the *current* stage may record a decision.
//! - A decision updates exactly one `ApprovalRecord`; a rejection does not
//!   cascade to other roles.
//! - Completion is recomputed on read, rounded to the nearest integer.
//! - Stages advance only through an explicit [`SdwPipeline::advance_stage`]
//!   call, and only when the current stage is at 100%.

use crate::types::{Timestamp, Trr, TrrError, bound_note, require_actor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ROLES
// =============================================================================

/// An approver role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SdwRole {
    #[serde(rename = "product-owner")]
    ProductOwner,
    #[serde(rename = "business-analyst")]
    BusinessAnalyst,
    #[serde(rename = "technical-lead")]
    TechnicalLead,
    #[serde(rename = "solution-architect")]
    SolutionArchitect,
    #[serde(rename = "security-lead")]
    SecurityLead,
    #[serde(rename = "devops-engineer")]
    DevOpsEngineer,
    #[serde(rename = "qa-lead")]
    QaLead,
    #[serde(rename = "test-manager")]
    TestManager,
    #[serde(rename = "release-manager")]
    ReleaseManager,
}

impl SdwRole {
    pub const ALL: [Self; 9] = [
        Self::ProductOwner,
        Self::BusinessAnalyst,
        Self::TechnicalLead,
        Self::SolutionArchitect,
        Self::SecurityLead,
        Self::DevOpsEngineer,
        Self::QaLead,
        Self::TestManager,
        Self::ReleaseManager,
    ];

    /// Machine-readable identifier.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::ProductOwner => "product-owner",
            Self::BusinessAnalyst => "business-analyst",
            Self::TechnicalLead => "technical-lead",
            Self::SolutionArchitect => "solution-architect",
            Self::SecurityLead => "security-lead",
            Self::DevOpsEngineer => "devops-engineer",
            Self::QaLead => "qa-lead",
            Self::TestManager => "test-manager",
            Self::ReleaseManager => "release-manager",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProductOwner => "Product Owner",
            Self::BusinessAnalyst => "Business Analyst",
            Self::TechnicalLead => "Technical Lead",
            Self::SolutionArchitect => "Solution Architect",
            Self::SecurityLead => "Security Lead",
            Self::DevOpsEngineer => "DevOps Engineer",
            Self::QaLead => "QA Lead",
            Self::TestManager => "Test Manager",
            Self::ReleaseManager => "Release Manager",
        }
    }
}

impl fmt::Display for SdwRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SdwRole {
    type Err = TrrError;

    /// Accepts either the slug (`qa-lead`) or the display name (`QA Lead`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        Self::ALL
            .into_iter()
            .find(|role| role.slug() == wanted)
            .ok_or_else(|| TrrError::validation("role", format!("unknown role '{s}'")))
    }
}

// =============================================================================
// STAGES
// =============================================================================

/// A pipeline stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SdwStage {
    Requirements,
    Design,
    Implementation,
    Testing,
    Deployment,
}

impl SdwStage {
    pub const ALL: [Self; 5] = [
        Self::Requirements,
        Self::Design,
        Self::Implementation,
        Self::Testing,
        Self::Deployment,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Design => "design",
            Self::Implementation => "implementation",
            Self::Testing => "testing",
            Self::Deployment => "deployment",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Requirements => "Requirements Review",
            Self::Design => "Technical Design",
            Self::Implementation => "Implementation Ready",
            Self::Testing => "Testing Strategy",
            Self::Deployment => "Deployment Ready",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Requirements => "Initial requirements validation and sign-off",
            Self::Design => "Architecture and technical design approval",
            Self::Implementation => "Development environment and resources prepared",
            Self::Testing => "Test plans and quality assurance approval",
            Self::Deployment => "Production deployment and go-live approval",
        }
    }

    /// Typical duration in working days, as `(min, max)`.
    #[must_use]
    pub const fn estimated_days(self) -> (u8, u8) {
        match self {
            Self::Requirements | Self::Testing => (2, 3),
            Self::Design => (3, 5),
            Self::Implementation | Self::Deployment => (1, 2),
        }
    }

    /// Roles that must approve this stage, in approval order.
    #[must_use]
    pub const fn required_roles(self) -> &'static [SdwRole] {
        use SdwRole::{
            BusinessAnalyst, DevOpsEngineer, ProductOwner, QaLead, ReleaseManager, SecurityLead,
            SolutionArchitect, TechnicalLead, TestManager,
        };
        match self {
            Self::Requirements => &[ProductOwner, BusinessAnalyst, TechnicalLead],
            Self::Design => &[SolutionArchitect, TechnicalLead, SecurityLead],
            Self::Implementation => &[TechnicalLead, DevOpsEngineer, QaLead],
            Self::Testing => &[QaLead, TestManager, SecurityLead],
            Self::Deployment => &[DevOpsEngineer, ReleaseManager, ProductOwner],
        }
    }

    #[must_use]
    pub fn requires(self, role: SdwRole) -> bool {
        self.required_roles().contains(&role)
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Requirements => Some(Self::Design),
            Self::Design => Some(Self::Implementation),
            Self::Implementation => Some(Self::Testing),
            Self::Testing => Some(Self::Deployment),
            Self::Deployment => None,
        }
    }
}

impl fmt::Display for SdwStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SdwStage {
    type Err = TrrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == wanted)
            .ok_or_else(|| TrrError::validation("stage", format!("unknown stage '{s}'")))
    }
}

// =============================================================================
// APPROVAL RECORDS
// =============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A decision submitted by an approver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    #[must_use]
    pub const fn status(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

impl FromStr for ApprovalDecision {
    type Err = TrrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(Self::Approve),
            "reject" | "rejected" => Ok(Self::Reject),
            _ => Err(TrrError::validation(
                "decision",
                format!("unknown decision '{s}'"),
            )),
        }
    }
}

/// One role's decision for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub stage: SdwStage,
    pub role: SdwRole,
    pub status: ApprovalStatus,
    pub approver_id: Option<String>,
    pub timestamp: Option<Timestamp>,
    pub note: Option<String>,
}

impl ApprovalRecord {
    const fn pending(stage: SdwStage, role: SdwRole) -> Self {
        Self {
            stage,
            role,
            status: ApprovalStatus::Pending,
            approver_id: None,
            timestamp: None,
            note: None,
        }
    }
}

/// Approval state of a TRR. Records are kept in pipeline order, one per
/// (stage, role) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdwStatus {
    pub current_stage: SdwStage,
    pub approvals: Vec<ApprovalRecord>,
}

impl Default for SdwStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SdwStatus {
    /// Fresh pipeline: first stage active, every record pending.
    #[must_use]
    pub fn new() -> Self {
        let approvals = SdwStage::ALL
            .into_iter()
            .flat_map(|stage| {
                stage
                    .required_roles()
                    .iter()
                    .map(move |&role| ApprovalRecord::pending(stage, role))
            })
            .collect();
        Self {
            current_stage: SdwStage::Requirements,
            approvals,
        }
    }

    /// The record for `role` in `stage`, if that stage requires the role.
    #[must_use]
    pub fn record(&self, stage: SdwStage, role: SdwRole) -> Option<&ApprovalRecord> {
        self.approvals
            .iter()
            .find(|r| r.stage == stage && r.role == role)
    }

    fn record_mut(&mut self, stage: SdwStage, role: SdwRole) -> Option<&mut ApprovalRecord> {
        self.approvals
            .iter_mut()
            .find(|r| r.stage == stage && r.role == role)
    }

    fn approved_count(&self, stage: SdwStage) -> usize {
        self.approvals
            .iter()
            .filter(|r| r.stage == stage && r.status == ApprovalStatus::Approved)
            .count()
    }

    /// Completion of `stage` in percent, rounded to the nearest integer.
    #[must_use]
    pub fn stage_completion(&self, stage: SdwStage) -> u8 {
        let required = stage.required_roles().len();
        let approved = self.approved_count(stage).min(required);
        rounded_percent(approved, required)
    }

    #[must_use]
    pub fn is_stage_complete(&self, stage: SdwStage) -> bool {
        self.stage_completion(stage) == 100
    }

    /// Average completion across all stages, rounded.
    #[must_use]
    pub fn overall_progress(&self) -> u8 {
        let sum: usize = SdwStage::ALL
            .into_iter()
            .map(|s| usize::from(self.stage_completion(s)))
            .sum();
        let stages = SdwStage::ALL.len();
        ((sum + stages / 2) / stages) as u8
    }

    /// First role of the current stage still pending, in stage order.
    #[must_use]
    pub fn next_approver(&self) -> Option<SdwRole> {
        let stage = self.current_stage;
        stage.required_roles().iter().copied().find(|&role| {
            self.record(stage, role)
                .is_some_and(|r| r.status == ApprovalStatus::Pending)
        })
    }

    /// Roles of the current stage that have rejected.
    #[must_use]
    pub fn rejections(&self) -> Vec<SdwRole> {
        let stage = self.current_stage;
        self.approvals
            .iter()
            .filter(|r| r.stage == stage && r.status == ApprovalStatus::Rejected)
            .map(|r| r.role)
            .collect()
    }

    /// Everything a dashboard needs in one value.
    #[must_use]
    pub fn progress(&self) -> SdwProgress {
        let stages = SdwStage::ALL
            .into_iter()
            .map(|stage| StageCompletion {
                stage,
                approved: self.approved_count(stage),
                required: stage.required_roles().len(),
                percent: self.stage_completion(stage),
                estimated_days: stage.estimated_days(),
            })
            .collect();
        SdwProgress {
            current: self.current_stage,
            next: self.current_stage.next(),
            stages,
            overall_percent: self.overall_progress(),
            next_approver: self.next_approver(),
            rejections: self.rejections(),
        }
    }
}

fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 100;
    }
    ((part.saturating_mul(100) + whole / 2) / whole).min(100) as u8
}

// =============================================================================
// PROGRESS VIEW
// =============================================================================

/// Completion of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCompletion {
    pub stage: SdwStage,
    pub approved: usize,
    pub required: usize,
    pub percent: u8,
    /// Typical duration in working days, `(min, max)`.
    pub estimated_days: (u8, u8),
}

/// Read-time summary of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdwProgress {
    pub current: SdwStage,
    pub next: Option<SdwStage>,
    pub stages: Vec<StageCompletion>,
    pub overall_percent: u8,
    pub next_approver: Option<SdwRole>,
    pub rejections: Vec<SdwRole>,
}

// =============================================================================
// PIPELINE OPERATIONS
// =============================================================================

/// A role's decision on the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub role: SdwRole,
    pub decision: ApprovalDecision,
    pub approver_id: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Version the caller last saw.
    pub expected_version: u64,
}

/// Applies approval decisions and stage advancement to a TRR.
pub struct SdwPipeline;

impl SdwPipeline {
    /// Record `decision` by `approver` for `role` in the current stage.
    ///
    /// Fails with `RoleNotApplicable` if the current stage does not require
    /// `role`. On error `trr` is unchanged.
    pub fn set_approval(
        trr: &mut Trr,
        role: SdwRole,
        decision: ApprovalDecision,
        approver: &str,
        note: Option<&str>,
        at: Timestamp,
    ) -> Result<(), TrrError> {
        let stage = trr.sdw_status.current_stage;
        if !stage.requires(role) {
            return Err(TrrError::RoleNotApplicable { role, stage });
        }
        require_actor("approver_id", approver)?;
        bound_note(note)?;

        let record = trr
            .sdw_status
            .record_mut(stage, role)
            .ok_or(TrrError::RoleNotApplicable { role, stage })?;
        record.status = decision.status();
        record.approver_id = Some(approver.to_string());
        record.timestamp = Some(at);
        record.note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        trr.record_mutation(at);
        Ok(())
    }

    /// Move to the next stage. The current stage must be fully approved.
    ///
    /// Returns the new current stage.
    pub fn advance_stage(trr: &mut Trr, at: Timestamp) -> Result<SdwStage, TrrError> {
        let stage = trr.sdw_status.current_stage;
        if !trr.sdw_status.is_stage_complete(stage) {
            return Err(TrrError::StageIncomplete {
                stage,
                percent: trr.sdw_status.stage_completion(stage),
            });
        }
        let next = stage.next().ok_or(TrrError::PipelineFinished)?;
        trr.sdw_status.current_stage = next;
        trr.record_mutation(at);
        Ok(next)
    }
}

#[allow(clippy::unwrap_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewTrr, TrrId};

    fn trr() -> Trr {
        Trr::draft(TrrId(1), NewTrr::titled("t"), "a", Timestamp(0))
    }

    fn approve_all(trr: &mut Trr, stage: SdwStage) {
        for &role in stage.required_roles() {
            SdwPipeline::set_approval(trr, role, ApprovalDecision::Approve, "u", None, Timestamp(1))
                .unwrap();
        }
    }

    #[test]
    fn test_new_status_has_fifteen_pending_records() {
        let sdw = SdwStatus::new();
        assert_eq!(sdw.current_stage, SdwStage::Requirements);
        assert_eq!(sdw.approvals.len(), 15);
        assert!(
            sdw.approvals
                .iter()
                .all(|r| r.status == ApprovalStatus::Pending)
        );
        assert_eq!(sdw.overall_progress(), 0);
        assert_eq!(sdw.next_approver(), Some(SdwRole::ProductOwner));
    }

    #[test]
    fn test_inapplicable_role_rejected_without_change() {
        let mut trr = trr();
        let before = trr.clone();
        let err = SdwPipeline::set_approval(
            &mut trr,
            SdwRole::ReleaseManager,
            ApprovalDecision::Approve,
            "u",
            None,
            Timestamp(5),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TrrError::RoleNotApplicable {
                role: SdwRole::ReleaseManager,
                stage: SdwStage::Requirements
            }
        );
        assert_eq!(trr, before);
    }

    #[test]
    fn test_approving_requirements_completes_only_that_stage() {
        let mut trr = trr();
        approve_all(&mut trr, SdwStage::Requirements);
        let sdw = trr.sdw_status();
        assert_eq!(sdw.stage_completion(SdwStage::Requirements), 100);
        assert_eq!(sdw.overall_progress(), 20);
        for stage in &SdwStage::ALL[1..] {
            assert_eq!(sdw.stage_completion(*stage), 0);
        }
        assert_eq!(sdw.next_approver(), None);
        assert_eq!(trr.version(), 4);
    }

    #[test]
    fn test_rounding_matches_nearest_integer() {
        let mut trr = trr();
        SdwPipeline::set_approval(
            &mut trr,
            SdwRole::ProductOwner,
            ApprovalDecision::Approve,
            "u",
            None,
            Timestamp(1),
        )
        .unwrap();
        assert_eq!(trr.sdw_status().stage_completion(SdwStage::Requirements), 33);
        SdwPipeline::set_approval(
            &mut trr,
            SdwRole::BusinessAnalyst,
            ApprovalDecision::Approve,
            "u",
            None,
            Timestamp(2),
        )
        .unwrap();
        assert_eq!(trr.sdw_status().stage_completion(SdwStage::Requirements), 67);
        assert_eq!(trr.sdw_status().overall_progress(), 13);
    }

    #[test]
    fn test_rejection_touches_only_that_role() {
        let mut trr = trr();
        let before = trr.sdw_status().clone();
        SdwPipeline::set_approval(
            &mut trr,
            SdwRole::BusinessAnalyst,
            ApprovalDecision::Reject,
            "ba",
            Some("missing NFRs"),
            Timestamp(3),
        )
        .unwrap();
        let after = trr.sdw_status();
        assert_eq!(after.current_stage, SdwStage::Requirements);
        let changed: Vec<_> = before
            .approvals
            .iter()
            .zip(&after.approvals)
            .filter(|(b, a)| b != a)
            .map(|(_, a)| a)
            .collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].role, SdwRole::BusinessAnalyst);
        assert_eq!(changed[0].status, ApprovalStatus::Rejected);
        assert_eq!(changed[0].approver_id.as_deref(), Some("ba"));
        assert_eq!(changed[0].note.as_deref(), Some("missing NFRs"));
        assert_eq!(after.rejections(), vec![SdwRole::BusinessAnalyst]);
        assert_eq!(after.next_approver(), Some(SdwRole::ProductOwner));
    }

    #[test]
    fn test_advance_requires_full_approval() {
        let mut trr = trr();
        let err = SdwPipeline::advance_stage(&mut trr, Timestamp(1)).unwrap_err();
        assert_eq!(
            err,
            TrrError::StageIncomplete {
                stage: SdwStage::Requirements,
                percent: 0
            }
        );
        approve_all(&mut trr, SdwStage::Requirements);
        let next = SdwPipeline::advance_stage(&mut trr, Timestamp(2)).unwrap();
        assert_eq!(next, SdwStage::Design);
        assert_eq!(trr.sdw_status().next_approver(), Some(SdwRole::SolutionArchitect));
    }

    #[test]
    fn test_technical_lead_approval_is_per_stage() {
        let mut trr = trr();
        approve_all(&mut trr, SdwStage::Requirements);
        SdwPipeline::advance_stage(&mut trr, Timestamp(2)).unwrap();
        let design_lead = trr
            .sdw_status()
            .record(SdwStage::Design, SdwRole::TechnicalLead)
            .unwrap();
        assert_eq!(design_lead.status, ApprovalStatus::Pending);
    }

    #[test]
    fn test_pipeline_finishes_after_deployment() {
        let mut trr = trr();
        for stage in SdwStage::ALL {
            approve_all(&mut trr, stage);
            if stage != SdwStage::Deployment {
                SdwPipeline::advance_stage(&mut trr, Timestamp(9)).unwrap();
            }
        }
        assert_eq!(trr.sdw_status().overall_progress(), 100);
        let version = trr.version();
        assert_eq!(
            SdwPipeline::advance_stage(&mut trr, Timestamp(10)),
            Err(TrrError::PipelineFinished)
        );
        assert_eq!(trr.version(), version);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("QA Lead".parse::<SdwRole>(), Ok(SdwRole::QaLead));
        assert_eq!("devops-engineer".parse::<SdwRole>(), Ok(SdwRole::DevOpsEngineer));
        assert_eq!("release_manager".parse::<SdwRole>(), Ok(SdwRole::ReleaseManager));
        assert!("CEO".parse::<SdwRole>().is_err());
        for role in SdwRole::ALL {
            assert_eq!(role.name().parse::<SdwRole>(), Ok(role));
        }
    }

    #[test]
    fn test_progress_summary() {
        let mut trr = trr();
        approve_all(&mut trr, SdwStage::Requirements);
        let progress = trr.sdw_status().progress();
        assert_eq!(progress.current, SdwStage::Requirements);
        assert_eq!(progress.next, Some(SdwStage::Design));
        assert_eq!(progress.overall_percent, 20);
        assert_eq!(progress.stages[0].approved, 3);
        assert_eq!(progress.stages[0].percent, 100);
        assert!(trr.sdw_status().is_stage_complete(SdwStage::Requirements));
        assert!(!trr.sdw_status().is_stage_complete(SdwStage::Design));
        assert_eq!(progress.stages[1].estimated_days, (3, 5));
        assert_eq!(progress.stages[4].estimated_days, (1, 2));
    }
}
