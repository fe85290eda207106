//! # Lifecycle Tier Tests (T0-T4)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Record Integrity
//! - T1: Lifecycle Transitions
//! - T2: Readiness Gate
//! - T3: Approval Pipeline
//! - T4: Read-Only Views

#![allow(clippy::panic)]

use trr_core::{
    ApprovalDecision, ApprovalRequest, FixedClock, InMemoryRepository, NewTrr, SdwRole, SdwStage,
    TransitionRequest, TrrEngine, TrrError, TrrId, TrrPatch, TrrStatus,
};

fn engine() -> TrrEngine<InMemoryRepository, FixedClock> {
    TrrEngine::with_clock(InMemoryRepository::new(), FixedClock::at(1_700_000_000_000))
}

fn complete_fields() -> NewTrr {
    NewTrr {
        title: "Validate SIEM ingestion".into(),
        description: "Confirm firewall and EDR logs ingest within SLA".into(),
        assignee: Some("se-alice".into()),
        expected_outcome: Some("All sources visible in the SIEM".into()),
        acceptance_criteria: vec!["Firewall logs parsed".into(), "EDR alerts correlated".into()],
        ..NewTrr::default()
    }
}

fn approve(role: SdwRole, expected_version: u64) -> ApprovalRequest {
    ApprovalRequest {
        role,
        decision: ApprovalDecision::Approve,
        approver_id: format!("user-{}", role.slug()),
        note: None,
        expected_version,
    }
}

// =============================================================================
// TIER T0: RECORD INTEGRITY
// =============================================================================

mod t0_record_integrity {
    use super::*;

    /// T0.1: A new TRR is a draft at version 1 with one history entry.
    #[test]
    fn created_as_draft() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");

        assert_eq!(trr.status(), TrrStatus::Draft);
        assert_eq!(trr.version(), 1);
        assert_eq!(trr.status_history().len(), 1);
        assert_eq!(trr.status_history()[0].status, TrrStatus::Draft);
    }

    /// T0.2: Deletion is logical; the record and its history survive.
    #[test]
    fn delete_is_soft() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        engine.delete_trr(trr.id, 1).expect("delete");

        let stored = engine.get_trr(trr.id).expect("still stored");
        assert!(stored.is_archived());
        assert_eq!(stored.status_history(), trr.status_history());
    }

    /// T0.3: Unknown identifiers are reported, not invented.
    #[test]
    fn unknown_id_not_found() {
        let engine = engine();
        assert_eq!(engine.get_trr(TrrId(404)), Err(TrrError::NotFound(TrrId(404))));
    }

    /// T0.4: Stale writers are rejected.
    #[test]
    fn stale_version_conflicts() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        engine
            .transition(trr.id, TransitionRequest::new(TrrStatus::Pending, "a", 1))
            .expect("first writer");

        let second = engine.transition(
            trr.id,
            TransitionRequest::new(TrrStatus::InProgress, "b", 1),
        );
        assert_eq!(
            second,
            Err(TrrError::Conflict {
                expected: 1,
                actual: 2
            })
        );
    }
}

// =============================================================================
// TIER T1: LIFECYCLE TRANSITIONS
// =============================================================================

mod t1_lifecycle {
    use super::*;

    /// T1.1: The full happy path reaches `completed`.
    #[test]
    fn happy_path() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        let path = [
            TrrStatus::Pending,
            TrrStatus::InProgress,
            TrrStatus::InReview,
            TrrStatus::Validated,
            TrrStatus::Completed,
        ];
        let mut last = trr;
        for to in path {
            last = engine
                .transition(last.id, TransitionRequest::new(to, "lead", last.version()))
                .expect("transition");
        }
        assert_eq!(last.status(), TrrStatus::Completed);
        assert_eq!(last.version(), 6);
        assert_eq!(last.status_history().len(), 6);
    }

    /// T1.2: Skipping review is rejected with the allowed targets.
    #[test]
    fn skip_rejected() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        engine
            .transition(trr.id, TransitionRequest::new(TrrStatus::Pending, "a", 1))
            .expect("pending");
        engine
            .transition(trr.id, TransitionRequest::new(TrrStatus::InProgress, "a", 2))
            .expect("in progress");

        let err = engine
            .transition(trr.id, TransitionRequest::new(TrrStatus::Completed, "a", 3))
            .expect_err("skip");
        let TrrError::InvalidTransition { allowed, .. } = err else {
            panic!("expected InvalidTransition, got {err:?}");
        };
        assert!(allowed.contains(&TrrStatus::InReview));
        assert!(!allowed.contains(&TrrStatus::Completed));
    }

    /// T1.3: Rejection demands a reason and can be reopened.
    #[test]
    fn reject_and_reopen() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");

        let missing_note =
            engine.transition(trr.id, TransitionRequest::new(TrrStatus::Rejected, "a", 1));
        assert!(matches!(missing_note, Err(TrrError::Validation { field, .. }) if field == "note"));

        let rejected = engine
            .transition(
                trr.id,
                TransitionRequest::new(TrrStatus::Rejected, "a", 1).with_note("Out of scope"),
            )
            .expect("reject");
        assert!(rejected.status().is_terminal());

        let reopened = engine
            .transition(trr.id, TransitionRequest::new(TrrStatus::Pending, "a", 2))
            .expect("reopen");
        assert_eq!(reopened.status_history().len(), 3);
    }
}

// =============================================================================
// TIER T2: READINESS GATE
// =============================================================================

mod t2_readiness {
    use super::*;

    /// T2.1: A complete record is ready.
    #[test]
    fn complete_is_ready() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        let dor = engine.evaluate_dor(trr.id).expect("dor");
        assert!(dor.is_ready);
        assert_eq!(dor.score, 100);
    }

    /// T2.2: Clearing a field recomputes the gate on update.
    #[test]
    fn update_recomputes() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        let patch = TrrPatch {
            acceptance_criteria: Some(Vec::new()),
            ..TrrPatch::default()
        };
        let updated = engine.update_trr(trr.id, patch, 1).expect("update");
        assert!(!updated.dor_status().is_ready);
        assert_eq!(updated.dor_status().score, 80);
        assert_eq!(
            updated.dor_status().unmet_criteria,
            vec!["At least one acceptance criterion is required"]
        );
    }
}

// =============================================================================
// TIER T3: APPROVAL PIPELINE
// =============================================================================

mod t3_pipeline {
    use super::*;

    /// T3.1: Roles outside the active stage cannot decide.
    #[test]
    fn inapplicable_role() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        let err = engine
            .set_approval(trr.id, approve(SdwRole::TestManager, 1))
            .expect_err("not in requirements");
        assert_eq!(
            err,
            TrrError::RoleNotApplicable {
                role: SdwRole::TestManager,
                stage: SdwStage::Requirements
            }
        );
        assert_eq!(engine.get_trr(trr.id).expect("get").version(), 1);
    }

    /// T3.2: The whole pipeline can be driven to 100%.
    #[test]
    fn full_pipeline() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");

        let mut version = trr.version();
        for stage in SdwStage::ALL {
            for &role in stage.required_roles() {
                engine
                    .set_approval(trr.id, approve(role, version))
                    .expect("approve");
                version += 1;
            }
            match stage.next() {
                Some(next) => {
                    let sdw = engine.advance_stage(trr.id, version).expect("advance");
                    assert_eq!(sdw.current_stage, next);
                    version += 1;
                }
                None => {
                    assert_eq!(
                        engine.advance_stage(trr.id, version),
                        Err(TrrError::PipelineFinished)
                    );
                }
            }
        }
        assert_eq!(engine.get_trr(trr.id).expect("get").version(), version);
        let progress = engine.sdw_progress(trr.id).expect("progress");
        assert_eq!(progress.overall_percent, 100);
        assert_eq!(progress.next_approver, None);
    }

    /// T3.3: Advancing an incomplete stage reports its completion.
    #[test]
    fn advance_incomplete() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        engine
            .set_approval(trr.id, approve(SdwRole::ProductOwner, 1))
            .expect("approve");
        assert_eq!(
            engine.advance_stage(trr.id, 2),
            Err(TrrError::StageIncomplete {
                stage: SdwStage::Requirements,
                percent: 33
            })
        );
    }

    /// T3.4: Approvals and advancement built on a stale read are refused.
    #[test]
    fn stale_pipeline_writes_conflict() {
        let mut engine = engine();
        let trr = engine.create_trr(complete_fields(), "author").expect("create");
        for (version, role) in (1..).zip(SdwStage::Requirements.required_roles()) {
            engine
                .set_approval(trr.id, approve(*role, version))
                .expect("approve");
        }
        let before = engine.get_trr(trr.id).expect("get");
        assert_eq!(before.version(), 4);

        let stale_approval = engine.set_approval(trr.id, approve(SdwRole::ProductOwner, 3));
        assert_eq!(
            stale_approval,
            Err(TrrError::Conflict {
                expected: 3,
                actual: 4
            })
        );
        assert_eq!(
            engine.advance_stage(trr.id, 1),
            Err(TrrError::Conflict {
                expected: 1,
                actual: 4
            })
        );
        assert_eq!(engine.get_trr(trr.id).expect("get"), before);
        assert_eq!(before.sdw_status().current_stage, SdwStage::Requirements);

        let sdw = engine.advance_stage(trr.id, 4).expect("current version");
        assert_eq!(sdw.current_stage, SdwStage::Design);
    }
}

// =============================================================================
// TIER T4: READ-ONLY VIEWS
// =============================================================================

mod t4_views {
    use trr_core::{
        Complexity, OutcomesFramework, Priority, RiskInputs, RiskLevel, ScenarioResult,
        ValidationStage, compute_metrics_view, derive_stage, score_risk,
    };

    /// T4.1: Stage mapping follows the phase table.
    #[test]
    fn stage_mapping() {
        assert_eq!(derive_stage("validation", "active"), ValidationStage::Stage4);
        assert_eq!(derive_stage("somewhere-else", "active"), ValidationStage::Stage3);
    }

    /// T4.2: Metrics only include present sources.
    #[test]
    fn metrics_omit_absent() {
        let scenarios = [ScenarioResult {
            scenario_id: "ransomware".into(),
            status: "complete".into(),
            detection_alerts: None,
        }];
        let view = compute_metrics_view(&OutcomesFramework::default(), &scenarios);
        assert!(view.is_empty());
    }

    /// T4.3: Risk scoring follows the weight table.
    #[test]
    fn risk_table() {
        let assessment = score_risk(&RiskInputs {
            complexity: Some(Complexity::Complex),
            days_until_due: Some(20),
            priority: Some(Priority::High),
        });
        assert_eq!(assessment.score, 6);
        assert_eq!(assessment.level, RiskLevel::High);
    }
}
