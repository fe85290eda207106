//! # Engine Module
//!
//! Session object owning one repository and one clock. It implements the
//! external interface of the workflow engine on top of the pure components
//! (`status`, `dor`, `sdw`, `risk`).
//!
//! ## Mutation Protocol
//!
//! Every mutating operation:
//! 1. loads the record (`NotFound` if missing),
//! 2. rejects archived records (`Archived`),
//! 3. checks the caller's observed version (`Conflict`),
//! 4. applies the pure operation to a working copy,
//! 5. recomputes the DOR on the copy,
//! 6. `put`s the copy.
//!
//! A failure at any step leaves the stored record unchanged.
//!
//! ## Storage Backends
//!
//! The engine is generic over [`TrrRepository`]. [`StorageBackend`] selects
//! between the in-memory and redb repositories at runtime.

use crate::assist::{AssistCapability, AssistContext, AssistField, Suggestion, suggest_or_fallback};
use crate::clock::{Clock, SystemClock};
use crate::dor::{DorEvaluator, DorReport, DorStatus};
use crate::repository::{InMemoryRepository, TrrFilter, TrrRepository};
use crate::risk::{RiskAssessment, RiskInputs, score_risk};
use crate::sdw::{ApprovalRequest, SdwPipeline, SdwProgress, SdwStatus};
use crate::status::StatusMachine;
use crate::storage::RedbRepository;
use crate::types::{
    NewTrr, Timestamp, Trr, TrrError, TrrId, TrrPatch, TrrStatus, require_actor,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Runtime choice of repository.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory records (fast, volatile).
    InMemory(InMemoryRepository),
    /// Disk-backed records using redb (ACID, persistent).
    Persistent(RedbRepository),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(InMemoryRepository::new())
    }
}

impl StorageBackend {
    /// Open or create a redb-backed store.
    pub fn redb(path: impl AsRef<Path>) -> Result<Self, TrrError> {
        RedbRepository::open(path).map(Self::Persistent)
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    /// Reclaim free space in the redb file. The in-memory store has nothing
    /// to compact and reports `false`.
    pub fn compact(&mut self) -> Result<bool, TrrError> {
        match self {
            Self::InMemory(_) => Ok(false),
            Self::Persistent(r) => r.compact(),
        }
    }
}

impl TrrRepository for StorageBackend {
    fn next_id(&mut self) -> Result<TrrId, TrrError> {
        match self {
            Self::InMemory(r) => r.next_id(),
            Self::Persistent(r) => r.next_id(),
        }
    }

    fn get(&self, id: TrrId) -> Result<Option<Trr>, TrrError> {
        match self {
            Self::InMemory(r) => r.get(id),
            Self::Persistent(r) => r.get(id),
        }
    }

    fn put(&mut self, trr: &Trr) -> Result<(), TrrError> {
        match self {
            Self::InMemory(r) => r.put(trr),
            Self::Persistent(r) => r.put(trr),
        }
    }

    fn list(&self, filter: &TrrFilter) -> Result<Vec<Trr>, TrrError> {
        match self {
            Self::InMemory(r) => r.list(filter),
            Self::Persistent(r) => r.list(filter),
        }
    }

    fn count(&self) -> Result<usize, TrrError> {
        match self {
            Self::InMemory(r) => r.count(),
            Self::Persistent(r) => r.count(),
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A lifecycle transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub to: TrrStatus,
    pub author_id: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Version the caller last saw.
    pub expected_version: u64,
}

impl TransitionRequest {
    pub fn new(to: TrrStatus, author_id: impl Into<String>, expected_version: u64) -> Self {
        Self {
            to,
            author_id: author_id.into(),
            note: None,
            expected_version,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// The TRR workflow engine.
#[derive(Debug)]
pub struct TrrEngine<R: TrrRepository, C: Clock = SystemClock> {
    repository: R,
    clock: C,
}

impl<R: TrrRepository> TrrEngine<R> {
    /// Engine over `repository` using wall-clock time.
    #[must_use]
    pub fn new(repository: R) -> Self {
        Self::with_clock(repository, SystemClock)
    }
}

impl TrrEngine<StorageBackend> {
    /// Engine over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StorageBackend::default())
    }
}

impl<R: TrrRepository, C: Clock> TrrEngine<R, C> {
    #[must_use]
    pub fn with_clock(repository: R, clock: C) -> Self {
        Self { repository, clock }
    }

    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repository
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    /// Create a draft TRR: version 1, one status event, DOR evaluated.
    pub fn create_trr(&mut self, fields: NewTrr, author: &str) -> Result<Trr, TrrError> {
        fields.validate()?;
        require_actor("author_id", author)?;
        self.check_dependencies(None, fields.dependencies.iter().copied())?;

        let id = self.repository.next_id()?;
        let trr = Trr::draft(id, fields, author, self.clock.now());
        self.repository.put(&trr)?;
        Ok(trr)
    }

    pub fn get_trr(&self, id: TrrId) -> Result<Trr, TrrError> {
        self.repository.get(id)?.ok_or(TrrError::NotFound(id))
    }

    /// Apply `patch`, bump the version, and re-run the DOR.
    pub fn update_trr(
        &mut self,
        id: TrrId,
        patch: TrrPatch,
        expected_version: u64,
    ) -> Result<Trr, TrrError> {
        patch.validate()?;
        if let Some(deps) = &patch.dependencies {
            self.check_dependencies(Some(id), deps.iter().copied())?;
        }
        self.mutate(id, expected_version, |trr, at| {
            patch.apply(trr);
            trr.record_mutation(at);
            Ok(())
        })
        .map(|(trr, ())| trr)
    }

    /// Archive a TRR. History and approvals are kept; the version is bumped.
    pub fn delete_trr(&mut self, id: TrrId, expected_version: u64) -> Result<Trr, TrrError> {
        let current = self.load_mutable(id, expected_version)?;
        self.repository
            .soft_delete(current.id, self.clock.now())?
            .ok_or(TrrError::NotFound(id))
    }

    /// Records matching `filter`. Read-only.
    pub fn list_trrs(&self, filter: &TrrFilter) -> Result<Vec<Trr>, TrrError> {
        self.repository.list(filter)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Move a TRR to a new status.
    pub fn transition(&mut self, id: TrrId, request: TransitionRequest) -> Result<Trr, TrrError> {
        self.mutate(id, request.expected_version, |trr, at| {
            StatusMachine::transition(
                trr,
                request.to,
                &request.author_id,
                request.note.as_deref(),
                at,
            )
        })
        .map(|(trr, ())| trr)
    }

    // -------------------------------------------------------------------------
    // Readiness
    // -------------------------------------------------------------------------

    /// Rule-based readiness of a stored TRR.
    pub fn evaluate_dor(&self, id: TrrId) -> Result<DorStatus, TrrError> {
        Ok(DorEvaluator::evaluate(&self.get_trr(id)?))
    }

    /// Readiness plus an optional assist opinion. Assist failures only drop
    /// the opinion.
    pub fn evaluate_dor_assisted(
        &self,
        id: TrrId,
        assist: &dyn AssistCapability,
    ) -> Result<DorReport, TrrError> {
        let trr = self.get_trr(id)?;
        Ok(DorEvaluator::evaluate_assisted(&trr, assist).0)
    }

    /// Suggestion for one field, falling back to the rule-based templates.
    pub fn suggest_field(
        &self,
        id: TrrId,
        field: AssistField,
        assist: &dyn AssistCapability,
    ) -> Result<Suggestion, TrrError> {
        let trr = self.get_trr(id)?;
        Ok(suggest_or_fallback(assist, field, &AssistContext::from_trr(&trr)).0)
    }

    // -------------------------------------------------------------------------
    // Approval pipeline
    // -------------------------------------------------------------------------

    /// Record an approval decision for the current SDW stage.
    pub fn set_approval(
        &mut self,
        id: TrrId,
        request: ApprovalRequest,
    ) -> Result<SdwStatus, TrrError> {
        self.mutate(id, request.expected_version, |trr, at| {
            SdwPipeline::set_approval(
                trr,
                request.role,
                request.decision,
                &request.approver_id,
                request.note.as_deref(),
                at,
            )
        })
        .map(|(trr, ())| trr.sdw_status)
    }

    /// Advance the SDW pipeline to its next stage.
    pub fn advance_stage(
        &mut self,
        id: TrrId,
        expected_version: u64,
    ) -> Result<SdwStatus, TrrError> {
        self.mutate(id, expected_version, SdwPipeline::advance_stage)
            .map(|(trr, _)| trr.sdw_status)
    }

    pub fn sdw_progress(&self, id: TrrId) -> Result<SdwProgress, TrrError> {
        Ok(self.get_trr(id)?.sdw_status.progress())
    }

    // -------------------------------------------------------------------------
    // Risk
    // -------------------------------------------------------------------------

    /// Score a stored TRR as of now.
    pub fn assess_risk(&self, id: TrrId) -> Result<RiskAssessment, TrrError> {
        let trr = self.get_trr(id)?;
        Ok(score_risk(&RiskInputs::for_trr(&trr, self.clock.now())))
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn load_mutable(&self, id: TrrId, expected_version: u64) -> Result<Trr, TrrError> {
        let trr = self.get_trr(id)?;
        if trr.archived {
            return Err(TrrError::Archived(id));
        }
        if expected_version != trr.version {
            return Err(TrrError::Conflict {
                expected: expected_version,
                actual: trr.version,
            });
        }
        Ok(trr)
    }

    /// Run `op` on a working copy and store it only if `op` succeeds.
    fn mutate<T>(
        &mut self,
        id: TrrId,
        expected_version: u64,
        op: impl FnOnce(&mut Trr, Timestamp) -> Result<T, TrrError>,
    ) -> Result<(Trr, T), TrrError> {
        let mut working = self.load_mutable(id, expected_version)?;
        let out = op(&mut working, self.clock.now())?;
        working.refresh_dor();
        self.repository.put(&working)?;
        Ok((working, out))
    }

    fn check_dependencies(
        &self,
        own: Option<TrrId>,
        deps: impl IntoIterator<Item = TrrId>,
    ) -> Result<(), TrrError> {
        for dep in deps {
            if Some(dep) == own {
                return Err(TrrError::validation(
                    "dependencies",
                    "a TRR cannot depend on itself",
                ));
            }
            if self.repository.get(dep)?.is_none() {
                return Err(TrrError::validation(
                    "dependencies",
                    format!("unknown dependency {dep}"),
                ));
            }
        }
        Ok(())
    }
}
