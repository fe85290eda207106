//! # Status State Machine
//!
//! Validates and records TRR lifecycle transitions.
//!
//! ## Transition Graph
//!
//! ```text
//! draft -> pending -> in-progress -> in-review -> validated -> completed
//!                          |               |            \-> approved -> completed
//!                          v               v
//!                      deferred          failed
//!
//! draft, pending        -> not-applicable
//! any non-terminal      -> rejected        (note required)
//! rejected, deferred    -> pending         (reopen)
//! ```
//!
//! Terminal states: `completed`, `rejected`, `not-applicable`. `rejected` keeps
//! its single reopen edge.
//!
//! A transition either appends exactly one `StatusEvent` and bumps the version,
//! or fails and leaves the TRR untouched.

use crate::types::{StatusEvent, Timestamp, Trr, TrrError, TrrStatus, bound_note, require_actor};

// =============================================================================
// TRANSITION TABLE
// =============================================================================

impl TrrStatus {
    /// Terminal states accept no forward progress.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::NotApplicable)
    }

    /// Explicit edges, excluding the generic "-> rejected" edge.
    const fn progression(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Pending, Self::NotApplicable],
            Self::Pending => &[Self::InProgress, Self::NotApplicable],
            Self::InProgress => &[Self::InReview, Self::Deferred],
            Self::InReview => &[Self::Validated, Self::Failed],
            Self::Validated => &[Self::Completed, Self::Approved],
            Self::Approved => &[Self::Completed],
            Self::Rejected | Self::Deferred => &[Self::Pending],
            Self::Failed | Self::Completed | Self::NotApplicable => &[],
        }
    }

    /// Every status reachable in one step, in a stable order.
    #[must_use]
    pub fn allowed_next(self) -> Vec<Self> {
        let mut next = self.progression().to_vec();
        if !self.is_terminal() {
            next.push(Self::Rejected);
        }
        next
    }

    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.progression().contains(&to) || (to == Self::Rejected && !self.is_terminal())
    }

    /// A transition into this status must carry a non-blank note.
    #[must_use]
    pub const fn requires_note(self) -> bool {
        matches!(self, Self::Rejected)
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Applies lifecycle transitions to a TRR.
pub struct StatusMachine;

impl StatusMachine {
    /// Check a transition without applying it.
    pub fn check(
        trr: &Trr,
        to: TrrStatus,
        author: &str,
        note: Option<&str>,
    ) -> Result<(), TrrError> {
        let from = trr.status;
        if !from.can_transition_to(to) {
            return Err(TrrError::InvalidTransition {
                from,
                to,
                allowed: from.allowed_next(),
            });
        }
        require_actor("author_id", author)?;
        bound_note(note)?;
        if to.requires_note() && note.is_none_or(|n| n.trim().is_empty()) {
            return Err(TrrError::validation(
                "note",
                format!("a note is required when moving to '{to}'"),
            ));
        }
        Ok(())
    }

    /// Move `trr` to `to`, appending one status event and bumping its version.
    ///
    /// On error `trr` is unchanged.
    pub fn transition(
        trr: &mut Trr,
        to: TrrStatus,
        author: &str,
        note: Option<&str>,
        at: Timestamp,
    ) -> Result<(), TrrError> {
        Self::check(trr, to, author, note)?;

        trr.status = to;
        trr.status_history.push(StatusEvent {
            status: to,
            timestamp: at,
            author_id: author.to_string(),
            note: note
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        });
        trr.record_mutation(at);
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewTrr, TrrId};

    fn draft() -> Trr {
        Trr::draft(TrrId(1), NewTrr::titled("t"), "author", Timestamp(0))
    }

    fn walk(trr: &mut Trr, path: &[TrrStatus]) {
        for (i, &to) in path.iter().enumerate() {
            StatusMachine::transition(trr, to, "u", Some("step"), Timestamp(i as u64 + 1))
                .expect("transition on happy path");
        }
    }

    #[test]
    fn test_happy_path_to_completed() {
        let mut trr = draft();
        walk(
            &mut trr,
            &[
                TrrStatus::Pending,
                TrrStatus::InProgress,
                TrrStatus::InReview,
                TrrStatus::Validated,
                TrrStatus::Completed,
            ],
        );
        assert_eq!(trr.status(), TrrStatus::Completed);
        assert_eq!(trr.version(), 6);
        assert_eq!(trr.status_history().len(), 6);
        assert!(trr.status().allowed_next().is_empty());
    }

    #[test]
    fn test_in_progress_to_completed_rejected() {
        let mut trr = draft();
        walk(&mut trr, &[TrrStatus::Pending, TrrStatus::InProgress]);
        let before = trr.clone();

        let err = StatusMachine::transition(&mut trr, TrrStatus::Completed, "u", None, Timestamp(9))
            .unwrap_err();
        match err {
            TrrError::InvalidTransition { from, to, allowed } => {
                assert_eq!(from, TrrStatus::InProgress);
                assert_eq!(to, TrrStatus::Completed);
                assert_eq!(
                    allowed,
                    vec![TrrStatus::InReview, TrrStatus::Deferred, TrrStatus::Rejected]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(trr, before);
    }

    #[test]
    fn test_validated_to_completed_appends_one_event() {
        let mut trr = draft();
        walk(
            &mut trr,
            &[
                TrrStatus::Pending,
                TrrStatus::InProgress,
                TrrStatus::InReview,
                TrrStatus::Validated,
            ],
        );
        let len = trr.status_history().len();
        let version = trr.version();
        StatusMachine::transition(&mut trr, TrrStatus::Completed, "lead", None, Timestamp(50))
            .expect("validated -> completed");
        assert_eq!(trr.status_history().len(), len + 1);
        assert_eq!(trr.version(), version + 1);
        let last = trr.status_history().last().expect("event");
        assert_eq!(last.status, TrrStatus::Completed);
        assert_eq!(last.author_id, "lead");
        assert_eq!(last.timestamp, Timestamp(50));
    }

    #[test]
    fn test_reject_requires_note() {
        let mut trr = draft();
        for note in [None, Some(""), Some("   ")] {
            let err = StatusMachine::transition(&mut trr, TrrStatus::Rejected, "u", note, Timestamp(1))
                .unwrap_err();
            assert!(matches!(err, TrrError::Validation { ref field, .. } if field == "note"));
        }
        assert_eq!(trr.status(), TrrStatus::Draft);
        assert_eq!(trr.version(), 1);

        StatusMachine::transition(&mut trr, TrrStatus::Rejected, "u", Some(" out of scope "), Timestamp(2))
            .expect("reject with note");
        assert_eq!(trr.status(), TrrStatus::Rejected);
        assert_eq!(
            trr.status_history().last().and_then(|e| e.note.as_deref()),
            Some("out of scope")
        );
    }

    #[test]
    fn test_rejected_can_reopen_but_not_reject_again() {
        let mut trr = draft();
        StatusMachine::transition(&mut trr, TrrStatus::Rejected, "u", Some("no"), Timestamp(1))
            .expect("reject");
        assert_eq!(TrrStatus::Rejected.allowed_next(), vec![TrrStatus::Pending]);
        assert!(
            StatusMachine::transition(&mut trr, TrrStatus::Rejected, "u", Some("again"), Timestamp(2))
                .is_err()
        );
        StatusMachine::transition(&mut trr, TrrStatus::Pending, "u", None, Timestamp(3))
            .expect("reopen");
        assert_eq!(trr.status(), TrrStatus::Pending);
    }

    #[test]
    fn test_deferred_reopens_to_pending() {
        let mut trr = draft();
        walk(
            &mut trr,
            &[TrrStatus::Pending, TrrStatus::InProgress, TrrStatus::Deferred, TrrStatus::Pending],
        );
        assert_eq!(trr.status(), TrrStatus::Pending);
    }

    #[test]
    fn test_terminal_states_have_no_rejection_edge() {
        for status in TrrStatus::ALL {
            let rejectable = status.can_transition_to(TrrStatus::Rejected);
            assert_eq!(rejectable, !status.is_terminal(), "{status}");
        }
        assert!(TrrStatus::Completed.allowed_next().is_empty());
        assert!(TrrStatus::NotApplicable.allowed_next().is_empty());
    }

    #[test]
    fn test_approved_is_reachable() {
        let mut trr = draft();
        walk(
            &mut trr,
            &[
                TrrStatus::Pending,
                TrrStatus::InProgress,
                TrrStatus::InReview,
                TrrStatus::Validated,
                TrrStatus::Approved,
                TrrStatus::Completed,
            ],
        );
        assert_eq!(trr.status(), TrrStatus::Completed);
    }

    #[test]
    fn test_blank_author_rejected() {
        let mut trr = draft();
        let err = StatusMachine::transition(&mut trr, TrrStatus::Pending, " ", None, Timestamp(1))
            .unwrap_err();
        assert!(matches!(err, TrrError::Validation { ref field, .. } if field == "author_id"));
        assert_eq!(trr.version(), 1);
    }

    #[test]
    fn test_allowed_next_is_consistent_with_can_transition() {
        for from in TrrStatus::ALL {
            for to in TrrStatus::ALL {
                assert_eq!(from.allowed_next().contains(&to), from.can_transition_to(to));
            }
        }
    }
}
