//! # Repository
//!
//! Storage abstraction for TRR records.
//!
//! The engine owns exactly one repository per session. There is no global
//! store: tenants and tests each construct their own.
//!
//! All fallible operations return `Result<T, TrrError>` so in-memory and
//! persistent backends are used uniformly.

use crate::types::{Category, Priority, Timestamp, Trr, TrrError, TrrId, TrrStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// REPOSITORY TRAIT
// =============================================================================

/// Record storage used by the engine.
///
/// Records are never hard-deleted; [`TrrRepository::soft_delete`] archives them.
pub trait TrrRepository {
    /// Reserve the next identifier. Identifiers are never reused.
    fn next_id(&mut self) -> Result<TrrId, TrrError>;

    /// Load a record by id.
    fn get(&self, id: TrrId) -> Result<Option<Trr>, TrrError>;

    /// Insert or replace a record atomically.
    fn put(&mut self, trr: &Trr) -> Result<(), TrrError>;

    /// Records matching `filter`, ordered by id.
    fn list(&self, filter: &TrrFilter) -> Result<Vec<Trr>, TrrError>;

    /// Number of stored records, archived ones included.
    fn count(&self) -> Result<usize, TrrError>;

    /// Archive a record, bumping its version. Returns the archived record, or
    /// `None` if the id is unknown. Archiving twice is a no-op.
    fn soft_delete(&mut self, id: TrrId, at: Timestamp) -> Result<Option<Trr>, TrrError> {
        let Some(mut trr) = self.get(id)? else {
            return Ok(None);
        };
        if !trr.is_archived() {
            trr.archive(at);
            self.put(&trr)?;
        }
        Ok(Some(trr))
    }
}

// =============================================================================
// LIST FILTER
// =============================================================================

/// Filter for [`TrrRepository::list`]. Empty lists and `None` match anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrrFilter {
    pub statuses: Vec<TrrStatus>,
    pub priorities: Vec<Priority>,
    pub categories: Vec<Category>,
    pub assignee: Option<String>,
    pub tag: Option<String>,
    pub include_archived: bool,
    pub limit: Option<usize>,
}

impl TrrFilter {
    /// Filter that matches every live record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn matches(&self, trr: &Trr) -> bool {
        (self.include_archived || !trr.is_archived())
            && (self.statuses.is_empty() || self.statuses.contains(&trr.status()))
            && (self.priorities.is_empty() || self.priorities.contains(&trr.priority))
            && (self.categories.is_empty()
                || trr.category.is_some_and(|c| self.categories.contains(&c)))
            && self
                .assignee
                .as_deref()
                .is_none_or(|a| trr.assignee.as_deref() == Some(a))
            && self.tag.as_ref().is_none_or(|t| trr.tags.contains(t))
    }

    /// Apply the filter to an id-ordered iterator.
    pub fn select<'a>(&self, records: impl Iterator<Item = &'a Trr>) -> Vec<Trr> {
        records
            .filter(|t| self.matches(t))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

// =============================================================================
// IN-MEMORY REPOSITORY
// =============================================================================

/// Volatile repository backed by a `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    records: BTreeMap<TrrId, Trr>,
    last_id: u64,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrrRepository for InMemoryRepository {
    fn next_id(&mut self) -> Result<TrrId, TrrError> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| TrrError::Storage("identifier space exhausted".to_string()))?;
        Ok(TrrId(self.last_id))
    }

    fn get(&self, id: TrrId) -> Result<Option<Trr>, TrrError> {
        Ok(self.records.get(&id).cloned())
    }

    fn put(&mut self, trr: &Trr) -> Result<(), TrrError> {
        self.last_id = self.last_id.max(trr.id.0);
        self.records.insert(trr.id, trr.clone());
        Ok(())
    }

    fn list(&self, filter: &TrrFilter) -> Result<Vec<Trr>, TrrError> {
        Ok(filter.select(self.records.values()))
    }

    fn count(&self) -> Result<usize, TrrError> {
        Ok(self.records.len())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewTrr;

    fn stored(repo: &mut InMemoryRepository, fields: NewTrr) -> Trr {
        let id = repo.next_id().unwrap();
        let trr = Trr::draft(id, fields, "a", Timestamp(0));
        repo.put(&trr).unwrap();
        trr
    }

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let mut repo = InMemoryRepository::new();
        assert_eq!(repo.next_id().unwrap(), TrrId(1));
        assert_eq!(repo.next_id().unwrap(), TrrId(2));
        let trr = Trr::draft(TrrId(10), NewTrr::titled("t"), "a", Timestamp(0));
        repo.put(&trr).unwrap();
        assert_eq!(repo.next_id().unwrap(), TrrId(11));
    }

    #[test]
    fn test_soft_delete_archives_and_keeps_record() {
        let mut repo = InMemoryRepository::new();
        let trr = stored(&mut repo, NewTrr::titled("t"));
        let archived = repo.soft_delete(trr.id, Timestamp(5)).unwrap().unwrap();
        assert!(archived.is_archived());
        assert_eq!(archived.version(), 2);
        assert_eq!(archived.status_history(), trr.status_history());
        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.list(&TrrFilter::all()).unwrap().is_empty());
        let with_archived = TrrFilter {
            include_archived: true,
            ..TrrFilter::default()
        };
        assert_eq!(repo.list(&with_archived).unwrap().len(), 1);

        let again = repo.soft_delete(trr.id, Timestamp(6)).unwrap().unwrap();
        assert_eq!(again.version(), 2);
        assert_eq!(repo.soft_delete(TrrId(99), Timestamp(7)).unwrap(), None);
    }

    #[test]
    fn test_filters_combine() {
        let mut repo = InMemoryRepository::new();
        stored(
            &mut repo,
            NewTrr {
                priority: Priority::High,
                category: Some(Category::Security),
                assignee: Some("alice".into()),
                tags: ["sso".to_string()].into(),
                ..NewTrr::titled("a")
            },
        );
        stored(
            &mut repo,
            NewTrr {
                priority: Priority::Low,
                category: Some(Category::Performance),
                ..NewTrr::titled("b")
            },
        );

        let by_priority = TrrFilter {
            priorities: vec![Priority::High],
            ..TrrFilter::default()
        };
        assert_eq!(repo.list(&by_priority).unwrap().len(), 1);

        let by_assignee_and_tag = TrrFilter {
            assignee: Some("alice".into()),
            tag: Some("sso".into()),
            ..TrrFilter::default()
        };
        assert_eq!(repo.list(&by_assignee_and_tag).unwrap()[0].title, "a");

        let mismatch = TrrFilter {
            categories: vec![Category::Compliance],
            ..TrrFilter::default()
        };
        assert!(repo.list(&mismatch).unwrap().is_empty());

        let limited = TrrFilter {
            limit: Some(1),
            ..TrrFilter::default()
        };
        assert_eq!(repo.list(&limited).unwrap().len(), 1);
    }
}
