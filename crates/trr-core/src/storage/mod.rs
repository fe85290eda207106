//! # Storage Backends
//!
//! Persistent implementations of [`TrrRepository`](crate::repository::TrrRepository).

mod redb_store;

pub use redb_store::RedbRepository;
