//! # redb-backed TRR Storage
//!
//! A disk-backed repository using the redb embedded database:
//! - ACID transactions (one commit per `put`)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded. The metadata table holds the identifier
//! counter and the record format version; opening a database written with a
//! different format version fails instead of misreading it.

use crate::repository::{TrrFilter, TrrRepository};
use crate::types::{Trr, TrrError, TrrId};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for records: TrrId(u64) -> postcard-encoded Trr
const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("trrs");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const LAST_ID_KEY: &str = "last_id";
const FORMAT_KEY: &str = "record_format";

/// Version of the postcard record layout. Bump on any breaking change to `Trr`.
pub const RECORD_FORMAT_VERSION: u64 = 1;

fn storage_err(e: impl std::fmt::Display) -> TrrError {
    TrrError::Storage(e.to_string())
}

fn encode(trr: &Trr) -> Result<Vec<u8>, TrrError> {
    postcard::to_allocvec(trr).map_err(|e| TrrError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Trr, TrrError> {
    postcard::from_bytes(bytes).map_err(|e| TrrError::Serialization(e.to_string()))
}

/// A disk-backed TRR repository.
pub struct RedbRepository {
    db: Database,
    last_id: u64,
}

impl std::fmt::Debug for RedbRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRepository")
            .field("last_id", &self.last_id)
            .finish_non_exhaustive()
    }
}

impl RedbRepository {
    /// Open or create a repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrrError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables and stamp the format on first open.
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(RECORDS).map_err(storage_err)?;
            {
                let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
                let stored = meta
                    .get(FORMAT_KEY)
                    .map_err(storage_err)?
                    .map(|v| v.value());
                match stored {
                    None => {
                        meta.insert(FORMAT_KEY, RECORD_FORMAT_VERSION)
                            .map_err(storage_err)?;
                    }
                    Some(v) if v == RECORD_FORMAT_VERSION => {}
                    Some(v) => {
                        return Err(TrrError::Storage(format!(
                            "unsupported record format {v} (expected {RECORD_FORMAT_VERSION})"
                        )));
                    }
                }
            }
            write_txn.commit().map_err(storage_err)?;
        }

        let last_id = {
            let read_txn = db.begin_read().map_err(storage_err)?;
            let table = read_txn.open_table(METADATA).map_err(storage_err)?;
            table
                .get(LAST_ID_KEY)
                .map_err(storage_err)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        Ok(Self { db, last_id })
    }

    /// Compact the database file. Returns `false` when there was nothing
    /// to reclaim.
    pub fn compact(&mut self) -> Result<bool, TrrError> {
        self.db.compact().map_err(storage_err)
    }
}

impl TrrRepository for RedbRepository {
    fn next_id(&mut self) -> Result<TrrId, TrrError> {
        let next = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| TrrError::Storage("identifier space exhausted".to_string()))?;

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            meta.insert(LAST_ID_KEY, next).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        self.last_id = next;
        Ok(TrrId(next))
    }

    fn get(&self, id: TrrId) -> Result<Option<Trr>, TrrError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(RECORDS).map_err(storage_err)?;
        let Some(bytes) = table.get(id.0).map_err(storage_err)? else {
            return Ok(None);
        };
        decode(bytes.value()).map(Some)
    }

    fn put(&mut self, trr: &Trr) -> Result<(), TrrError> {
        let bytes = encode(trr)?;
        let last_id = self.last_id.max(trr.id.0);

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut records = write_txn.open_table(RECORDS).map_err(storage_err)?;
            records
                .insert(trr.id.0, bytes.as_slice())
                .map_err(storage_err)?;
        }
        if last_id != self.last_id {
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            meta.insert(LAST_ID_KEY, last_id).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        self.last_id = last_id;
        Ok(())
    }

    fn list(&self, filter: &TrrFilter) -> Result<Vec<Trr>, TrrError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(RECORDS).map_err(storage_err)?;
        let limit = filter.limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            if out.len() >= limit {
                break;
            }
            let (_, value) = entry.map_err(storage_err)?;
            let trr = decode(value.value())?;
            if filter.matches(&trr) {
                out.push(trr);
            }
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize, TrrError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(RECORDS).map_err(storage_err)?;
        let len = table.len().map_err(storage_err)?;
        usize::try_from(len).map_err(storage_err)
    }
}
