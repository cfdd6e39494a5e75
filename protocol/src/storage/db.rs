//! # State DB — Generic Path-Keyed Key/Value Store
//!
//! The mutable state database the consensus core reads and writes through
//! three operations only: [`StateDb::get_value`], [`StateDb::execute_transaction_list`],
//! and [`StateDb::set_db_to_snapshot`]. Everything else about how the DB
//! represents, indexes, or persists arbitrary JSON values belongs to a
//! collaborator outside this core's scope — this module supplies one
//! concrete, sled-backed implementation so the rest of the crate has
//! something to run against.
//!
//! Keys are `/`-separated paths (`/consensus/number/42/propose`,
//! `/deposit_accounts/consensus/<addr>`); values are arbitrary
//! [`serde_json::Value`]s. Writing `Value::Null` at a path deletes it — this
//! is how the engine garbage-collects aged-out consensus records.

use sled::{Db, Tree};
use std::path::Path;

use crate::transaction::Transaction;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// A generic path-keyed state database.
#[derive(Debug, Clone)]
pub struct StateDb {
    db: Db,
    values: Tree,
}

impl StateDb {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// An in-memory database that disappears when dropped. Used for the
    /// reconstructor's snapshot DB and for tests.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let values = db.open_tree("values")?;
        Ok(Self { db, values })
    }

    /// Reads the value at `path`, or `None` if nothing is stored there.
    pub fn get_value(&self, path: &str) -> DbResult<Option<serde_json::Value>> {
        match self.values.get(path.as_bytes())? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Writes `value` at `path`. `Value::Null` deletes the entry.
    pub fn set_value(&self, path: &str, value: &serde_json::Value) -> DbResult<()> {
        if value.is_null() {
            self.values.remove(path.as_bytes())?;
        } else {
            let bytes =
                serde_json::to_vec(value).map_err(|e| DbError::Serialization(e.to_string()))?;
            self.values.insert(path.as_bytes(), bytes)?;
        }
        Ok(())
    }

    /// Applies every transaction's operation, in order, flattening batched
    /// `Operation::Set` lists into their leaf writes.
    pub fn execute_transaction_list(&self, transactions: &[Transaction]) -> DbResult<()> {
        for tx in transactions {
            for (path, value) in tx.operation.flatten() {
                self.set_value(path, value)?;
            }
        }
        Ok(())
    }

    /// Replaces this DB's contents with `snapshot`'s, matching the
    /// reconstructor's `reconstruct()` first step ("copy the snapshot db
    /// into the live db"). Existing entries not present in `snapshot` are
    /// removed.
    pub fn set_db_to_snapshot(&self, snapshot: &StateDb) -> DbResult<()> {
        self.values.clear()?;
        for entry in snapshot.values.iter() {
            let (key, value) = entry?;
            self.values.insert(key, value)?;
        }
        Ok(())
    }

    /// Reads every entry whose path starts with `prefix`. Used to scan
    /// per-height registration records (`/consensus/number/<n>/register/*`).
    pub fn scan_prefix(&self, prefix: &str) -> DbResult<Vec<(String, serde_json::Value)>> {
        let mut out = Vec::new();
        for entry in self.values.scan_prefix(prefix.as_bytes()) {
            let (key, bytes) = entry?;
            let path = String::from_utf8_lossy(&key).into_owned();
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| DbError::Serialization(e.to_string()))?;
            out.push((path, value));
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::Operation;
    use serde_json::json;

    #[test]
    fn missing_path_returns_none() {
        let db = StateDb::open_temporary().unwrap();
        assert_eq!(db.get_value("/nope").unwrap(), None);
    }

    #[test]
    fn set_then_get_roundtrips() {
        let db = StateDb::open_temporary().unwrap();
        db.set_value("/a", &json!({"x": 1})).unwrap();
        assert_eq!(db.get_value("/a").unwrap(), Some(json!({"x": 1})));
    }

    #[test]
    fn null_value_deletes() {
        let db = StateDb::open_temporary().unwrap();
        db.set_value("/a", &json!(1)).unwrap();
        assert!(db.get_value("/a").unwrap().is_some());
        db.set_value("/a", &serde_json::Value::Null).unwrap();
        assert_eq!(db.get_value("/a").unwrap(), None);
    }

    #[test]
    fn execute_transaction_list_applies_batched_ops() {
        let db = StateDb::open_temporary().unwrap();
        let tx = TransactionBuilder::new("engine")
            .operation(Operation::batch(vec![
                Operation::set_value("/consensus/number/21/propose", json!({"n": 21})),
                Operation::delete("/consensus/number/1"),
            ]))
            .skip_verif(true)
            .build();

        db.set_value("/consensus/number/1", &json!({"n": 1})).unwrap();
        db.execute_transaction_list(&[tx]).unwrap();

        assert_eq!(
            db.get_value("/consensus/number/21/propose").unwrap(),
            Some(json!({"n": 21}))
        );
        assert_eq!(db.get_value("/consensus/number/1").unwrap(), None);
    }

    #[test]
    fn set_db_to_snapshot_replaces_contents() {
        let live = StateDb::open_temporary().unwrap();
        live.set_value("/stale", &json!(1)).unwrap();

        let snapshot = StateDb::open_temporary().unwrap();
        snapshot.set_value("/fresh", &json!(2)).unwrap();

        live.set_db_to_snapshot(&snapshot).unwrap();

        assert_eq!(live.get_value("/stale").unwrap(), None);
        assert_eq!(live.get_value("/fresh").unwrap(), Some(json!(2)));
    }

    #[test]
    fn scan_prefix_finds_matching_entries_only() {
        let db = StateDb::open_temporary().unwrap();
        db.set_value("/consensus/number/5/register/aaaa", &json!({"stake": 1})).unwrap();
        db.set_value("/consensus/number/5/register/bbbb", &json!({"stake": 2})).unwrap();
        db.set_value("/consensus/number/6/register/aaaa", &json!({"stake": 3})).unwrap();

        let entries = db.scan_prefix("/consensus/number/5/register/").unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn len_tracks_entries() {
        let db = StateDb::open_temporary().unwrap();
        assert_eq!(db.len(), 0);
        db.set_value("/a", &json!(1)).unwrap();
        db.set_value("/b", &json!(2)).unwrap();
        assert_eq!(db.len(), 2);
    }
}
