//! Embedded sled store backend.
//!
//! sled organizes data into named trees (think column families), each an
//! independent keyspace within one database file set. The tree's records
//! live in a dedicated named tree so a larger application can host several
//! independent sparse Merkle trees — or unrelated data — in the same
//! database without key collisions.
//!
//! `apply_batch` is atomic: either every staged pair lands or none does,
//! which is exactly the contract a commit needs for its node records and
//! version metadata.

use std::path::Path;

use super::{StoreError, TreeBatch, TreeStore};

/// Default named tree for node records.
const DEFAULT_NAMESPACE: &str = "smt_nodes";

/// Key-value store backed by an embedded sled database.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a database at the given path, using the default
    /// namespace for node records.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::with_namespace(&db, DEFAULT_NAMESPACE)
    }

    /// Create a temporary database that is deleted on drop. Ideal for
    /// tests — no filesystem residue, no cleanup.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_namespace(&db, DEFAULT_NAMESPACE)
    }

    /// Wrap a named tree of an existing sled database. Lets several trees
    /// (or other data) share one database under distinct namespaces.
    pub fn with_namespace(db: &sled::Db, namespace: &str) -> Result<Self, StoreError> {
        let tree = db.open_tree(namespace)?;
        Ok(Self {
            db: db.clone(),
            tree,
        })
    }

    /// Block until all applied writes are durable on disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl TreeStore for SledStore {
    type Batch = SledBatch;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn new_batch(&self) -> SledBatch {
        SledBatch {
            tree: self.tree.clone(),
            batch: sled::Batch::default(),
            value_size: 0,
        }
    }

    fn close(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

/// Batch builder for [`SledStore`].
pub struct SledBatch {
    tree: sled::Tree,
    batch: sled::Batch,
    value_size: usize,
}

impl TreeBatch for SledBatch {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.batch.insert(key, value);
        self.value_size += value.len();
        Ok(())
    }

    fn value_size(&self) -> usize {
        self.value_size
    }

    fn write(&mut self) -> Result<(), StoreError> {
        self.tree.apply_batch(std::mem::take(&mut self.batch))?;
        Ok(())
    }

    fn reset(&mut self) {
        self.batch = sled::Batch::default();
        self.value_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_applies_atomically() {
        let store = SledStore::temporary().unwrap();
        let mut batch = store.new_batch();

        batch.set(b"x", b"one").unwrap();
        batch.set(b"y", b"two").unwrap();
        assert_eq!(store.get(b"x").unwrap(), None);

        batch.write().unwrap();
        assert_eq!(store.get(b"x").unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get(b"y").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn namespaces_are_isolated() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let left = SledStore::with_namespace(&db, "left").unwrap();
        let right = SledStore::with_namespace(&db, "right").unwrap();

        let mut batch = left.new_batch();
        batch.set(b"k", b"v").unwrap();
        batch.write().unwrap();

        assert_eq!(left.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(right.get(b"k").unwrap(), None);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SledStore::open(dir.path()).unwrap();
            let mut batch = store.new_batch();
            batch.set(b"durable", b"yes").unwrap();
            batch.write().unwrap();
            store.close().unwrap();
        }

        let reopened = SledStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(b"durable").unwrap(), Some(b"yes".to_vec()));
    }
}
