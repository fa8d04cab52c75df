//! In-memory store backend.
//!
//! A `HashMap` behind a `parking_lot::RwLock`. Handles are cheap clones of
//! the same shared map, so a tree and a test can both hold one and observe
//! the same data — the same way a reopened embedded store would.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{StoreError, TreeBatch, TreeStore};

type SharedMap = Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>;

/// Shared in-memory key-value store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: SharedMap,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl TreeStore for MemoryStore {
    type Batch = MemoryBatch;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn new_batch(&self) -> MemoryBatch {
        MemoryBatch {
            inner: Arc::clone(&self.inner),
            staged: Vec::new(),
            value_size: 0,
        }
    }

    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Batch builder for [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryBatch {
    inner: SharedMap,
    staged: Vec<(Vec<u8>, Vec<u8>)>,
    value_size: usize,
}

impl TreeBatch for MemoryBatch {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.value_size += value.len();
        self.staged.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn value_size(&self) -> usize {
        self.value_size
    }

    fn write(&mut self) -> Result<(), StoreError> {
        let mut map = self.inner.write();
        for (key, value) in self.staged.drain(..) {
            map.insert(key, value);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.staged.clear();
        self.value_size = 0;
    }
}
