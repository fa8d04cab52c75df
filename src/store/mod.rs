//! # Key-Value Store Interface
//!
//! The tree persists packed-node records through a deliberately small
//! ordered byte-key store interface: point reads plus an atomic batch
//! writer. No iteration, no transactions, no watch semantics — the engine
//! does not need them, and every additional requirement shrinks the set of
//! backends that qualify.
//!
//! Two backends ship with the crate:
//!
//! - [`memory::MemoryStore`] — a `HashMap` behind a lock. The default for
//!   fresh trees and the workhorse of the test suite.
//! - [`sled::SledStore`] — an embedded log-structured store with genuinely
//!   atomic batches.
//!
//! ## Atomicity contract
//!
//! A commit writes every touched node record together with the version
//! metadata through one [`TreeBatch`]. The backend must apply a batch
//! all-or-nothing; if it cannot, crash recovery is on the caller. Oversized
//! commits are flushed in sub-batches, which narrows the atomic unit to a
//! sub-batch — the final flush always carries the metadata keys, so a crash
//! between flushes leaves a readable (if slightly fatter) store.

use thiserror::Error;

pub mod memory;
pub mod sled;

/// Errors surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded sled backend failed.
    #[error("sled error: {0}")]
    Sled(#[from] ::sled::Error),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// An ordered byte-key store with point reads and batch writes.
pub trait TreeStore {
    /// The batch builder this store hands out.
    type Batch: TreeBatch;

    /// Point read. `Ok(None)` means the key has never been written — for
    /// node records that is a normal answer ("empty here"), not an error.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Start an empty batch.
    fn new_batch(&self) -> Self::Batch;

    /// Release backend resources, flushing anything buffered.
    fn close(&self) -> Result<(), StoreError>;
}

/// A write batch: staged `set`s that land atomically on `write`.
pub trait TreeBatch {
    /// Stage a key-value pair.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Total bytes of staged values, used to decide when to flush.
    fn value_size(&self) -> usize;

    /// Apply every staged pair atomically.
    fn write(&mut self) -> Result<(), StoreError>;

    /// Drop any staged state and zero the size counter.
    fn reset(&mut self);
}
