//! Error types for the tree engine.
//!
//! Every fallible tree operation returns a [`TreeError`]. Propagation is
//! fail-fast: nothing is retried internally, and a failed operation leaves
//! the in-memory state consistent with the last successful commit once
//! [`reset`](crate::SparseMerkleTree::reset) has run.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while constructing or operating the tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Construction-time: depth was zero, not a multiple of 4, or above 64.
    #[error("tree depth must be a positive multiple of 4, at most 64")]
    InvalidDepth,

    /// The key does not fit in the tree's `2^depth` key space.
    #[error("key exceeds the tree's key space")]
    InvalidKey,

    /// A read or rollback was attempted against a tree with no commits.
    #[error("tree has no committed state")]
    EmptyRoot,

    /// The requested version is below the retention floor and has been pruned.
    #[error("requested version is below the retention floor")]
    VersionTooOld,

    /// The requested version is above the latest commit, or a commit was
    /// given a retention floor not strictly below the new version.
    #[error("requested version is above the latest committed version")]
    VersionTooHigh,

    /// A node record the engine expected to find is missing from the store.
    #[error("expected node record is missing from the store")]
    NodeNotFound,

    /// The persistent state disagrees with itself (e.g. the stored root's
    /// newest version does not match the `latestVersion` metadata).
    #[error("unexpected tree state")]
    Unexpected,

    /// A persistent record failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The key-value backend failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
