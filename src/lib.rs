// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Coppice — Persistent Versioned Sparse Merkle Tree
//!
//! A coppice is a tree that gets cut back on a schedule and keeps growing
//! anyway. So does this one: a sparse Merkle tree over a fixed-width integer
//! key space that remembers every committed version, prunes the history you
//! no longer need, and evicts cold subtrees from memory without ever losing
//! them on disk.
//!
//! Coppice is built as a cryptographic accumulator for chain-style state
//! commitments: insert a hash at any key, commit to get a new version,
//! produce constant-depth inclusion proofs, read snapshots at any retained
//! past version, and roll the whole tree back when consensus says so.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual layers of the tree:
//!
//! - **hash** — The hasher seam and the precomputed empty-subtree table.
//! - **tree** — The engine: traversal, copy-on-write mutation, the commit
//!   journal, proofs, rollback, and the residency manager.
//! - **store** — The pluggable ordered key-value backend. Ships with an
//!   in-memory map and an embedded sled store; bring your own if you must.
//! - **config** — Tuning knobs and the persistent key layout.
//! - **error** — Every way this can fail, in one enum.
//!
//! ## The packed node
//!
//! The trick that makes this practical is the fan-out-16 node: four binary
//! levels collapsed into a single record holding 16 children and 14 internal
//! hashes. One store read restores four proof steps and every sibling hash a
//! prover needs at that level. See [`tree`] for the full story.
//!
//! ## Example
//!
//! ```
//! use coppice::{Sha256Hasher, SparseMerkleTree, TreeHasher};
//!
//! let hasher = Sha256Hasher;
//! let nil_leaf = hasher.digest(b"coppice:nil");
//! let mut tree = SparseMerkleTree::in_memory(hasher, 8, nil_leaf).unwrap();
//!
//! let value = tree.hasher().digest(b"hello");
//! tree.set(42, value.clone()).unwrap();
//! let version = tree.commit(None).unwrap();
//!
//! assert_eq!(tree.get(42, Some(version)).unwrap(), value);
//! let proof = tree.get_proof(42).unwrap();
//! assert!(tree.verify_proof(42, &proof));
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod store;
pub mod tree;

pub use config::TreeConfig;
pub use error::TreeError;
pub use hash::{Blake3Hasher, NilHashes, Sha256Hasher, TreeHasher};
pub use store::memory::MemoryStore;
pub use store::sled::SledStore;
pub use store::{StoreError, TreeBatch, TreeStore};
pub use tree::node::Version;
pub use tree::proof::MerkleProof;
pub use tree::SparseMerkleTree;
