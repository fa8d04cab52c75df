//! # Hashing
//!
//! The tree is parameterised by a collision-resistant binary hash through
//! the [`TreeHasher`] trait. Two implementations ship with the crate:
//!
//! - **SHA-256** — For interoperability with everything that settled on
//!   SHA-256 a decade ago and never looked back.
//! - **BLAKE3** — Markedly faster on every platform we care about, with the
//!   same 256-bit output. Prefer it when the root never leaves your system.
//!
//! Both are stateless and infallible; the output length is fixed per
//! instance, and nothing in the tree assumes a particular length.
//!
//! The second half of this module is the [`NilHashes`] table: the hash of an
//! empty subtree at every depth, computed bottom-up from the nil leaf hash
//! supplied at construction. Sparse trees stand on this table — every absent
//! sibling in a proof and every untouched child slot resolves to one of
//! these values instead of a materialised subtree.

use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// TreeHasher
// ---------------------------------------------------------------------------

/// A stateless binary hash function.
///
/// `hash_pair` is the operation the tree actually uses: combining two
/// equal-length child hashes into a parent. `digest` hashes a single byte
/// string and exists for callers building leaf values.
pub trait TreeHasher {
    /// Hash a single byte string.
    fn digest(&self, data: &[u8]) -> Vec<u8>;

    /// Hash the concatenation of two byte strings.
    fn hash_pair(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(left.len() + right.len());
        buf.extend_from_slice(left);
        buf.extend_from_slice(right);
        self.digest(&buf)
    }
}

/// SHA-256 hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl TreeHasher for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }
}

/// BLAKE3 hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl TreeHasher for Blake3Hasher {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }
}

// ---------------------------------------------------------------------------
// NilHashes
// ---------------------------------------------------------------------------

/// Precomputed empty-subtree hashes, indexed by depth.
///
/// `get(max_depth)` is the nil leaf hash supplied at construction;
/// `get(d) = H(get(d + 1), get(d + 1))` all the way up to the empty root at
/// depth 0. Fixed after construction.
#[derive(Debug, Clone)]
pub struct NilHashes {
    hashes: Vec<Vec<u8>>,
}

impl NilHashes {
    /// Build the table for a tree of the given depth.
    pub fn build<H: TreeHasher>(hasher: &H, max_depth: u8, nil_leaf_hash: Vec<u8>) -> Self {
        let mut hashes = vec![Vec::new(); max_depth as usize + 1];
        hashes[max_depth as usize] = nil_leaf_hash;
        for depth in (0..max_depth as usize).rev() {
            hashes[depth] = hasher.hash_pair(&hashes[depth + 1], &hashes[depth + 1]);
        }
        Self { hashes }
    }

    /// The empty-subtree hash at `depth`. Depths beyond the table (used by
    /// leaf-level nodes asking about their nonexistent children) resolve to
    /// the empty byte string, which no real hash ever equals.
    pub fn get(&self, depth: u8) -> &[u8] {
        self.hashes
            .get(depth as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
