//! # The Tree Engine
//!
//! A persistent, versioned sparse Merkle tree over a fixed-width integer
//! key space, packed four binary levels per node and backed by an ordered
//! key-value store.
//!
//! ## How a write travels
//!
//! [`SparseMerkleTree::set`] walks `max_depth / 4` packed-node levels from
//! the root, materialising missing nodes from the store on the way down,
//! then recomputes the hash path on the way back up. Every touched node is
//! registered in the journal under `(depth, path)`. Nothing is durable yet:
//! consecutive sets share the tentative version `current + 1`, and a re-set
//! of the same key simply overwrites within that version.
//!
//! [`SparseMerkleTree::commit`] encodes every journaled node and writes
//! them, together with the `latestVersion` metadata (and the retention
//! floor, when one is supplied), in one atomic store batch — flushing
//! sub-batches when the staged bytes exceed the configured limit. On
//! success the version advances, the journal clears, and a collapsed
//! snapshot of the root is kept so [`SparseMerkleTree::reset`] can discard
//! uncommitted work without touching the store.
//!
//! ## States
//!
//! - *Empty*: no commit yet; the root is the depth-0 nil hash.
//! - *Live, clean*: journal empty, root equals the last committed root.
//! - *Live, dirty*: journal non-empty, pending root differs; `commit`
//!   returns to clean at `current + 1`, `reset` returns to clean as-is.
//!
//! ## Memory
//!
//! Resident nodes are owned exclusively by their parents. After each commit
//! the residency manager compares the working set against its threshold and
//! may evict subtrees whose newest version sits below the retention floor;
//! eviction clears the parent slot and the store copy remains
//! authoritative. Evicted subtrees — and their siblings, which proofs need
//! for adjacent hashes — are re-materialised from the store on demand.
//!
//! ## Concurrency
//!
//! None. The engine is single-threaded and takes no locks; even reads
//! materialise nodes in place. Callers that share a tree must serialise
//! access externally.

mod codec;
mod gc;
pub mod node;
pub mod proof;

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::{decode_version, node_key, TreeConfig, LATEST_VERSION_KEY, RECENT_VERSION_KEY};
use crate::error::TreeError;
use crate::hash::{NilHashes, TreeHasher};
use crate::store::memory::MemoryStore;
use crate::store::{TreeBatch, TreeStore};
use codec::StoredNode;
use gc::GcStatus;
use node::{Child, TreeNode, Version};
use proof::{helper_bits, MerkleProof};

/// Journal coordinates of a touched node. The nodes themselves stay in the
/// tree; commit resolves the coordinates with one pre-order walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct JournalKey {
    depth: u8,
    path: u64,
}

/// A persistent, versioned sparse Merkle tree.
///
/// Generic over the hash function and the key-value backend. See the
/// [module docs](self) for the operational model and the crate docs for a
/// usage example.
pub struct SparseMerkleTree<H: TreeHasher, S: TreeStore> {
    version: Version,
    recent_version: Version,
    root: TreeNode,
    last_saved_root: TreeNode,
    journal: BTreeSet<JournalKey>,
    max_depth: u8,
    nil_hashes: NilHashes,
    hasher: H,
    store: S,
    batch_size_limit: usize,
    gc: GcStatus,
}

impl<H: TreeHasher> SparseMerkleTree<H, MemoryStore> {
    /// A fresh tree over a private in-memory store with default options.
    pub fn in_memory(hasher: H, max_depth: u8, nil_leaf_hash: Vec<u8>) -> Result<Self, TreeError> {
        Self::new(
            hasher,
            MemoryStore::new(),
            max_depth,
            nil_leaf_hash,
            TreeConfig::default(),
        )
    }
}

impl<H: TreeHasher, S: TreeStore> SparseMerkleTree<H, S> {
    /// Open a tree over `store`, recovering any previously committed state.
    ///
    /// `max_depth` must be a positive multiple of 4, at most 64. The nil
    /// leaf hash seeds the empty-subtree table; every other depth is
    /// derived from it bottom-up.
    ///
    /// When the store already holds a tree, the decoded root's newest
    /// version must agree with the `latestVersion` metadata — a mismatch is
    /// storage corruption and surfaces as [`TreeError::Unexpected`].
    pub fn new(
        hasher: H,
        store: S,
        max_depth: u8,
        nil_leaf_hash: Vec<u8>,
        config: TreeConfig,
    ) -> Result<Self, TreeError> {
        if max_depth == 0 || max_depth % 4 != 0 || max_depth > 64 {
            return Err(TreeError::InvalidDepth);
        }

        let nil_hashes = NilHashes::build(&hasher, max_depth, nil_leaf_hash);
        let root = TreeNode::new(0, 0, &nil_hashes);
        let mut tree = Self {
            version: 0,
            recent_version: 0,
            last_saved_root: root.clone(),
            root,
            journal: BTreeSet::new(),
            max_depth,
            nil_hashes,
            hasher,
            store,
            batch_size_limit: config.batch_size_limit,
            gc: GcStatus::new(config.gc_threshold),
        };
        tree.init_from_store()?;
        Ok(tree)
    }

    fn init_from_store(&mut self) -> Result<(), TreeError> {
        let Some(buf) = self.store.get(LATEST_VERSION_KEY)? else {
            return Ok(());
        };
        self.version = decode_version(&buf).ok_or(TreeError::Unexpected)?;

        if let Some(buf) = self.store.get(RECENT_VERSION_KEY)? {
            self.recent_version = decode_version(&buf).ok_or(TreeError::Unexpected)?;
        }

        let Some(bytes) = self.store.get(&node_key(0, 0))? else {
            return Ok(());
        };
        self.root = StoredNode::decode(&bytes)?.into_node(0, 0, &self.nil_hashes);
        if let Some(latest) = self.root.latest_version() {
            if latest != self.version {
                return Err(TreeError::Unexpected);
            }
        }
        self.last_saved_root = self.root.clone();
        Ok(())
    }

    // -- Readers ------------------------------------------------------------

    /// The hasher this tree was built with.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// The latest committed version; 0 before the first commit.
    pub fn latest_version(&self) -> Version {
        self.version
    }

    /// The retention floor: the oldest version reads are answered for.
    pub fn recent_version(&self) -> Version {
        self.recent_version
    }

    /// The current root hash (the pending root while sets are uncommitted).
    pub fn root(&self) -> Vec<u8> {
        self.root.root().to_vec()
    }

    /// Whether the tree has no content at all — the root equals the
    /// depth-0 nil hash.
    pub fn is_empty(&self) -> bool {
        self.root.root() == self.nil_hashes.get(0)
    }

    /// Estimated resident bytes of the in-memory tree.
    pub fn size(&self) -> u64 {
        self.root.size(self.recent_version).0
    }

    fn check_key(&self, key: u64) -> Result<(), TreeError> {
        if self.max_depth < 64 && key >> self.max_depth != 0 {
            return Err(TreeError::InvalidKey);
        }
        Ok(())
    }

    // -- Writes -------------------------------------------------------------

    /// Insert or overwrite the value hash at `key` under the tentative
    /// version `current + 1`. Durable only after [`commit`](Self::commit).
    pub fn set(&mut self, key: u64, value: Vec<u8>) -> Result<(), TreeError> {
        self.check_key(key)?;
        let version = self.version + 1;
        Self::set_walk(
            &self.store,
            &self.hasher,
            &self.nil_hashes,
            &mut self.journal,
            &mut self.root,
            key,
            value,
            version,
            self.max_depth,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn set_walk(
        store: &S,
        hasher: &H,
        nil: &NilHashes,
        journal: &mut BTreeSet<JournalKey>,
        node: &mut TreeNode,
        key: u64,
        value: Vec<u8>,
        version: Version,
        max_depth: u8,
    ) -> Result<(), TreeError> {
        journal.insert(JournalKey {
            depth: node.depth(),
            path: node.path(),
        });

        if node.depth() == max_depth {
            node.set_leaf(value, version);
            return Ok(());
        }

        let child_depth = node.depth() + 4;
        let path = key >> (max_depth - child_depth);
        let nibble = (path & 0xf) as usize;

        // The sibling slot is extended too: after an eviction its root hash
        // exists only in the store, and the recomputation below needs it.
        extend_child(store, nil, node, nibble ^ 1, path ^ 1, child_depth)?;
        let child = extend_child(store, nil, node, nibble, path, child_depth)?;
        Self::set_walk(
            store, hasher, nil, journal, child, key, value, version, max_depth,
        )?;

        node.update_child_root(hasher, nibble, version);
        Ok(())
    }

    /// Persist every journaled node and advance to version `current + 1`.
    ///
    /// `retention_floor`, when supplied, becomes the new recent version:
    /// journaled nodes are pruned down to one entry below it, and reads
    /// older than it start failing with [`TreeError::VersionTooOld`]. The
    /// floor must be strictly below the new version.
    pub fn commit(&mut self, retention_floor: Option<Version>) -> Result<Version, TreeError> {
        let new_version = self.version + 1;
        if let Some(floor) = retention_floor {
            if floor >= new_version {
                return Err(TreeError::VersionTooHigh);
            }
        }

        let mut batch = self.store.new_batch();
        Self::commit_walk(
            &mut self.root,
            &self.journal,
            retention_floor,
            &mut batch,
            self.batch_size_limit,
        )?;
        batch.set(LATEST_VERSION_KEY, &new_version.to_be_bytes())?;
        if let Some(floor) = retention_floor {
            batch.set(RECENT_VERSION_KEY, &floor.to_be_bytes())?;
        }
        batch.write()?;

        self.version = new_version;
        if let Some(floor) = retention_floor {
            self.recent_version = floor;
        }

        let touched = self.journal.len();
        let (current_size, mut releasable) = self.root.size(self.recent_version);
        if let Some(release_version) = self.gc.pop(current_size) {
            let released = self.root.release(release_version);
            releasable = releasable.saturating_sub(released);
            debug!(release_version, released, "evicted cold subtrees");
        }
        self.gc.add(self.recent_version, releasable);

        self.journal.clear();
        self.last_saved_root = self.root.collapse();
        debug!(version = new_version, nodes = touched, "committed");
        Ok(new_version)
    }

    /// Post-order over the journaled nodes: children first, so every
    /// embedded child version list is already pruned when its parent is
    /// encoded. The journal is upward-closed (a set touches the whole
    /// path), so an unjournaled node has no journaled descendants.
    fn commit_walk(
        node: &mut TreeNode,
        journal: &BTreeSet<JournalKey>,
        floor: Option<Version>,
        batch: &mut S::Batch,
        limit: usize,
    ) -> Result<(), TreeError> {
        if !journal.contains(&JournalKey {
            depth: node.depth(),
            path: node.path(),
        }) {
            return Ok(());
        }

        for child in &mut node.children {
            if let Child::Resident(child) = child {
                Self::commit_walk(child, journal, floor, batch, limit)?;
            }
        }

        if let Some(floor) = floor {
            node.prune(floor);
        }
        let bytes = StoredNode::from_node(node).encode()?;
        batch.set(&node_key(node.depth(), node.path()), &bytes)?;
        if batch.value_size() > limit {
            batch.write()?;
            batch.reset();
        }
        Ok(())
    }

    /// Discard every uncommitted set and restore the last committed root.
    pub fn reset(&mut self) {
        self.journal.clear();
        self.root = self.last_saved_root.clone();
    }

    /// Roll the tree back to `target`, truncating every node's history
    /// above it, persisting the truncated records, and writing
    /// `latestVersion = target`.
    ///
    /// Subtrees whose newest version is already at or below the target are
    /// left untouched — including their persisted records, so a rollback
    /// never reclaims disk space, it only rewrites surviving paths.
    pub fn rollback(&mut self, target: Version) -> Result<(), TreeError> {
        if self.is_empty() {
            return Err(TreeError::EmptyRoot);
        }
        if self.recent_version > target {
            return Err(TreeError::VersionTooOld);
        }
        if target > self.version {
            return Err(TreeError::VersionTooHigh);
        }

        self.reset();

        let mut batch = self.store.new_batch();
        Self::rollback_walk(
            &self.store,
            &self.hasher,
            &self.nil_hashes,
            &mut self.root,
            target,
            &mut batch,
            self.batch_size_limit,
        )?;
        batch.set(LATEST_VERSION_KEY, &target.to_be_bytes())?;
        batch.write()?;

        self.version = target;
        self.last_saved_root = self.root.collapse();
        debug!(version = target, "rolled back");
        Ok(())
    }

    /// Truncate this node, recurse into every child recorded above the
    /// target (materialising placeholders from the store), recompute the
    /// internals from the truncated child roots, and persist. A node that
    /// drops nothing has no descendant above the target either — every set
    /// stamps the whole path — so the walk short-circuits there.
    #[allow(clippy::too_many_arguments)]
    fn rollback_walk(
        store: &S,
        hasher: &H,
        nil: &NilHashes,
        node: &mut TreeNode,
        target: Version,
        batch: &mut S::Batch,
        limit: usize,
    ) -> Result<(), TreeError> {
        if !node.rollback(target) {
            return Ok(());
        }

        if !node.is_leaf() {
            let child_depth = node.depth() + 4;
            for nibble in 0..16usize {
                let stale = node.children[nibble]
                    .latest_version()
                    .is_some_and(|version| version > target);
                if stale {
                    let path = (node.path() << 4) | nibble as u64;
                    let child = extend_child(store, nil, node, nibble, path, child_depth)?;
                    Self::rollback_walk(store, hasher, nil, child, target, batch, limit)?;
                }
            }
            node.recompute_internals(hasher);
        }

        let bytes = StoredNode::from_node(node).encode()?;
        batch.set(&node_key(node.depth(), node.path()), &bytes)?;
        if batch.value_size() > limit {
            batch.write()?;
            batch.reset();
        }
        Ok(())
    }

    // -- Reads --------------------------------------------------------------

    /// Read the value hash at `key` as of `version` (default: latest).
    ///
    /// Reads go straight to the leaf's persistent record, so uncommitted
    /// sets are not visible here. An absent record — or a record with no
    /// entry at or below the requested version — answers with the leaf
    /// nil hash: the key provably held nothing then.
    pub fn get(&self, key: u64, version: Option<Version>) -> Result<Vec<u8>, TreeError> {
        if self.is_empty() {
            return Err(TreeError::EmptyRoot);
        }
        self.check_key(key)?;

        let version = version.unwrap_or(self.version);
        if self.recent_version > version {
            return Err(TreeError::VersionTooOld);
        }
        if version > self.version {
            return Err(TreeError::VersionTooHigh);
        }
        if version == 0 {
            return Err(TreeError::EmptyRoot);
        }

        let nil_leaf = self.nil_hashes.get(self.max_depth);
        match self.store.get(&node_key(self.max_depth, key))? {
            None => Ok(nil_leaf.to_vec()),
            Some(bytes) => {
                let stored = StoredNode::decode(&bytes)?;
                for entry in stored.versions.iter().rev() {
                    if entry.version <= version {
                        return Ok(entry.hash.clone());
                    }
                }
                Ok(nil_leaf.to_vec())
            }
        }
    }

    /// Build the inclusion proof for `key` against the current root.
    ///
    /// The proof has `max_depth + 1` entries: the leaf hash first, then one
    /// sibling per binary level climbing to the root. For an empty tree the
    /// proof is the nil-hash column, valid for every key.
    ///
    /// Takes `&mut self` because proving materialises the path — and the
    /// sibling slots along it — from the store.
    pub fn get_proof(&mut self, key: u64) -> Result<MerkleProof, TreeError> {
        if self.is_empty() {
            let mut entries = vec![self.nil_hashes.get(self.max_depth).to_vec()];
            for depth in (1..=self.max_depth).rev() {
                entries.push(self.nil_hashes.get(depth).to_vec());
            }
            return Ok(MerkleProof { entries });
        }
        self.check_key(key)?;

        let max_depth = self.max_depth;
        let mut entries: Vec<Vec<u8>> = Vec::with_capacity(max_depth as usize + 1);
        let mut neighbor_root: Option<Vec<u8>> = None;

        let store = &self.store;
        let nil = &self.nil_hashes;
        let mut node = &mut self.root;

        for _ in 0..max_depth / 4 {
            let child_depth = node.depth() + 4;
            let path = key >> (max_depth - child_depth);
            let nibble = (path & 0xf) as usize;

            extend_child(store, nil, node, nibble ^ 1, path ^ 1, child_depth)?;

            // Cross-level sibling first (the previous level's neighbor),
            // then the three internal siblings along this node's path:
            // upper bit, mid bit, low bit.
            if let Some(hash) = neighbor_root.take() {
                entries.push(hash);
            }
            let mut index = 0;
            for step in 0..3 {
                let inc = nibble >> (3 - step);
                entries.push(node.internals[(index + inc) ^ 1].clone());
                index += 2 << step;
            }
            neighbor_root = Some(node.child_root(nibble ^ 1).to_vec());

            node = extend_child(store, nil, node, nibble, path, child_depth)?;
        }

        if let Some(hash) = neighbor_root {
            entries.push(hash);
        }
        entries.push(node.root().to_vec());

        entries.reverse();
        Ok(MerkleProof { entries })
    }

    /// Verify a proof for `key` against the current root. The left/right
    /// order at each step comes from the key's bits, leaf to root.
    pub fn verify_proof(&self, key: u64, proof: &MerkleProof) -> bool {
        if self.max_depth < 64 && key >> self.max_depth != 0 {
            return false;
        }

        let helpers = helper_bits(key, self.max_depth);
        if proof.entries.len() != helpers.len() + 1 {
            return false;
        }

        let mut node = proof.entries[0].clone();
        for (helper, sibling) in helpers.iter().zip(proof.entries.iter().skip(1)) {
            node = if *helper == 0 {
                self.hasher.hash_pair(&node, sibling)
            } else {
                self.hasher.hash_pair(sibling, &node)
            };
        }
        node.as_slice() == self.root.root()
    }
}

/// Make the child at `slot` resident, fetching its record when only a
/// placeholder (or nothing) is known there.
///
/// A missing record behind an `Empty` slot means "empty here" and
/// materialises a fresh node; a missing record behind a placeholder is a
/// hard inconsistency — the parent's record promised one.
fn extend_child<'a, S: TreeStore>(
    store: &S,
    nil: &NilHashes,
    node: &'a mut TreeNode,
    slot: usize,
    path: u64,
    depth: u8,
) -> Result<&'a mut TreeNode, TreeError> {
    if !matches!(node.children[slot], Child::Resident(_)) {
        let record = store.get(&node_key(depth, path))?;
        let child = match (record, &node.children[slot]) {
            (Some(bytes), _) => StoredNode::decode(&bytes)?.into_node(depth, path, nil),
            (None, Child::Placeholder(_)) => return Err(TreeError::NodeNotFound),
            (None, _) => TreeNode::new(depth, path, nil),
        };
        node.children[slot] = Child::Resident(Box::new(child));
    }

    match &mut node.children[slot] {
        Child::Resident(child) => Ok(child),
        _ => Err(TreeError::Unexpected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Hasher;

    fn nil_leaf() -> Vec<u8> {
        Sha256Hasher.digest(b"nil-leaf")
    }

    fn fresh_tree() -> SparseMerkleTree<Sha256Hasher, MemoryStore> {
        SparseMerkleTree::in_memory(Sha256Hasher, 8, nil_leaf()).unwrap()
    }

    #[test]
    fn depth_must_be_a_positive_multiple_of_four() {
        for depth in [0u8, 3, 7, 13, 65, 68] {
            let result = SparseMerkleTree::in_memory(Sha256Hasher, depth, nil_leaf());
            assert!(matches!(result, Err(TreeError::InvalidDepth)), "{depth}");
        }
        for depth in [4u8, 8, 16, 64] {
            assert!(SparseMerkleTree::in_memory(Sha256Hasher, depth, nil_leaf()).is_ok());
        }
    }

    #[test]
    fn keys_outside_the_key_space_are_rejected() {
        let mut tree = fresh_tree();
        assert!(matches!(
            tree.set(256, vec![1; 32]),
            Err(TreeError::InvalidKey)
        ));
        assert!(tree.set(255, vec![1; 32]).is_ok());
    }

    #[test]
    fn fresh_tree_is_empty_with_nil_root() {
        let tree = fresh_tree();
        assert!(tree.is_empty());
        assert_eq!(tree.latest_version(), 0);

        let nil = NilHashes::build(&Sha256Hasher, 8, nil_leaf());
        assert_eq!(tree.root(), nil.get(0).to_vec());
    }

    #[test]
    fn get_on_empty_tree_is_an_error() {
        let tree = fresh_tree();
        assert!(matches!(tree.get(0, None), Err(TreeError::EmptyRoot)));
    }

    #[test]
    fn set_commit_get_roundtrip() {
        let mut tree = fresh_tree();
        let value = Sha256Hasher.digest(b"test1");

        tree.set(0, value.clone()).unwrap();
        assert_eq!(tree.commit(None).unwrap(), 1);

        assert_eq!(tree.get(0, Some(1)).unwrap(), value);
        assert_eq!(tree.get(0, None).unwrap(), value);

        let proof = tree.get_proof(0).unwrap();
        assert_eq!(proof.len(), 9);
        assert!(tree.verify_proof(0, &proof));

        // Version 0 is the pre-commit world: nothing to read there.
        assert!(matches!(tree.get(0, Some(0)), Err(TreeError::EmptyRoot)));
    }

    #[test]
    fn unwritten_key_reads_as_the_nil_leaf() {
        let mut tree = fresh_tree();
        tree.set(5, Sha256Hasher.digest(b"five")).unwrap();
        tree.commit(None).unwrap();

        let nil = NilHashes::build(&Sha256Hasher, 8, nil_leaf());
        assert_eq!(tree.get(200, None).unwrap(), nil.get(8).to_vec());
    }

    #[test]
    fn last_set_wins_within_a_batch() {
        let mut tree = fresh_tree();
        tree.set(7, Sha256Hasher.digest(b"first")).unwrap();
        tree.set(7, Sha256Hasher.digest(b"second")).unwrap();
        tree.commit(None).unwrap();

        assert_eq!(tree.get(7, None).unwrap(), Sha256Hasher.digest(b"second"));
    }

    #[test]
    fn commit_rejects_a_floor_at_or_above_the_new_version() {
        let mut tree = fresh_tree();
        tree.set(1, vec![1; 32]).unwrap();
        assert!(matches!(
            tree.commit(Some(1)),
            Err(TreeError::VersionTooHigh)
        ));
        // The failed commit changed nothing; the normal one still lands.
        assert_eq!(tree.commit(None).unwrap(), 1);
    }

    #[test]
    fn reset_discards_uncommitted_sets() {
        let mut tree = fresh_tree();
        tree.set(1, Sha256Hasher.digest(b"committed")).unwrap();
        tree.commit(None).unwrap();
        let committed_root = tree.root();

        tree.set(2, Sha256Hasher.digest(b"pending")).unwrap();
        assert_ne!(tree.root(), committed_root);

        tree.reset();
        assert_eq!(tree.root(), committed_root);

        // The discarded set never becomes visible, even after a commit.
        tree.commit(None).unwrap();
        let nil = NilHashes::build(&Sha256Hasher, 8, nil_leaf());
        assert_eq!(tree.get(2, None).unwrap(), nil.get(8).to_vec());
    }

    #[test]
    fn empty_tree_proof_is_the_nil_column_and_verifies() {
        let mut tree = fresh_tree();
        let nil = NilHashes::build(&Sha256Hasher, 8, nil_leaf());

        let proof = tree.get_proof(0).unwrap();
        assert_eq!(proof.len(), 9);
        assert_eq!(proof.entries[0], nil.get(8).to_vec());
        assert_eq!(proof.entries[1], nil.get(8).to_vec());
        for i in 2..9 {
            assert_eq!(
                proof.entries[i],
                Sha256Hasher.hash_pair(&proof.entries[i - 1], &proof.entries[i - 1])
            );
        }
        assert!(tree.verify_proof(0, &proof));
        assert!(tree.verify_proof(213, &proof));
    }

    #[test]
    fn proofs_fail_against_the_wrong_key_or_tampered_entries() {
        let mut tree = fresh_tree();
        tree.set(42, Sha256Hasher.digest(b"answer")).unwrap();
        tree.commit(None).unwrap();

        let proof = tree.get_proof(42).unwrap();
        assert!(tree.verify_proof(42, &proof));
        assert!(!tree.verify_proof(43, &proof));

        let mut tampered = proof.clone();
        tampered.entries[3] = vec![0xFF; 32];
        assert!(!tree.verify_proof(42, &tampered));

        let mut truncated = proof.clone();
        truncated.entries.pop();
        assert!(!tree.verify_proof(42, &truncated));
    }

    #[test]
    fn version_bounds_are_enforced_on_reads() {
        let mut tree = fresh_tree();
        tree.set(1, vec![1; 32]).unwrap();
        tree.commit(None).unwrap();
        tree.set(1, vec![2; 32]).unwrap();
        tree.commit(None).unwrap();

        assert!(matches!(
            tree.get(1, Some(3)),
            Err(TreeError::VersionTooHigh)
        ));
        assert_eq!(tree.get(1, Some(1)).unwrap(), vec![1; 32]);
        assert_eq!(tree.get(1, Some(2)).unwrap(), vec![2; 32]);
    }

    #[test]
    fn historical_reads_resolve_at_the_floor_after_pruning() {
        let mut tree = fresh_tree();
        tree.set(9, vec![1; 32]).unwrap();
        tree.commit(None).unwrap();
        tree.set(9, vec![2; 32]).unwrap();
        tree.commit(None).unwrap();
        tree.set(9, vec![3; 32]).unwrap();
        tree.commit(Some(2)).unwrap();

        assert!(matches!(
            tree.get(9, Some(1)),
            Err(TreeError::VersionTooOld)
        ));
        assert_eq!(tree.get(9, Some(2)).unwrap(), vec![2; 32]);
        assert_eq!(tree.get(9, Some(3)).unwrap(), vec![3; 32]);
    }

    #[test]
    fn pruning_keeps_one_entry_below_the_floor() {
        let mut tree = fresh_tree();
        // Key 3 written at versions 1 and 3, floor set to 2: the version-1
        // entry sits below the floor but must survive as the boundary value.
        tree.set(3, vec![1; 32]).unwrap();
        tree.commit(None).unwrap();
        tree.set(200, vec![9; 32]).unwrap();
        tree.commit(None).unwrap();
        tree.set(3, vec![3; 32]).unwrap();
        tree.commit(Some(2)).unwrap();

        // Key 3's leaf record was journaled in the floor-carrying commit:
        // entries are now [1, 3], and a read at the floor finds version 1.
        assert_eq!(tree.get(3, Some(2)).unwrap(), vec![1; 32]);
        assert_eq!(tree.get(3, Some(3)).unwrap(), vec![3; 32]);
    }

    #[test]
    fn rollback_validates_its_target() {
        let mut tree = fresh_tree();
        assert!(matches!(tree.rollback(1), Err(TreeError::EmptyRoot)));

        tree.set(1, vec![1; 32]).unwrap();
        tree.commit(None).unwrap();
        assert!(matches!(
            tree.rollback(5),
            Err(TreeError::VersionTooHigh)
        ));

        tree.set(1, vec![2; 32]).unwrap();
        tree.commit(Some(1)).unwrap();
        tree.set(1, vec![3; 32]).unwrap();
        tree.commit(Some(2)).unwrap();
        assert!(matches!(tree.rollback(1), Err(TreeError::VersionTooOld)));
    }
}
