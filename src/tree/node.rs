//! The packed node: four binary levels in one record.
//!
//! A [`TreeNode`] collapses four consecutive binary levels of the logical
//! tree into a single fan-out-16 unit: 16 child slots, 14 precomputed
//! internal hashes, and a version history. One store read restores every
//! sibling hash a proof needs across those four levels.
//!
//! ## Internal hash indexing
//!
//! The 14 internals cover the three binary levels between the node's root
//! and its 16 children, paired canonically as `(2i, 2i + 1)`:
//!
//! ```text
//! root                 = H(internals[0], internals[1])
//! internals[0..=1]     = H(internals[2 + 2i], internals[2 + 2i + 1])
//! internals[2..=5]     = H(internals[6 + 2(i-2)], internals[6 + 2(i-2) + 1])
//! internals[6..=13]    = H(child[2(i-6)], child[2(i-6) + 1])
//! ```
//!
//! Every level's base offset is even, so the sibling of absolute slot `s`
//! within its level is always `s ^ 1`. Proof emission and the single-path
//! recomputation in [`TreeNode::update_child_root`] rely on this pairing.
//!
//! ## Child slots
//!
//! A slot is `Empty` (no subtree known in memory), a `Placeholder` (the
//! child's version list as decoded from the parent's record — enough to
//! answer root-hash queries, not enough to descend), or `Resident` (a fully
//! materialised child, owned exclusively by this parent).

use serde::{Deserialize, Serialize};

use crate::hash::{NilHashes, TreeHasher};

/// A committed tree version. Version 0 means "no commit yet".
pub type Version = u64;

/// Estimated resident bytes per version entry (8-byte version plus a hash;
/// rounded to the hash size, matching the accounting the eviction thresholds
/// were calibrated against).
pub(crate) const VERSION_ENTRY_BYTES: u64 = 32;

/// One `(version, root hash)` entry in a node's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// The commit that produced this root.
    pub version: Version,
    /// The node's root hash as of that commit.
    pub hash: Vec<u8>,
}

/// A child slot of a packed node.
#[derive(Debug, Clone)]
pub(crate) enum Child {
    /// No subtree in memory. Either nothing was ever written below this
    /// slot, or the subtree was evicted and lives only in the store.
    Empty,
    /// Version history decoded from the parent's record; the full child
    /// record must be fetched before descending.
    Placeholder(Vec<VersionEntry>),
    /// Fully materialised child, owned by this parent.
    Resident(Box<TreeNode>),
}

impl Child {
    /// The newest version recorded below this slot, if any.
    pub(crate) fn latest_version(&self) -> Option<Version> {
        match self {
            Child::Empty => None,
            Child::Placeholder(versions) => versions.last().map(|entry| entry.version),
            Child::Resident(node) => node.latest_version(),
        }
    }
}

/// A packed node covering four binary levels rooted at `(depth, path)`.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) children: [Child; 16],
    pub(crate) internals: [Vec<u8>; 14],
    pub(crate) versions: Vec<VersionEntry>,

    nil_hash: Vec<u8>,
    nil_child_hash: Vec<u8>,
    path: u64,
    depth: u8,
}

impl TreeNode {
    /// A fresh, empty node at `(depth, path)` with its internals primed to
    /// the depth-local nil hashes.
    pub(crate) fn new(depth: u8, path: u64, nil: &NilHashes) -> Self {
        let mut internals: [Vec<u8>; 14] = Default::default();
        for slot in &mut internals[0..2] {
            *slot = nil.get(depth + 1).to_vec();
        }
        for slot in &mut internals[2..6] {
            *slot = nil.get(depth + 2).to_vec();
        }
        for slot in &mut internals[6..14] {
            *slot = nil.get(depth + 3).to_vec();
        }

        Self {
            children: std::array::from_fn(|_| Child::Empty),
            internals,
            versions: Vec::new(),
            nil_hash: nil.get(depth).to_vec(),
            nil_child_hash: nil.get(depth + 4).to_vec(),
            path,
            depth,
        }
    }

    /// The level of this node's root within the logical tree.
    pub(crate) fn depth(&self) -> u8 {
        self.depth
    }

    /// The key prefix consumed to reach this node.
    pub(crate) fn path(&self) -> u64 {
        self.path
    }

    /// Leaf-level nodes carry only version history; there is nothing below
    /// them to hash.
    pub(crate) fn is_leaf(&self) -> bool {
        self.nil_child_hash.is_empty()
    }

    /// The node's current root hash: the newest version entry, or the
    /// depth-local nil hash for a node with no history.
    pub(crate) fn root(&self) -> &[u8] {
        self.versions
            .last()
            .map(|entry| entry.hash.as_slice())
            .unwrap_or(&self.nil_hash)
    }

    /// The newest committed-or-pending version on this node.
    pub(crate) fn latest_version(&self) -> Option<Version> {
        self.versions.last().map(|entry| entry.version)
    }

    /// The root hash of the subtree below `slot`, falling back to the nil
    /// hash of the child level when nothing is known there.
    pub(crate) fn child_root(&self, slot: usize) -> &[u8] {
        match &self.children[slot] {
            Child::Empty => &self.nil_child_hash,
            Child::Placeholder(versions) => versions
                .last()
                .map(|entry| entry.hash.as_slice())
                .unwrap_or(&self.nil_child_hash),
            Child::Resident(node) => node.root(),
        }
    }

    /// Record a new root for `version`, overwriting the last entry when it
    /// already carries that version (consecutive sets between commits share
    /// one tentative version).
    fn push_version(&mut self, entry: VersionEntry) {
        if let Some(last) = self.versions.last_mut() {
            if last.version == entry.version {
                *last = entry;
                return;
            }
        }
        self.versions.push(entry);
    }

    /// Set a leaf value: the hash itself becomes the node's root at
    /// `version`.
    pub(crate) fn set_leaf(&mut self, hash: Vec<u8>, version: Version) {
        self.push_version(VersionEntry { version, hash });
    }

    /// Recompute the internals along the single path from the child at
    /// `nibble` to this node's root, then record the new root at `version`.
    ///
    /// Only the changed child's path is rehashed; the other 13 internals
    /// keep their values, and siblings along the path are read from the
    /// internal array (or the child-level nil hash at the bottom).
    pub(crate) fn update_child_root<H: TreeHasher>(
        &mut self,
        hasher: &H,
        nibble: usize,
        version: Version,
    ) {
        let (mut left, mut right) = if nibble % 2 == 0 {
            (
                self.child_root(nibble).to_vec(),
                self.child_root(nibble ^ 1).to_vec(),
            )
        } else {
            (
                self.child_root(nibble ^ 1).to_vec(),
                self.child_root(nibble).to_vec(),
            )
        };

        let mut slot = nibble;
        for level_base in [6usize, 2, 0] {
            slot /= 2;
            let index = level_base + slot;
            self.internals[index] = hasher.hash_pair(&left, &right);

            let updated = self.internals[index].clone();
            let sibling = self.internals[index ^ 1].clone();
            if slot % 2 == 0 {
                left = updated;
                right = sibling;
            } else {
                left = sibling;
                right = updated;
            }
        }

        let root = hasher.hash_pair(&self.internals[0], &self.internals[1]);
        self.push_version(VersionEntry {
            version,
            hash: root,
        });
    }

    /// Recompute all 14 internals from the current child roots. Used after
    /// a rollback truncates child histories out from under the cached path
    /// hashes.
    pub(crate) fn recompute_internals<H: TreeHasher>(&mut self, hasher: &H) {
        for pair in 0..8 {
            let hash = hasher.hash_pair(self.child_root(2 * pair), self.child_root(2 * pair + 1));
            self.internals[6 + pair] = hash;
        }
        let mut index = 13;
        while index > 1 {
            let hash = hasher.hash_pair(&self.internals[index - 1], &self.internals[index]);
            self.internals[index / 2 - 1] = hash;
            index -= 2;
        }
    }

    /// Drop version entries below the retention floor, keeping the single
    /// entry immediately below it so a read "as of the floor" still
    /// resolves.
    ///
    /// Precisely: find the first entry at or above `floor`; if that entry is
    /// strictly above the floor, the entry before it survives as the
    /// boundary value.
    pub(crate) fn prune(&mut self, floor: Version) {
        if self.versions.len() <= 1 {
            return;
        }
        let mut start = 0;
        while start < self.versions.len() - 1 && self.versions[start].version < floor {
            start += 1;
        }
        if start > 0 && self.versions[start].version > floor {
            start -= 1;
        }
        self.versions.drain(..start);
    }

    /// Drop every trailing entry above `target`. Returns whether anything
    /// was dropped.
    pub(crate) fn rollback(&mut self, target: Version) -> bool {
        let before = self.versions.len();
        while self
            .versions
            .last()
            .is_some_and(|entry| entry.version > target)
        {
            self.versions.pop();
        }
        self.versions.len() != before
    }

    /// Estimated resident bytes of this subtree, and how many of them are
    /// releasable: bytes of child subtrees whose newest version sits below
    /// `floor` (or that carry no version at all), which [`release`] would
    /// reclaim.
    ///
    /// [`release`]: TreeNode::release
    pub(crate) fn size(&self, floor: Version) -> (u64, u64) {
        let mut total: u64 = self
            .internals
            .iter()
            .map(|hash| hash.len() as u64)
            .sum::<u64>()
            + VERSION_ENTRY_BYTES * self.versions.len() as u64;
        let mut releasable = 0u64;

        for child in &self.children {
            match child {
                Child::Empty => {}
                Child::Placeholder(versions) => {
                    let bytes = VERSION_ENTRY_BYTES * versions.len() as u64;
                    total += bytes;
                    if versions.last().map_or(true, |entry| entry.version < floor) {
                        releasable += bytes;
                    }
                }
                Child::Resident(node) => {
                    let (child_total, child_releasable) = node.size(floor);
                    total += child_total;
                    let stale = node
                        .latest_version()
                        .map_or(true, |version| version < floor);
                    releasable += if stale { child_total } else { child_releasable };
                }
            }
        }

        (total, releasable)
    }

    /// Clear child slots whose subtree was last touched before `floor`
    /// (including never-touched materialised empties), recursing into the
    /// survivors. The store copy stays authoritative; cleared subtrees are
    /// re-materialised on demand. Returns the reclaimed byte estimate.
    pub(crate) fn release(&mut self, floor: Version) -> u64 {
        let mut released = 0u64;
        for child in &mut self.children {
            let stale = match child {
                Child::Empty => false,
                Child::Placeholder(versions) => {
                    versions.last().map_or(true, |entry| entry.version < floor)
                }
                Child::Resident(node) => node
                    .latest_version()
                    .map_or(true, |version| version < floor),
            };

            if stale {
                released += match child {
                    Child::Empty => 0,
                    Child::Placeholder(versions) => {
                        VERSION_ENTRY_BYTES * versions.len() as u64
                    }
                    Child::Resident(node) => node.size(floor).0,
                };
                *child = Child::Empty;
            } else if let Child::Resident(node) = child {
                released += node.release(floor);
            }
        }
        released
    }

    /// A snapshot of this node in the shape a decoded record would have:
    /// same internals and history, every populated child collapsed to a
    /// placeholder. This is what survives as the post-commit root for
    /// `reset`, and it is cheap — no subtree is cloned.
    pub(crate) fn collapse(&self) -> TreeNode {
        TreeNode {
            children: std::array::from_fn(|slot| match &self.children[slot] {
                Child::Empty => Child::Empty,
                Child::Placeholder(versions) => Child::Placeholder(versions.clone()),
                Child::Resident(node) if node.versions.is_empty() => Child::Empty,
                Child::Resident(node) => Child::Placeholder(node.versions.clone()),
            }),
            internals: self.internals.clone(),
            versions: self.versions.clone(),
            nil_hash: self.nil_hash.clone(),
            nil_child_hash: self.nil_child_hash.clone(),
            path: self.path,
            depth: self.depth,
        }
    }
}
