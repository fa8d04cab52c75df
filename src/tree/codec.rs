//! Persistent form of a packed node.
//!
//! A [`StoredNode`] is what actually lands in the store: the 16 child slots
//! reduced to their version lists (grandchildren are deliberately elided),
//! the 14 internal hashes, and the node's own history. This is the packing
//! decision the whole design leans on — a single record restores 16 child
//! root hashes and 14 internals, which is four proof steps and every
//! sibling hash from one read.
//!
//! Decoding yields a node whose populated child slots are placeholders:
//! they answer root-hash queries from the embedded version lists, and the
//! engine fetches the child's own record only when a descent actually
//! passes through the slot.

use serde::{Deserialize, Serialize};

use super::node::{Child, TreeNode, VersionEntry};
use crate::hash::NilHashes;

/// A child slot as persisted inside its parent: the version list and
/// nothing else.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredChild {
    pub versions: Vec<VersionEntry>,
}

/// The persistent record of a packed node.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredNode {
    pub children: [Option<StoredChild>; 16],
    pub internals: [Vec<u8>; 14],
    pub versions: Vec<VersionEntry>,
}

impl StoredNode {
    /// Snapshot a node into its persistent form. Children with no history
    /// are indistinguishable from absent subtrees and are dropped; a
    /// leaf-level record therefore has no children at all.
    pub(crate) fn from_node(node: &TreeNode) -> Self {
        Self {
            children: std::array::from_fn(|slot| {
                let versions = match &node.children[slot] {
                    Child::Empty => return None,
                    Child::Placeholder(versions) => versions.clone(),
                    Child::Resident(child) => child.versions.clone(),
                };
                if versions.is_empty() {
                    None
                } else {
                    Some(StoredChild { versions })
                }
            }),
            internals: node.internals.clone(),
            versions: node.versions.clone(),
        }
    }

    /// Serialize to the on-disk byte form.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from the on-disk byte form.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Rebuild the in-memory node at `(depth, path)`. Every present child
    /// slot becomes a placeholder carrying only its version list.
    pub(crate) fn into_node(self, depth: u8, path: u64, nil: &NilHashes) -> TreeNode {
        let mut node = TreeNode::new(depth, path, nil);
        node.internals = self.internals;
        node.versions = self.versions;
        for (slot, stored) in self.children.into_iter().enumerate() {
            if let Some(stored) = stored {
                node.children[slot] = Child::Placeholder(stored.versions);
            }
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Sha256Hasher, TreeHasher};

    fn nil_table() -> NilHashes {
        NilHashes::build(&Sha256Hasher, 8, Sha256Hasher.digest(b"nil-leaf"))
    }

    #[test]
    fn decoded_children_are_placeholders() {
        let nil = nil_table();
        let mut node = TreeNode::new(0, 0, &nil);

        let mut child = TreeNode::new(4, 11, &nil);
        child.set_leaf(Sha256Hasher.digest(b"leaf"), 2);
        let child_root = child.root().to_vec();
        node.children[11] = Child::Resident(Box::new(child));
        node.update_child_root(&Sha256Hasher, 11, 2);

        let bytes = StoredNode::from_node(&node).encode().unwrap();
        let decoded = StoredNode::decode(&bytes).unwrap().into_node(0, 0, &nil);

        assert_eq!(decoded.root(), node.root());
        assert_eq!(decoded.internals, node.internals);
        assert_eq!(decoded.child_root(11), child_root.as_slice());
        assert!(matches!(decoded.children[11], Child::Placeholder(_)));
        assert!(matches!(decoded.children[0], Child::Empty));
    }

    #[test]
    fn children_without_history_are_elided() {
        let nil = nil_table();
        let mut node = TreeNode::new(0, 0, &nil);
        node.children[3] = Child::Resident(Box::new(TreeNode::new(4, 3, &nil)));
        node.children[4] = Child::Placeholder(Vec::new());

        let stored = StoredNode::from_node(&node);
        assert!(stored.children.iter().all(|slot| slot.is_none()));
    }

    #[test]
    fn leaf_record_has_no_children() {
        let nil = nil_table();
        let mut leaf = TreeNode::new(8, 42, &nil);
        leaf.set_leaf(Sha256Hasher.digest(b"value"), 1);

        let stored = StoredNode::from_node(&leaf);
        assert!(stored.children.iter().all(|slot| slot.is_none()));
        assert_eq!(stored.versions.len(), 1);

        let bytes = stored.encode().unwrap();
        let decoded = StoredNode::decode(&bytes).unwrap().into_node(8, 42, &nil);
        assert_eq!(decoded.root(), leaf.root());
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        assert!(StoredNode::decode(&[0xFF, 0x01, 0x02]).is_err());
    }
}
