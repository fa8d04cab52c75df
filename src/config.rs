//! Tuning knobs and the persistent key layout.
//!
//! Two kinds of constants live here: the reserved keys of the on-disk
//! schema (which are part of the storage format and must never change once
//! data exists), and the runtime defaults for batching and eviction (which
//! are free to evolve).

use crate::tree::node::Version;

// ---------------------------------------------------------------------------
// Persistent Key Layout
// ---------------------------------------------------------------------------

/// Reserved key holding the latest committed version, 8 bytes big-endian.
pub const LATEST_VERSION_KEY: &[u8] = b"latestVersion";

/// Reserved key holding the retention floor, 8 bytes big-endian.
pub const RECENT_VERSION_KEY: &[u8] = b"recentVersionNumber";

/// Prefix byte for packed-node records.
const NODE_KEY_PREFIX: u8 = b't';

/// Separator between the key components.
const NODE_KEY_SEP: u8 = b':';

/// Build the store key for the packed node at `(depth, path)`:
/// `"t" ":" <depth:1> ":" <path:8 big-endian>`.
///
/// The path is the `depth`-bit key prefix consumed to reach the node, so
/// leaf records (`depth == max_depth`) are keyed directly by the full key.
pub fn node_key(depth: u8, path: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(12);
    key.push(NODE_KEY_PREFIX);
    key.push(NODE_KEY_SEP);
    key.push(depth);
    key.push(NODE_KEY_SEP);
    key.extend_from_slice(&path.to_be_bytes());
    key
}

/// Decode an 8-byte big-endian version value.
pub(crate) fn decode_version(buf: &[u8]) -> Option<Version> {
    Some(Version::from_be_bytes(buf.try_into().ok()?))
}

// ---------------------------------------------------------------------------
// Runtime Defaults
// ---------------------------------------------------------------------------

/// Default flush threshold for a commit batch, in staged value bytes.
pub const DEFAULT_BATCH_SIZE_LIMIT: usize = 100 * 1024;

/// Fallback eviction threshold when the system memory probe fails
/// (containers without /proc, exotic platforms).
const FALLBACK_GC_THRESHOLD: u64 = 512 * 1024 * 1024;

/// Resident-size ceiling derived from total system memory.
fn default_gc_threshold() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    match system.total_memory() {
        0 => FALLBACK_GC_THRESHOLD,
        total => total / 8,
    }
}

// ---------------------------------------------------------------------------
// TreeConfig
// ---------------------------------------------------------------------------

/// Construction-time options for [`SparseMerkleTree`](crate::SparseMerkleTree).
///
/// Use struct-update syntax to override a single knob:
///
/// ```
/// use coppice::TreeConfig;
///
/// let config = TreeConfig {
///     gc_threshold: 64 * 1024 * 1024,
///     ..TreeConfig::default()
/// };
/// assert!(config.batch_size_limit > 0);
/// ```
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Commit batches are flushed to the store whenever the staged value
    /// bytes exceed this limit. The final flush still carries the version
    /// metadata, so atomicity holds per sub-batch, not per commit.
    pub batch_size_limit: usize,

    /// Ceiling on the resident tree size in bytes. When a commit leaves the
    /// working set at or above this, cold subtrees are evicted until the
    /// residency manager is satisfied. Defaults to an eighth of total
    /// system memory.
    pub gc_threshold: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            batch_size_limit: DEFAULT_BATCH_SIZE_LIMIT,
            gc_threshold: default_gc_threshold(),
        }
    }
}
