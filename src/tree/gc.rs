//! The residency manager.
//!
//! A fixed ring of ten `(version, releasable bytes)` slots, indexed by
//! `releasable / segment` where `segment = threshold / 10`. It is a coarse
//! summary, not a priority queue: each commit records how many resident
//! bytes its retention floor made releasable, and when the working set
//! crosses the threshold the ring answers "release up to which version"
//! with the smallest recorded floor whose release gets us back under —
//! falling back to the largest recorded floor when nothing smaller is
//! enough.

use super::node::Version;

/// Number of ring slots.
const SLOTS: usize = 10;

/// Coarse eviction ledger for the resident tree.
#[derive(Debug)]
pub(crate) struct GcStatus {
    versions: [Version; SLOTS],
    sizes: [u64; SLOTS],
    threshold: u64,
    segment: u64,
}

impl GcStatus {
    pub(crate) fn new(threshold: u64) -> Self {
        Self {
            versions: [0; SLOTS],
            sizes: [0; SLOTS],
            threshold,
            segment: (threshold / SLOTS as u64).max(1),
        }
    }

    /// Record that releasing everything below `version` would reclaim
    /// `size` bytes. Version 0 ("no floor yet") and empty sizes carry no
    /// information and are ignored.
    pub(crate) fn add(&mut self, version: Version, size: u64) {
        if version == 0 || size == 0 {
            return;
        }
        let index = ((size / self.segment) as usize).min(SLOTS - 1);
        self.sizes[index] = size;
        self.versions[index] = version;
    }

    /// Decide whether eviction is due for a working set of `current` bytes,
    /// and up to which version to release.
    ///
    /// Below the threshold: no eviction. Otherwise: the first recorded slot
    /// whose release drops `current` under the threshold wins and the slots
    /// up to it are consumed; if no slot is enough on its own, the whole
    /// ring is consumed and the largest recorded version wins.
    pub(crate) fn pop(&mut self, current: u64) -> Option<Version> {
        if current < self.threshold {
            return None;
        }

        let mut maximal = 0;
        for index in 0..SLOTS {
            if self.sizes[index] > 0 {
                maximal = self.versions[index];
            }
            if current - self.sizes[index] < self.threshold {
                let chosen = self.versions[index];
                self.clean(index);
                return Some(chosen);
            }
        }

        self.clean(SLOTS - 1);
        if maximal > 0 {
            Some(maximal)
        } else {
            None
        }
    }

    /// Zero the slots up to and including `index`.
    fn clean(&mut self, index: usize) {
        for slot in 0..=index {
            self.sizes[slot] = 0;
            self.versions[slot] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_never_evicts() {
        let mut gc = GcStatus::new(1000);
        gc.add(3, 500);
        assert_eq!(gc.pop(999), None);
    }

    #[test]
    fn empty_ring_has_nothing_to_offer() {
        let mut gc = GcStatus::new(1000);
        assert_eq!(gc.pop(5000), None);
    }

    #[test]
    fn picks_the_smallest_sufficient_slot() {
        let mut gc = GcStatus::new(1000);
        gc.add(2, 150); // slot 1
        gc.add(5, 450); // slot 4

        // current 1200: releasing 150 lands at 1050 (not enough),
        // releasing 450 lands at 750 (enough) — version 5 wins.
        assert_eq!(gc.pop(1200), Some(5));

        // The winning slot and everything below it were consumed.
        assert_eq!(gc.pop(1200), None);
    }

    #[test]
    fn falls_back_to_the_largest_recorded_version() {
        let mut gc = GcStatus::new(1000);
        gc.add(4, 120); // slot 1
        gc.add(7, 230); // slot 2

        // current far above threshold: no single slot suffices, so the
        // largest recorded version is returned and the ring is drained.
        assert_eq!(gc.pop(10_000), Some(7));
        assert_eq!(gc.pop(10_000), None);
    }

    #[test]
    fn version_zero_and_empty_sizes_are_ignored() {
        let mut gc = GcStatus::new(1000);
        gc.add(0, 500);
        gc.add(3, 0);
        assert_eq!(gc.pop(5000), None);
    }

    #[test]
    fn tiny_thresholds_still_bucket() {
        let mut gc = GcStatus::new(5);
        gc.add(1, 4);
        assert_eq!(gc.pop(6), Some(1));
    }
}
