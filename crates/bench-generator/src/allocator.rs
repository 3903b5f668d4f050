//! Collision-free random identifier allocation.

use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeSet;

/// Inclusive lower bound of the identifier range.
pub const ID_RANGE_START: i64 = 10_000_000;
/// Exclusive upper bound of the identifier range.
pub const ID_RANGE_END: i64 = 99_999_999;

/// Allocates random identifiers from a fixed range, guaranteeing that no
/// value is issued twice by the same instance.
///
/// The policy is sample-until-inserted: draw uniformly, attempt insertion
/// into the issued set, accept on first success. Amortized O(1) while
/// occupancy is low; the range is sized two orders of magnitude above
/// realistic draw counts, so the degradation near exhaustion is accepted
/// rather than bounded. Not safe for concurrent use: one allocator per
/// identifier space, driven from the single producer task.
#[derive(Debug, Default)]
pub struct UniqueIdAllocator {
    issued: BTreeSet<i64>,
}

impl UniqueIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an identifier never returned before by this instance.
    pub fn next(&mut self, rng: &mut StdRng) -> i64 {
        loop {
            let candidate = rng.gen_range(ID_RANGE_START..ID_RANGE_END);
            if self.issued.insert(candidate) {
                return candidate;
            }
        }
    }

    /// Number of identifiers issued so far.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Consumes the allocator, freezing the issued set into a sorted,
    /// indexable sequence.
    pub fn into_sorted_ids(self) -> Vec<i64> {
        self.issued.into_iter().collect()
    }
}
