//! Single-producer generator for synthetic lookup records.

use crate::allocator::UniqueIdAllocator;
use crate::record::{IdentifierValue, Lookup, CHECK_ID, PROFILE_ID, USER_ID};
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Generates lookup records one at a time.
///
/// Owns the two unique-identifier allocators (request correlation and
/// `CHECK_ID`) plus a seeded RNG; must be driven from exactly one producer
/// task to uphold the allocators' non-concurrent contract.
pub struct LookupGenerator {
    rng: StdRng,
    correlation_ids: UniqueIdAllocator,
    check_ids: UniqueIdAllocator,
    next_archival_id: i64,
}

impl LookupGenerator {
    /// Create a new generator with the given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            correlation_ids: UniqueIdAllocator::new(),
            check_ids: UniqueIdAllocator::new(),
            next_archival_id: 1,
        }
    }

    /// Generate the next record.
    pub fn next_lookup(&mut self) -> Lookup {
        let correlation_id = self.correlation_ids.next(&mut self.rng);
        let archival_id = self.next_archival_id;
        self.next_archival_id += 1;

        let now = Utc::now();
        let archived_at = if self.rng.gen_range(0..5) >= 2 {
            Some(now)
        } else {
            None
        };
        let created_at = now - Duration::seconds(self.rng.gen_range(100_000..999_999));
        let timestamp = now - Duration::seconds(self.rng.gen_range(100_000..999_999));

        Lookup {
            id: format!("common_rules_executor_-=-_{correlation_id}_-=-_CALCULATION_REQUEST"),
            archival_id,
            archived_at,
            created_at,
            timestamp,
            identifiers: self.random_identifiers(),
        }
    }

    fn random_identifiers(&mut self) -> BTreeMap<String, IdentifierValue> {
        let mut map = BTreeMap::new();
        map.insert(
            CHECK_ID.to_string(),
            IdentifierValue::Scalar(self.check_ids.next(&mut self.rng)),
        );
        if self.rng.gen_range(0..5) >= 2 {
            map.insert(
                PROFILE_ID.to_string(),
                IdentifierValue::List(self.candidate_subset()),
            );
        }
        if self.rng.gen_range(0..5) >= 2 {
            map.insert(
                USER_ID.to_string(),
                IdentifierValue::List(self.candidate_subset()),
            );
        }
        map
    }

    /// A non-empty proper subset of five fresh candidates, one drawn from
    /// each 100k band of `1..500_000`.
    fn candidate_subset(&mut self) -> Vec<i64> {
        let candidates: [i64; 5] = [
            self.rng.gen_range(1..100_000),
            self.rng.gen_range(100_001..200_000),
            self.rng.gen_range(200_001..300_000),
            self.rng.gen_range(300_001..400_000),
            self.rng.gen_range(400_001..500_000),
        ];
        let take = self.rng.gen_range(1..candidates.len());
        candidates[..take].to_vec()
    }

    /// Number of `CHECK_ID` values issued so far.
    pub fn check_id_count(&self) -> usize {
        self.check_ids.len()
    }

    /// Consume the generator, freezing the issued `CHECK_ID` set into a
    /// sorted indexable sequence and dropping the live sets.
    pub fn freeze_check_ids(self) -> Vec<i64> {
        self.check_ids.into_sorted_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_record_id_embeds_correlation_component() {
        let mut generator = LookupGenerator::new(42);
        let lookup = generator.next_lookup();

        assert!(lookup.id.starts_with("common_rules_executor_-=-_"));
        assert!(lookup.id.ends_with("_-=-_CALCULATION_REQUEST"));
        let middle = lookup
            .id
            .trim_start_matches("common_rules_executor_-=-_")
            .trim_end_matches("_-=-_CALCULATION_REQUEST");
        let correlation: i64 = middle.parse().unwrap();
        assert!((10_000_000..99_999_999).contains(&correlation));
    }

    #[test]
    fn test_archival_ids_are_strictly_increasing_from_one() {
        let mut generator = LookupGenerator::new(42);
        for expected in 1..=100 {
            assert_eq!(generator.next_lookup().archival_id, expected);
        }
    }

    #[test]
    fn test_check_ids_are_pairwise_distinct() {
        let mut generator = LookupGenerator::new(42);
        let check_ids: BTreeSet<i64> =
            (0..5_000).map(|_| generator.next_lookup().check_id()).collect();

        assert_eq!(check_ids.len(), 5_000);
        assert_eq!(generator.check_id_count(), 5_000);
    }

    #[test]
    fn test_timestamps_are_offset_into_the_past() {
        let mut generator = LookupGenerator::new(42);
        let lookup = generator.next_lookup();
        let now = Utc::now();

        assert!(lookup.created_at < now - Duration::seconds(99_000));
        assert!(lookup.timestamp < now - Duration::seconds(99_000));
        assert!(lookup.created_at > now - Duration::seconds(1_000_000));
    }

    #[test]
    fn test_optional_identifiers_are_bounded_subsets() {
        let mut generator = LookupGenerator::new(42);
        for _ in 0..2_000 {
            let lookup = generator.next_lookup();
            for key in [PROFILE_ID, USER_ID] {
                if let Some(IdentifierValue::List(values)) = lookup.identifiers.get(key) {
                    assert!(!values.is_empty());
                    assert!(values.len() < 5);
                    assert!(values.iter().all(|v| (1..500_000).contains(v)));
                }
            }
        }
    }

    #[test]
    fn test_optional_attributes_follow_three_in_five_odds() {
        let mut generator = LookupGenerator::new(42);
        let total = 2_000;
        let mut archived = 0;
        let mut with_profile = 0;
        for _ in 0..total {
            let lookup = generator.next_lookup();
            if lookup.archived_at.is_some() {
                archived += 1;
            }
            if lookup.identifiers.contains_key(PROFILE_ID) {
                with_profile += 1;
            }
        }
        // Expected ~1200 of 2000; generous bounds since the seed is fixed.
        assert!((1_000..1_400).contains(&archived), "archived = {archived}");
        assert!(
            (1_000..1_400).contains(&with_profile),
            "with_profile = {with_profile}"
        );
    }

    #[test]
    fn test_freeze_returns_every_issued_check_id() {
        let mut generator = LookupGenerator::new(42);
        let issued: BTreeSet<i64> =
            (0..500).map(|_| generator.next_lookup().check_id()).collect();

        let frozen = generator.freeze_check_ids();
        assert_eq!(frozen.len(), 500);
        assert!(frozen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(issued, frozen.iter().copied().collect());
    }
}
