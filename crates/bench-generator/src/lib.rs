//! Synthetic record generation for the lookup-bench load pipeline.
//!
//! This crate produces `Lookup` records with collision-free identifier
//! attributes. The generator owns two independent [`UniqueIdAllocator`]s
//! (one for the request-correlation component embedded in the record id,
//! one for the `CHECK_ID` identifier used by the read benchmark) plus a
//! seeded RNG so that record *structure* is reproducible for a given seed.
//!
//! # Architecture
//!
//! ```text
//! LookupGenerator
//!   - rng (StdRng, seeded)
//!   - correlation_ids (UniqueIdAllocator)
//!   - check_ids       (UniqueIdAllocator)
//!   - next_archival_id
//!        │
//!        ▼
//!   Lookup { id, archival_id, archived_at, created_at, timestamp, identifiers }
//! ```
//!
//! The generator is single-owner by design: exactly one producer task drives
//! it for the duration of a run, which is what makes the allocator's
//! sample-until-inserted loop safe without any locking.

pub mod allocator;
pub mod generator;
pub mod record;

pub use allocator::UniqueIdAllocator;
pub use generator::LookupGenerator;
pub use record::{IdentifierValue, Lookup, CHECK_ID, PROFILE_ID, USER_ID};
