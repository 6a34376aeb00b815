//! Causal branch-history tracking for a sharded, replicated document store.
//!
//! Every independently-writable replication branch of the keyspace gets a
//! write-once [`BirthCertificate`] recording when it started and, per
//! sub-region, which parent version it forked from. Those certificates form a
//! DAG, and this crate answers the two questions replication asks of that DAG:
//!
//! 1. Is version A an ancestor of version B? ([`version_is_ancestor`])
//! 2. What is the latest common ancestor of A and B? ([`version_find_common`],
//!    [`version_find_branch_common`])
//!
//! Both are asked over arbitrary sub-regions of the keyspace, and because a
//! branch can fork from *different* parents over different sub-regions, the
//! answers are [`RegionMap`]s rather than single values: a patchwork of
//! sub-regions each tagged with its own resolution. Backfill-source selection
//! and conflict detection during replication topology changes are built on
//! these answers.
//!
//! # Example
//!
//! ```
//! use branchmap::{
//!     version_find_common, version_is_ancestor, BirthCertificate, BranchHistory,
//!     BranchId, Region, RegionMap, StateTimestamp, Version,
//! };
//!
//! let mut hist = BranchHistory::new();
//!
//! // Branch a is born from nothing over the whole keyspace...
//! let a = BranchId::random();
//! hist.add(a, BirthCertificate {
//!     initial_timestamp: StateTimestamp::zero(),
//!     origin: RegionMap::new(Region::universe(), Version::zero()),
//! });
//!
//! // ...and branch b forks off it at timestamp 10.
//! let b = BranchId::random();
//! let fork = Version::new(a, StateTimestamp::from_raw(10));
//! hist.add(b, BirthCertificate {
//!     initial_timestamp: StateTimestamp::from_raw(10),
//!     origin: RegionMap::new(Region::universe(), fork),
//! });
//!
//! // Everything a wrote before the fork is part of b's history.
//! let before = Version::new(a, StateTimestamp::from_raw(5));
//! let tip_of_b = Version::new(b, StateTimestamp::from_raw(50));
//! assert_eq!(version_is_ancestor(&hist, before, tip_of_b, &Region::universe()), Ok(true));
//!
//! // Writes a made after the fork are not...
//! let after = Version::new(a, StateTimestamp::from_raw(15));
//! assert_eq!(version_is_ancestor(&hist, after, tip_of_b, &Region::universe()), Ok(false));
//!
//! // ...and the two lines of history meet exactly at the fork.
//! let common = version_find_common(&hist, after, tip_of_b, &Region::universe()).unwrap();
//! assert_eq!(common, RegionMap::new(Region::universe(), fork));
//! ```
//!
//! # Incomplete histories
//!
//! A reader's knowledge can be incomplete; queries that can't be settled
//! either way fail with [`MissingBranch`]. The usual response is to export
//! more history from a broader source (see
//! [`BranchHistoryReader::export_branch_history`], which computes the full
//! forked-from closure) — possibly stitched in front of what's already known
//! with a [`BranchHistoryCombiner`] — and retry. A definitive "no" from
//! [`version_is_ancestor`] is never masked by a missing certificate, though:
//! if any fragment of the query region disproves ancestry, the whole query
//! returns `false` no matter what else couldn't be resolved.
//!
//! All queries are synchronous, CPU-only walks over the supplied reader; the
//! crate does no I/O and keeps no caches. Share immutable snapshots across
//! threads freely.

pub mod encoding;
mod history;
mod keyspace;
mod region_map;
mod version;

pub use history::tools::{version_find_branch_common, version_find_common, version_is_ancestor};
pub use history::{
    BirthCertificate, BranchHistory, BranchHistoryCombiner, BranchHistoryReader, MissingBranch,
};
pub use keyspace::{KeyBound, Region, StoreKey};
pub use region_map::{RegionMap, RegionValue};
pub use version::{BranchId, StateTimestamp, Version};
