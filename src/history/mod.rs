//! The branch-history data model: birth certificates, the history store, and
//! the reader capability the ancestry algorithms run against.
//!
//! A branch is born by forking from some set of parent versions, one per
//! sub-region of the keyspace it covers. That fork is recorded once, in a
//! write-once [`BirthCertificate`], and the collection of certificates forms a
//! DAG over branches. Everything in [`tools`] is a walk over that DAG.

pub mod tools;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::region_map::RegionMap;
use crate::version::{BranchId, StateTimestamp, Version};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The immutable record of when and from what a branch forked.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BirthCertificate {
    /// The timestamp the branch's own history starts at. No version on the
    /// branch is ever below this.
    pub initial_timestamp: StateTimestamp,

    /// Per sub-region, the version on the *parent* branch this branch's data
    /// started from. [`Version::zero`] where the branch started from nothing.
    pub origin: RegionMap<Version>,
}

/// A branch id was referenced that no reachable reader knows about.
///
/// This is a data-inconsistency signal, not an input-validation error: it
/// means the supplied reader's knowledge is incomplete relative to the
/// versions being compared. Callers typically respond by exporting history
/// from a broader source and retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingBranch(pub BranchId);

impl Display for MissingBranch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "branch {:?} is not in the branch history", self.0)
    }
}

impl Error for MissingBranch {}

/// The stored form of branch history: branch id to birth certificate.
///
/// Grows only by insertion. A branch's certificate is immutable once created;
/// inserting a branch that is already present is a logic error and panics.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchHistory {
    pub branches: HashMap<BranchId, BirthCertificate>,
}

impl BranchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly created branch.
    pub fn add(&mut self, branch: BranchId, certificate: BirthCertificate) {
        assert!(!branch.is_nil(), "the nil branch has no birth certificate");
        match self.branches.entry(branch) {
            Entry::Vacant(e) => {
                e.insert(certificate);
            }
            Entry::Occupied(_) => {
                panic!("branch {:?} already has a birth certificate", branch)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Read-only access to birth certificates. A capability, not an owned store:
/// the algorithms in [`tools`] take any reader so they don't care whether the
/// history lives in one map or is stitched together from several.
///
/// Exactly two implementations exist: [`BranchHistory`] itself and
/// [`BranchHistoryCombiner`].
pub trait BranchHistoryReader {
    /// Look up a branch's certificate. Must never be called with the nil
    /// branch id; callers special-case [`Version::zero`] first.
    fn get_branch(&self, branch: BranchId) -> Result<&BirthCertificate, MissingBranch>;

    /// Total; never fails.
    fn is_branch_known(&self, branch: BranchId) -> bool;

    /// Copy into `out` the certificate of `branch` and of every branch
    /// transitively reachable from it through origin maps, so that `out`
    /// alone can answer ancestry queries about `branch` without tripping over
    /// [`MissingBranch`]. Branches already present in `out` are skipped, which
    /// both makes repeated exports idempotent and bounds the walk.
    fn export_branch_history(
        &self,
        branch: BranchId,
        out: &mut BranchHistory,
    ) -> Result<(), MissingBranch> {
        let mut stack: Vec<BranchId> = vec![branch];
        while let Some(b) = stack.pop() {
            if b.is_nil() || out.branches.contains_key(&b) {
                continue;
            }
            let cert = self.get_branch(b)?;
            for (_, version) in cert.origin.iter() {
                if !version.branch.is_nil() {
                    stack.push(version.branch);
                }
            }
            out.branches.insert(b, cert.clone());
        }
        Ok(())
    }

    /// [`Self::export_branch_history`] rooted at every branch referenced in a
    /// region map of versions.
    fn export_region_history(
        &self,
        versions: &RegionMap<Version>,
        out: &mut BranchHistory,
    ) -> Result<(), MissingBranch> {
        for (_, version) in versions.iter() {
            if !version.branch.is_nil() {
                self.export_branch_history(version.branch, out)?;
            }
        }
        Ok(())
    }
}

impl BranchHistoryReader for BranchHistory {
    fn get_branch(&self, branch: BranchId) -> Result<&BirthCertificate, MissingBranch> {
        assert!(!branch.is_nil(), "the nil branch has no birth certificate");
        self.branches.get(&branch).ok_or(MissingBranch(branch))
    }

    fn is_branch_known(&self, branch: BranchId) -> bool {
        self.branches.contains_key(&branch)
    }
}

/// Two readers presented as one, `r1` preferred. Borrows both; owns neither.
///
/// This is how "recently learned + previously persisted" history is queried
/// as a single logical reader without copying either store.
pub struct BranchHistoryCombiner<'a, A: ?Sized, B: ?Sized> {
    pub r1: &'a A,
    pub r2: &'a B,
}

impl<'a, A: ?Sized, B: ?Sized> BranchHistoryCombiner<'a, A, B> {
    pub fn new(r1: &'a A, r2: &'a B) -> Self {
        Self { r1, r2 }
    }
}

impl<A, B> BranchHistoryReader for BranchHistoryCombiner<'_, A, B>
where
    A: BranchHistoryReader + ?Sized,
    B: BranchHistoryReader + ?Sized,
{
    fn get_branch(&self, branch: BranchId) -> Result<&BirthCertificate, MissingBranch> {
        match self.r1.get_branch(branch) {
            Ok(cert) => Ok(cert),
            Err(_) => self.r2.get_branch(branch),
        }
    }

    fn is_branch_known(&self, branch: BranchId) -> bool {
        self.r1.is_branch_known(branch) || self.r2.is_branch_known(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyspace::Region;

    fn root_cert() -> BirthCertificate {
        BirthCertificate {
            initial_timestamp: StateTimestamp::zero(),
            origin: RegionMap::new(Region::universe(), Version::zero()),
        }
    }

    fn fork_cert(parent: BranchId, at: u64) -> BirthCertificate {
        BirthCertificate {
            initial_timestamp: StateTimestamp::from_raw(at),
            origin: RegionMap::new(
                Region::universe(),
                Version::new(parent, StateTimestamp::from_raw(at)),
            ),
        }
    }

    #[test]
    fn export_closure() {
        let (a, b, c) = (BranchId::random(), BranchId::random(), BranchId::random());
        let mut hist = BranchHistory::new();
        hist.add(a, root_cert());
        hist.add(b, fork_cert(a, 10));
        hist.add(c, fork_cert(b, 20));

        let mut out = BranchHistory::new();
        hist.export_branch_history(c, &mut out).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.is_branch_known(a));
        assert!(out.is_branch_known(b));
        assert!(out.is_branch_known(c));

        // Exporting from a mid-chain branch pulls only its ancestors.
        let mut partial = BranchHistory::new();
        hist.export_branch_history(b, &mut partial).unwrap();
        assert_eq!(partial.len(), 2);
        assert!(!partial.is_branch_known(c));
    }

    #[test]
    fn export_is_idempotent() {
        let (a, b) = (BranchId::random(), BranchId::random());
        let mut hist = BranchHistory::new();
        hist.add(a, root_cert());
        hist.add(b, fork_cert(a, 10));

        let mut out = BranchHistory::new();
        hist.export_branch_history(b, &mut out).unwrap();
        let snapshot = out.clone();
        hist.export_branch_history(b, &mut out).unwrap();
        assert_eq!(out, snapshot);
    }

    #[test]
    fn export_region_history_covers_every_referenced_branch() {
        let (a, b) = (BranchId::random(), BranchId::random());
        let mut hist = BranchHistory::new();
        hist.add(a, root_cert());
        hist.add(b, fork_cert(a, 10));

        let versions = RegionMap::from_unordered_fragments(vec![
            (
                Region::between("", "m"),
                Version::new(a, StateTimestamp::from_raw(3)),
            ),
            (
                Region::from_key("m"),
                Version::new(b, StateTimestamp::from_raw(15)),
            ),
        ]);
        let mut out = BranchHistory::new();
        hist.export_region_history(&versions, &mut out).unwrap();
        assert_eq!(out.len(), 2);

        // A map of zero versions references no branches at all.
        let mut empty = BranchHistory::new();
        hist.export_region_history(
            &RegionMap::new(Region::universe(), Version::zero()),
            &mut empty,
        )
        .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn export_reports_missing_ancestors() {
        let (a, b) = (BranchId::random(), BranchId::random());
        let mut hist = BranchHistory::new();
        // b's parent a is deliberately absent.
        hist.add(b, fork_cert(a, 10));

        let mut out = BranchHistory::new();
        let err = hist.export_branch_history(b, &mut out).unwrap_err();
        assert_eq!(err, MissingBranch(a));
    }

    #[test]
    fn combiner_prefers_r1_and_falls_back() {
        let (a, b) = (BranchId::random(), BranchId::random());
        let mut recent = BranchHistory::new();
        recent.add(b, fork_cert(a, 10));
        let mut persisted = BranchHistory::new();
        persisted.add(a, root_cert());

        let combined = BranchHistoryCombiner::new(&recent, &persisted);
        assert!(combined.is_branch_known(a));
        assert!(combined.is_branch_known(b));
        assert!(!combined.is_branch_known(BranchId::random()));
        assert_eq!(combined.get_branch(b).unwrap(), recent.get_branch(b).unwrap());
        assert_eq!(
            combined.get_branch(a).unwrap(),
            persisted.get_branch(a).unwrap()
        );

        // The combined view is a complete reader for b's chain even though
        // neither store alone is.
        let mut out = BranchHistory::new();
        combined.export_branch_history(b, &mut out).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    #[should_panic(expected = "already has a birth certificate")]
    fn duplicate_add_panics() {
        let a = BranchId::random();
        let mut hist = BranchHistory::new();
        hist.add(a, root_cert());
        hist.add(a, root_cert());
    }

    #[test]
    #[should_panic(expected = "nil branch")]
    fn nil_lookup_panics() {
        let hist = BranchHistory::new();
        let _ = hist.get_branch(BranchId::nil());
    }
}
