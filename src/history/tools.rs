//! Tools to relate versions across the branch graph: ancestry testing and
//! common-ancestor discovery over arbitrary sub-regions of the keyspace.
//!
//! Because each branch's origin is itself sharded by sub-region, neither query
//! is a single comparison. A query region splits into fragments as the walk
//! crosses fork points, and each fragment resolves independently; the answers
//! are stitched back into one region map at the end.
//!
//! Both walks use an explicit heap-allocated worklist rather than native
//! recursion. Branch chains can be long, and the worklist keeps memory use
//! bounded and predictable.

use std::cmp::min;
use std::mem;
use smallvec::SmallVec;

use crate::history::{BranchHistoryReader, MissingBranch};
use crate::keyspace::Region;
use crate::region_map::RegionMap;
use crate::version::{BranchId, StateTimestamp, Version};

/// Is `ancestor` an ancestor of (or equal to) `descendent` everywhere in
/// `relevant_region`?
///
/// Fails with [`MissingBranch`] only if the answer cannot be determined either
/// way from what `reader` knows. A definitive `false` always wins over a
/// missing certificate: a fragment proving non-ancestry fails the whole query
/// even if some other fragment's chain couldn't be resolved.
pub fn version_is_ancestor<R: BranchHistoryReader + ?Sized>(
    reader: &R,
    ancestor: Version,
    descendent: Version,
    relevant_region: &Region,
) -> Result<bool, MissingBranch> {
    if ancestor.is_zero() {
        // The zero version is everyone's ancestor; no history needed.
        return Ok(true);
    }

    let mut stack: Vec<(Region, Version)> = vec![(relevant_region.clone(), descendent)];
    let mut missing: Option<MissingBranch> = None;

    while let Some((region, version)) = stack.pop() {
        if region.is_empty() {
            continue;
        }
        if version.branch == ancestor.branch && version.timestamp >= ancestor.timestamp {
            // On the ancestor's branch, at or past it. This fragment is done.
        } else if version.timestamp < ancestor.timestamp || version.is_zero() {
            // Timestamps never decrease along descent, so no chain from
            // `version` can lead back to `ancestor`.
            return Ok(false);
        } else {
            match reader.get_branch(version.branch) {
                Ok(cert) => {
                    cert.origin.visit(&region, |r, origin| {
                        stack.push((r.clone(), *origin));
                    });
                }
                // Don't bail yet. Keep draining the worklist so a definitive
                // "no" elsewhere still short-circuits; only report the gap if
                // no fragment settles the question.
                Err(e) => missing = Some(e),
            }
        }
    }

    match missing {
        Some(e) => Err(e),
        None => Ok(true),
    }
}

/// One pending piece of a common-ancestor query.
///
/// `v1_equiv`/`v2_equiv` hold versions already proven equal to `v1` (resp.
/// `v2`) by earlier steps of the walk. They matter when one operand sits
/// exactly on a fork point: walking past it would overshoot the true common
/// ancestor, but the fork point was recorded as an equivalent first, so it is
/// still found.
struct Fragment {
    region: Region,
    v1: Version,
    v2: Version,
    v1_equiv: SmallVec<Version, 2>,
    v2_equiv: SmallVec<Version, 2>,
}

/// The latest common ancestor of `v1` and `v2`, per sub-region of `region`.
///
/// The result covers exactly `region`; different sub-regions may resolve to
/// different ancestors when fork points were region-sharded. Fails with
/// [`MissingBranch`] when a certificate the walk irreducibly needs is absent
/// from `reader`.
pub fn version_find_common<R: BranchHistoryReader + ?Sized>(
    reader: &R,
    v1: Version,
    v2: Version,
    region: &Region,
) -> Result<RegionMap<Version>, MissingBranch> {
    let mut stack: Vec<Fragment> = vec![Fragment {
        region: region.clone(),
        v1,
        v2,
        v1_equiv: SmallVec::new(),
        v2_equiv: SmallVec::new(),
    }];
    let mut result: Vec<(Region, Version)> = Vec::new();

    while let Some(frag) = stack.pop() {
        let Fragment {
            region,
            mut v1,
            mut v2,
            mut v1_equiv,
            mut v2_equiv,
        } = frag;
        if region.is_empty() {
            continue;
        }

        if v1.branch == v2.branch {
            // Same branch: plain timestamp comparison settles it.
            let common = Version::new(v1.branch, min(v1.timestamp, v2.timestamp));
            result.push((region, common));
        } else if v1_equiv.contains(&v2) {
            result.push((region, v2));
        } else if v2_equiv.contains(&v1) {
            result.push((region, v1));
        } else if v1.is_zero() || v2.is_zero() {
            // Nothing to walk into; the only thing below a root is zero.
            result.push((region, Version::zero()));
        } else {
            let mut c1 = reader.get_branch(v1.branch)?;
            let mut c2 = reader.get_branch(v2.branch)?;
            // Arrange for v1's branch to have started no earlier than v2's,
            // so walking v1 back one fork is always the step that makes
            // progress.
            if c1.initial_timestamp < c2.initial_timestamp {
                mem::swap(&mut v1, &mut v2);
                mem::swap(&mut v1_equiv, &mut v2_equiv);
                mem::swap(&mut c1, &mut c2);
            }

            // The origin versions we're about to step to are, per sub-region,
            // the same state as v1's branch at its start.
            let mut equiv: SmallVec<Version, 2> = SmallVec::new();
            equiv.push(Version::new(v1.branch, c1.initial_timestamp));
            if v1.timestamp == c1.initial_timestamp {
                // v1 *is* its branch's start, so everything equal to v1
                // stays equal after the step.
                equiv.extend(v1_equiv.iter().copied());
            }

            c1.origin.visit(&region, |r, origin| {
                stack.push(Fragment {
                    region: r.clone(),
                    v1: *origin,
                    v2,
                    v1_equiv: equiv.clone(),
                    v2_equiv: v2_equiv.clone(),
                });
            });
        }
    }

    let map = RegionMap::from_unordered_fragments(result);
    debug_assert!(region.is_empty() || map.get_domain() == *region);
    Ok(map)
}

/// Where does `version` meet `branch`'s history? Sugar for
/// [`version_find_common`] against the latest possible point on `branch`, so
/// the answer is against the branch's entire history rather than any specific
/// point on it.
pub fn version_find_branch_common<R: BranchHistoryReader + ?Sized>(
    reader: &R,
    version: Version,
    branch: BranchId,
    region: &Region,
) -> Result<RegionMap<Version>, MissingBranch> {
    version_find_common(
        reader,
        version,
        Version::new(branch, StateTimestamp::MAX),
        region,
    )
}
