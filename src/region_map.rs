//! An ordered partition of a region of the keyspace into disjoint sub-regions,
//! each carrying a value. This is the container every ancestry algorithm is
//! built on: a branch's origin is a `RegionMap<Version>`, and the answer to a
//! common-ancestor query is one too.
//!
//! The representation is a sorted, contiguous fragment list. Fragments are
//! kept canonical: adjacent fragments with equal values are merged on
//! construction, so `==` on two region maps is semantic equality.

use std::cmp::{max, min};
use std::fmt::Debug;
use rle::{AppendRle, MergableSpan};

use crate::keyspace::{KeyBound, Region};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Values stored in a region map. Blanket-implemented; the bounds are what the
/// fragment-coalescing machinery needs.
pub trait RegionValue: Clone + Eq + Debug {}

impl<T: Clone + Eq + Debug> RegionValue for T {}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct RegionFragment<V> {
    pub region: Region,
    pub value: V,
}

impl<V: RegionValue> MergableSpan for RegionFragment<V> {
    fn can_append(&self, other: &Self) -> bool {
        self.value == other.value
            && match &self.region.right {
                KeyBound::Key(r) => *r == other.region.left,
                KeyBound::Unbounded => false,
            }
    }

    fn append(&mut self, other: Self) {
        self.region.right = other.region.right;
    }

    fn prepend(&mut self, other: Self) {
        self.region.left = other.region.left;
    }
}

/// A map from sub-regions of the keyspace to values. The domain (the union of
/// all fragments) is always one contiguous region, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionMap<V> {
    /// Sorted by left edge; each fragment starts exactly where the previous
    /// one ends. Note: not revalidated when deserializing via serde.
    fragments: Vec<RegionFragment<V>>,
}

impl<V: RegionValue> RegionMap<V> {
    /// A map holding a single value over the whole of `domain`.
    pub fn new(domain: Region, value: V) -> Self {
        let mut fragments = Vec::new();
        if !domain.is_empty() {
            fragments.push(RegionFragment {
                region: domain,
                value,
            });
        }
        Self { fragments }
    }

    /// Assemble a map from fragments in any order. The fragments must be
    /// disjoint and together cover one contiguous region; anything else is a
    /// caller bug and panics. Empty fragments are dropped.
    pub fn from_unordered_fragments(fragments: Vec<(Region, V)>) -> Self {
        let mut frags: Vec<RegionFragment<V>> = fragments
            .into_iter()
            .filter(|(r, _)| !r.is_empty())
            .map(|(region, value)| RegionFragment { region, value })
            .collect();
        frags.sort_by(|a, b| a.region.left.cmp(&b.region.left));

        let mut out: Vec<RegionFragment<V>> = Vec::with_capacity(frags.len());
        for f in frags {
            if let Some(last) = out.last() {
                assert!(
                    matches!(&last.region.right, KeyBound::Key(k) if *k == f.region.left),
                    "region map fragments must tile a contiguous domain"
                );
            }
            out.push_rle(f);
        }
        Self { fragments: out }
    }

    /// The contiguous region this map covers. Empty maps report an empty
    /// region.
    pub fn get_domain(&self) -> Region {
        match (self.fragments.first(), self.fragments.last()) {
            (Some(first), Some(last)) => Region {
                left: first.region.left.clone(),
                right: last.region.right.clone(),
            },
            _ => Region::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn num_fragments(&self) -> usize {
        self.fragments.len()
    }

    /// Call `f` once per fragment that overlaps `region`, with the fragment's
    /// region clipped to `region`. Fragments are visited in key order.
    pub fn visit<F: FnMut(&Region, &V)>(&self, region: &Region, mut f: F) {
        if region.is_empty() {
            return;
        }
        for frag in &self.fragments {
            let clipped = frag.region.intersection(region);
            if !clipped.is_empty() {
                f(&clipped, &frag.value);
            }
        }
    }

    /// The sub-map covering the intersection of this map's domain with
    /// `region`.
    pub fn mask(&self, region: &Region) -> Self {
        let mut out: Vec<RegionFragment<V>> = Vec::new();
        self.visit(region, |r, v| {
            out.push_rle(RegionFragment {
                region: r.clone(),
                value: v.clone(),
            });
        });
        Self { fragments: out }
    }

    /// Transform every value, keeping the partition. Adjacent fragments whose
    /// transformed values become equal are merged.
    pub fn map<U: RegionValue, F: FnMut(&Region, &V) -> U>(&self, mut f: F) -> RegionMap<U> {
        let mut out: Vec<RegionFragment<U>> = Vec::with_capacity(self.fragments.len());
        for frag in &self.fragments {
            out.push_rle(RegionFragment {
                region: frag.region.clone(),
                value: f(&frag.region, &frag.value),
            });
        }
        RegionMap { fragments: out }
    }

    /// Overlay `other` onto this map: wherever the two overlap, `other` wins.
    /// `other`'s domain must lie within this map's domain.
    pub fn update(&mut self, other: RegionMap<V>) {
        if other.is_empty() {
            return;
        }
        let overlay = other.get_domain();
        assert!(
            self.get_domain().contains_region(&overlay),
            "update domain must lie within the map's domain"
        );

        let mut pieces: Vec<(Region, V)> = Vec::new();
        for frag in &self.fragments {
            // Whatever the overlay doesn't cover survives: at most one piece
            // to its left and one to its right.
            let keep_left = Region {
                left: frag.region.left.clone(),
                right: min(
                    frag.region.right.clone(),
                    KeyBound::Key(overlay.left.clone()),
                ),
            };
            if !keep_left.is_empty() {
                pieces.push((keep_left, frag.value.clone()));
            }
            if let KeyBound::Key(overlay_right) = &overlay.right {
                let keep_right = Region {
                    left: max(frag.region.left.clone(), overlay_right.clone()),
                    right: frag.region.right.clone(),
                };
                if !keep_right.is_empty() {
                    pieces.push((keep_right, frag.value.clone()));
                }
            }
        }
        pieces.extend(other.fragments.into_iter().map(|f| (f.region, f.value)));
        *self = Self::from_unordered_fragments(pieces);
    }

    /// The value at `key`, or `None` if `key` is outside the domain.
    pub fn lookup(&self, key: &str) -> Option<&V> {
        let idx = self
            .fragments
            .partition_point(|f| f.region.left.as_str() <= key);
        if idx == 0 {
            return None;
        }
        let frag = &self.fragments[idx - 1];
        if frag.region.contains_key(key) {
            Some(&frag.value)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Region, &V)> {
        self.fragments.iter().map(|f| (&f.region, &f.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_way() -> RegionMap<u32> {
        RegionMap::from_unordered_fragments(vec![
            (Region::between("m", "t"), 2),
            (Region::between("", "f"), 1),
            (Region::new("t", KeyBound::Unbounded), 3),
            (Region::between("f", "m"), 2),
        ])
    }

    #[test]
    fn assembles_and_coalesces() {
        let map = three_way();
        // [f, m) and [m, t) share a value and must have merged.
        assert_eq!(map.num_fragments(), 3);
        assert_eq!(map.get_domain(), Region::universe());
        assert_eq!(map.lookup(""), Some(&1));
        assert_eq!(map.lookup("f"), Some(&2));
        assert_eq!(map.lookup("pelican"), Some(&2));
        assert_eq!(map.lookup("zebra"), Some(&3));
    }

    #[test]
    fn structural_equality_is_semantic() {
        let a = three_way();
        let b = RegionMap::from_unordered_fragments(vec![
            (Region::between("", "f"), 1),
            (Region::between("f", "t"), 2),
            (Region::from_key("t"), 3),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "tile a contiguous domain")]
    fn rejects_gaps() {
        let _ = RegionMap::from_unordered_fragments(vec![
            (Region::between("", "f"), 1),
            (Region::between("m", "t"), 2),
        ]);
    }

    #[test]
    #[should_panic(expected = "tile a contiguous domain")]
    fn rejects_overlap() {
        let _ = RegionMap::from_unordered_fragments(vec![
            (Region::between("", "m"), 1),
            (Region::between("f", "t"), 2),
        ]);
    }

    #[test]
    fn masking() {
        let map = three_way();
        let masked = map.mask(&Region::between("c", "p"));
        assert_eq!(masked.get_domain(), Region::between("c", "p"));
        assert_eq!(masked.lookup("c"), Some(&1));
        assert_eq!(masked.lookup("g"), Some(&2));
        assert_eq!(masked.lookup("p"), None);
        assert_eq!(masked.num_fragments(), 2);

        // Masking by a disjoint region gives the empty map.
        let empty = map.mask(&Region::between("a", "a"));
        assert!(empty.is_empty());
        assert!(empty.get_domain().is_empty());
    }

    #[test]
    fn mapping_remerges() {
        let map = three_way();
        let collapsed = map.map(|_r, v| *v > 0);
        assert_eq!(collapsed.num_fragments(), 1);
        assert_eq!(collapsed, RegionMap::new(Region::universe(), true));
    }

    #[test]
    fn update_overlays() {
        let mut map = RegionMap::new(Region::universe(), 1);
        map.update(RegionMap::new(Region::between("f", "m"), 9));
        assert_eq!(map.num_fragments(), 3);
        assert_eq!(map.lookup("a"), Some(&1));
        assert_eq!(map.lookup("g"), Some(&9));
        assert_eq!(map.lookup("m"), Some(&1));

        // Overwriting back to the surrounding value re-merges to one fragment.
        map.update(RegionMap::new(Region::between("f", "m"), 1));
        assert_eq!(map.num_fragments(), 1);
    }

    #[test]
    #[should_panic(expected = "within the map's domain")]
    fn update_outside_domain() {
        let mut map = RegionMap::new(Region::between("b", "m"), 1);
        map.update(RegionMap::new(Region::between("f", "t"), 2));
    }

    #[test]
    fn visit_clips() {
        let map = three_way();
        let mut seen = Vec::new();
        map.visit(&Region::between("c", "zz"), |r, v| {
            seen.push((r.clone(), *v));
        });
        assert_eq!(
            seen,
            vec![
                (Region::between("c", "f"), 1),
                (Region::between("f", "t"), 2),
                (Region::between("t", "zz"), 3),
            ]
        );
    }
}
