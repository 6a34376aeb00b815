//! Keys and key ranges. A [`Region`] is a contiguous, half-open slice of the
//! keyspace; region maps ([`crate::RegionMap`]) partition a region into
//! disjoint sub-regions each tagged with a value.

use std::fmt::{Debug, Formatter};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A document key. Keys are short strings, ordered bytewise; the empty key is
/// the minimum of the keyspace.
pub type StoreKey = smartstring::alias::String;

/// The right (exclusive) edge of a region.
///
/// The derived `Ord` puts every `Key(_)` below `Unbounded`, which is exactly
/// the ordering the interval arithmetic below needs.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyBound {
    Key(StoreKey),
    Unbounded,
}

impl KeyBound {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, KeyBound::Unbounded)
    }

    /// True if `key` falls strictly below this bound.
    pub fn is_above(&self, key: &str) -> bool {
        match self {
            KeyBound::Key(k) => key < k.as_str(),
            KeyBound::Unbounded => true,
        }
    }
}

impl Debug for KeyBound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyBound::Key(k) => write!(f, "{:?}", k.as_str()),
            KeyBound::Unbounded => write!(f, "+inf"),
        }
    }
}

/// A contiguous half-open slice `[left, right)` of the keyspace.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    /// Inclusive.
    pub left: StoreKey,
    /// Exclusive.
    pub right: KeyBound,
}

impl Region {
    pub fn new(left: impl Into<StoreKey>, right: KeyBound) -> Self {
        Self {
            left: left.into(),
            right,
        }
    }

    /// The whole keyspace.
    pub fn universe() -> Self {
        Self {
            left: StoreKey::new(),
            right: KeyBound::Unbounded,
        }
    }

    /// `[left, right)` with both edges given as keys.
    pub fn between(left: impl Into<StoreKey>, right: impl Into<StoreKey>) -> Self {
        Self {
            left: left.into(),
            right: KeyBound::Key(right.into()),
        }
    }

    /// `[left, +inf)`.
    pub fn from_key(left: impl Into<StoreKey>) -> Self {
        Self {
            left: left.into(),
            right: KeyBound::Unbounded,
        }
    }

    pub fn empty() -> Self {
        Self {
            left: StoreKey::new(),
            right: KeyBound::Key(StoreKey::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.right {
            KeyBound::Key(r) => *r <= self.left,
            KeyBound::Unbounded => false,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.left.as_str() <= key && self.right.is_above(key)
    }

    /// True if every key of `other` is also in `self`. The empty region is
    /// contained in everything.
    pub fn contains_region(&self, other: &Region) -> bool {
        other.is_empty() || (self.left <= other.left && other.right <= self.right)
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        !self.intersection(other).is_empty()
    }

    /// The common sub-region of `self` and `other`. May be empty; callers
    /// check with [`Region::is_empty`].
    pub fn intersection(&self, other: &Region) -> Region {
        Region {
            left: self.left.clone().max(other.left.clone()),
            right: self.right.clone().min(other.right.clone()),
        }
    }
}

impl Debug for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}..{:?})", self.left.as_str(), self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness() {
        assert!(Region::empty().is_empty());
        assert!(Region::between("m", "m").is_empty());
        assert!(Region::between("m", "a").is_empty());
        assert!(!Region::universe().is_empty());
        assert!(!Region::from_key("zzz").is_empty());
    }

    #[test]
    fn key_membership() {
        let r = Region::between("b", "m");
        assert!(r.contains_key("b"));
        assert!(r.contains_key("cat"));
        assert!(!r.contains_key("m"));
        assert!(!r.contains_key("a"));
        assert!(Region::universe().contains_key(""));
        assert!(Region::universe().contains_key("zzz"));
    }

    #[test]
    fn intersection() {
        let a = Region::between("b", "m");
        let b = Region::between("f", "t");
        assert_eq!(a.intersection(&b), Region::between("f", "m"));
        assert_eq!(b.intersection(&a), Region::between("f", "m"));
        assert!(a.intersection(&Region::between("m", "t")).is_empty());
        assert_eq!(a.intersection(&Region::universe()), a);

        let unbounded = Region::from_key("f");
        assert_eq!(a.intersection(&unbounded), Region::between("f", "m"));
    }

    #[test]
    fn containment() {
        let a = Region::between("b", "m");
        assert!(Region::universe().contains_region(&a));
        assert!(a.contains_region(&Region::between("c", "d")));
        assert!(!a.contains_region(&Region::between("c", "t")));
        assert!(!a.contains_region(&Region::universe()));
        // Empty regions are contained everywhere.
        assert!(a.contains_region(&Region::between("x", "x")));
    }

    #[test]
    fn bound_ordering() {
        assert!(KeyBound::Key("zzz".into()) < KeyBound::Unbounded);
        assert!(KeyBound::Key("a".into()) < KeyBound::Key("b".into()));
    }
}
