use std::fmt::{Debug, Formatter};
use uuid::Uuid;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Globally unique identifier for one independently-writable branch of the
/// keyspace. The distinguished nil value means "no branch" and only ever
/// appears inside [`Version::zero`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct BranchId(Uuid);

impl BranchId {
    /// Mint a fresh branch id. Branch ids must never be reused; a new id is
    /// generated every time a branch is created.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Debug for BranchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_nil() {
            write!(f, "Branch(nil)")
        } else {
            // The first 8 hex digits are plenty to tell branches apart in test
            // output.
            let full = self.0.simple().to_string();
            write!(f, "Branch({})", &full[..8])
        }
    }
}

/// A logical clock value scoped to a single branch. Totally ordered, but only
/// meaningfully comparable between two versions on the same branch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct StateTimestamp(u64);

impl StateTimestamp {
    /// Sentinel for "the latest possible point on this branch".
    pub const MAX: StateTimestamp = StateTimestamp(u64::MAX);

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl Debug for StateTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Self::MAX {
            write!(f, "ts:MAX")
        } else {
            write!(f, "ts:{}", self.0)
        }
    }
}

/// A point in one branch's history.
///
/// Timestamps from two different branches aren't comparable directly;
/// [`crate::version_find_common`] and friends walk the branch graph to relate
/// them.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub branch: BranchId,
    pub timestamp: StateTimestamp,
}

impl Version {
    pub const fn new(branch: BranchId, timestamp: StateTimestamp) -> Self {
        Self { branch, timestamp }
    }

    /// The "no history" version: nil branch, timestamp 0. An ancestor of
    /// everything, and the only version with no birth certificate behind it.
    pub const fn zero() -> Self {
        Self {
            branch: BranchId::nil(),
            timestamp: StateTimestamp::zero(),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl Debug for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            write!(f, "v:zero")
        } else {
            write!(f, "v:{:?}@{:?}", self.branch, self.timestamp)
        }
    }
}
