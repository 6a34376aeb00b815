//! The stable binary form of branch histories.
//!
//! Two things live here: the value-level transform between
//! `RegionMap<Version>` and `RegionMap<BinaryBlob>` that the metainfo layer
//! stores in the superblock, and a self-describing blob format for whole
//! [`crate::BranchHistory`] stores (magic bytes, format version tag, optional
//! lz4 compression, checksum).
//!
//! The format is versioned so a history written by one release can be read
//! and upgraded by a later one without losing ancestry information. Decoding
//! never panics on corrupt input; everything surfaces as a [`ParseError`].

mod bufparser;
mod history;
mod parseerror;
mod tools;
mod varint;

pub use history::{
    decode_birth_certificate, decode_branch_history, encode_birth_certificate,
    encode_branch_history, from_version_map, to_version_map, BinaryBlob, HISTORY_MAGIC_BYTES,
};
pub use parseerror::ParseError;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Tag identifying which revision of the storage format a blob was written
/// with. Bump when the layout changes; decode keeps accepting older tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum StorageVersion {
    V1 = 1,
}

impl StorageVersion {
    pub const LATEST: StorageVersion = StorageVersion::V1;
}
