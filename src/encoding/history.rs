//! Wire layout for the history types. Values are varint/length-prefixed;
//! whole-history blobs get a header (magic, format tag, flags), a length, and
//! a trailing CRC-32 of the payload as stored.

use std::collections::HashMap;

use crate::encoding::bufparser::BufParser;
use crate::encoding::parseerror::ParseError;
use crate::encoding::tools::{calc_checksum, push_str, push_u64, push_usize};
use crate::encoding::StorageVersion;
use crate::history::{BirthCertificate, BranchHistory};
use crate::keyspace::{KeyBound, Region, StoreKey};
use crate::region_map::RegionMap;
use crate::version::{BranchId, StateTimestamp, Version};

/// The serialized payload of one region-map value slot.
pub type BinaryBlob = Vec<u8>;

pub const HISTORY_MAGIC_BYTES: [u8; 8] = *b"BMAPHIST";

const FLAG_LZ4: u8 = 1;

/// Payloads below this aren't worth compressing.
#[cfg(feature = "lz4")]
const LZ4_COMPRESS_THRESHOLD: usize = 512;

const BOUND_KEY: u8 = 0;
const BOUND_UNBOUNDED: u8 = 1;

fn push_version(into: &mut Vec<u8>, version: &Version) {
    into.extend_from_slice(version.branch.as_bytes());
    push_u64(into, version.timestamp.raw());
}

fn read_version(parser: &mut BufParser) -> Result<Version, ParseError> {
    let bytes = parser.next_n_bytes(16)?;
    let bytes: [u8; 16] = bytes.try_into().map_err(|_| ParseError::UnexpectedEOF)?;
    let branch = BranchId::from_bytes(bytes);
    let timestamp = StateTimestamp::from_raw(parser.next_u64()?);
    Ok(Version::new(branch, timestamp))
}

fn push_region(into: &mut Vec<u8>, region: &Region) {
    push_str(into, region.left.as_str());
    match &region.right {
        KeyBound::Key(k) => {
            into.push(BOUND_KEY);
            push_str(into, k.as_str());
        }
        KeyBound::Unbounded => into.push(BOUND_UNBOUNDED),
    }
}

fn read_region(parser: &mut BufParser) -> Result<Region, ParseError> {
    let left = StoreKey::from(parser.next_str()?);
    let right = match parser.next_n_bytes(1)?[0] {
        BOUND_KEY => KeyBound::Key(StoreKey::from(parser.next_str()?)),
        BOUND_UNBOUNDED => KeyBound::Unbounded,
        _ => return Err(ParseError::InvalidContent),
    };
    Ok(Region { left, right })
}

fn push_version_map(into: &mut Vec<u8>, map: &RegionMap<Version>) {
    push_usize(into, map.num_fragments());
    for (region, version) in map.iter() {
        push_region(into, region);
        push_version(into, version);
    }
}

fn read_version_map(parser: &mut BufParser) -> Result<RegionMap<Version>, ParseError> {
    let count = parser.next_usize()?;
    let mut fragments: Vec<(Region, Version)> = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let region = read_region(parser)?;
        let version = read_version(parser)?;
        // Validate the tiling here so corrupt bytes become a ParseError, not
        // the panic reserved for programmer error.
        if region.is_empty() {
            return Err(ParseError::InvalidContent);
        }
        if let Some((prev, _)) = fragments.last() {
            match &prev.right {
                KeyBound::Key(k) if *k == region.left => {}
                _ => return Err(ParseError::InvalidContent),
            }
        }
        fragments.push((region, version));
    }
    Ok(RegionMap::from_unordered_fragments(fragments))
}

/// Store a version map the way the superblock wants it: one opaque blob per
/// fragment. Lossless; [`to_version_map`] is the exact inverse.
pub fn from_version_map(map: &RegionMap<Version>) -> RegionMap<BinaryBlob> {
    map.map(|_region, version| {
        let mut blob = Vec::new();
        push_version(&mut blob, version);
        blob
    })
}

/// Decode a superblock-style blob map back into versions.
pub fn to_version_map(map: &RegionMap<BinaryBlob>) -> Result<RegionMap<Version>, ParseError> {
    let mut fragments: Vec<(Region, Version)> = Vec::new();
    for (region, blob) in map.iter() {
        let mut parser = BufParser(blob);
        let version = read_version(&mut parser)?;
        parser.expect_empty()?;
        fragments.push((region.clone(), version));
    }
    Ok(RegionMap::from_unordered_fragments(fragments))
}

/// Raw (headerless) certificate encoding, used both inside history blobs and
/// for certificates persisted individually.
pub fn encode_birth_certificate(cert: &BirthCertificate) -> Vec<u8> {
    let mut out = Vec::new();
    push_birth_certificate(&mut out, cert);
    out
}

pub fn decode_birth_certificate(bytes: &[u8]) -> Result<BirthCertificate, ParseError> {
    let mut parser = BufParser(bytes);
    let cert = read_birth_certificate(&mut parser)?;
    parser.expect_empty()?;
    Ok(cert)
}

fn push_birth_certificate(into: &mut Vec<u8>, cert: &BirthCertificate) {
    push_u64(into, cert.initial_timestamp.raw());
    push_version_map(into, &cert.origin);
}

fn read_birth_certificate(parser: &mut BufParser) -> Result<BirthCertificate, ParseError> {
    let initial_timestamp = StateTimestamp::from_raw(parser.next_u64()?);
    let origin = read_version_map(parser)?;
    Ok(BirthCertificate {
        initial_timestamp,
        origin,
    })
}

#[cfg(feature = "lz4")]
fn maybe_compress(payload: Vec<u8>) -> (u8, Vec<u8>) {
    if payload.len() >= LZ4_COMPRESS_THRESHOLD {
        (FLAG_LZ4, lz4_flex::compress_prepend_size(&payload))
    } else {
        (0, payload)
    }
}

#[cfg(not(feature = "lz4"))]
fn maybe_compress(payload: Vec<u8>) -> (u8, Vec<u8>) {
    (0, payload)
}

#[cfg(feature = "lz4")]
fn decompress(payload: &[u8]) -> Result<Vec<u8>, ParseError> {
    lz4_flex::decompress_size_prepended(payload).map_err(|_| ParseError::LZ4DecompressionError)
}

#[cfg(not(feature = "lz4"))]
fn decompress(_payload: &[u8]) -> Result<Vec<u8>, ParseError> {
    Err(ParseError::LZ4DecoderNeeded)
}

/// Serialize a whole history store. Output is deterministic: branches are
/// written in id order regardless of hash-map iteration order.
pub fn encode_branch_history(history: &BranchHistory) -> Vec<u8> {
    let mut payload = Vec::new();
    let mut ids: Vec<&BranchId> = history.branches.keys().collect();
    ids.sort();
    push_usize(&mut payload, ids.len());
    for id in ids {
        payload.extend_from_slice(id.as_bytes());
        push_birth_certificate(&mut payload, &history.branches[id]);
    }

    let (flags, payload) = maybe_compress(payload);

    let mut result = Vec::with_capacity(payload.len() + 32);
    result.extend_from_slice(&HISTORY_MAGIC_BYTES);
    result.extend_from_slice(&u32::from(StorageVersion::LATEST).to_le_bytes());
    result.push(flags);
    push_usize(&mut result, payload.len());
    result.extend_from_slice(&payload);
    result.extend_from_slice(&calc_checksum(&payload).to_le_bytes());
    result
}

pub fn decode_branch_history(bytes: &[u8]) -> Result<BranchHistory, ParseError> {
    let mut parser = BufParser(bytes);
    if parser.next_n_bytes(8)? != HISTORY_MAGIC_BYTES {
        return Err(ParseError::InvalidMagic);
    }
    let version = StorageVersion::try_from(parser.next_u32_le()?)
        .map_err(|_| ParseError::UnsupportedStorageVersion)?;
    let flags = parser.next_n_bytes(1)?[0];
    if flags & !FLAG_LZ4 != 0 {
        return Err(ParseError::InvalidContent);
    }
    let len = parser.next_usize()?;
    let payload = parser.next_n_bytes(len)?;
    let expected = parser.next_u32_le()?;
    parser.expect_empty()?;
    if calc_checksum(payload) != expected {
        return Err(ParseError::ChecksumFailed);
    }

    let decompressed;
    let payload: &[u8] = if flags & FLAG_LZ4 != 0 {
        decompressed = decompress(payload)?;
        &decompressed
    } else {
        payload
    };

    match version {
        StorageVersion::V1 => read_history_v1(payload),
    }
}

fn read_history_v1(payload: &[u8]) -> Result<BranchHistory, ParseError> {
    let mut parser = BufParser(payload);
    let count = parser.next_usize()?;
    let mut branches: HashMap<BranchId, BirthCertificate> = HashMap::new();
    for _ in 0..count {
        let bytes = parser.next_n_bytes(16)?;
        let bytes: [u8; 16] = bytes.try_into().map_err(|_| ParseError::UnexpectedEOF)?;
        let id = BranchId::from_bytes(bytes);
        let cert = read_birth_certificate(&mut parser)?;
        if id.is_nil() || branches.insert(id, cert).is_some() {
            return Err(ParseError::InvalidContent);
        }
    }
    parser.expect_empty()?;
    Ok(BranchHistory { branches })
}
