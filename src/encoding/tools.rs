use crc::{Crc, CRC_32_ISCSI};
use crate::encoding::varint::{encode_u32, encode_u64, MAX_VARINT_LEN_U64};

const CHECKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

pub(crate) fn calc_checksum(data: &[u8]) -> u32 {
    CHECKSUM.checksum(data)
}

#[allow(unused)]
pub(crate) fn push_u32(into: &mut Vec<u8>, val: u32) {
    let mut buf = [0u8; MAX_VARINT_LEN_U64];
    let pos = encode_u32(val, &mut buf);
    into.extend_from_slice(&buf[..pos]);
}

pub(crate) fn push_u64(into: &mut Vec<u8>, val: u64) {
    let mut buf = [0u8; MAX_VARINT_LEN_U64];
    let pos = encode_u64(val, &mut buf);
    into.extend_from_slice(&buf[..pos]);
}

pub(crate) fn push_usize(into: &mut Vec<u8>, val: usize) {
    push_u64(into, val as u64);
}

pub(crate) fn push_str(into: &mut Vec<u8>, val: &str) {
    let bytes = val.as_bytes();
    push_usize(into, bytes.len());
    into.extend_from_slice(bytes);
}
