//! Varint + ZigZag codec (§4.2) — used exclusively inside serialized
//! records: header length prefixes, field values of integer types, and
//! byte counts of strings/maps/lists all go through this encoding.
//!
//! Varint: protocol-buffer-style, 7 bits of payload per byte, little-endian
//! group order, continuation bit in the high bit. ZigZag maps signed `n` to
//! unsigned `(n << 1) ^ (n >> 63)` so small-magnitude negative numbers still
//! encode to few bytes.

use bytes::BytesMut;

use crate::error::CodecError;
use crate::primitives::Cursor;

const MAX_VARINT_BYTES: usize = 10;

pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn zigzag_decode(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

pub fn write_varint_u64(out: &mut BytesMut, mut v: u64) {
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
            out.extend_from_slice(&[byte]);
        } else {
            out.extend_from_slice(&[byte]);
            break;
        }
    }
}

pub fn read_varint_u64(cur: &mut Cursor<'_>) -> Result<u64, CodecError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    for _ in 0..MAX_VARINT_BYTES {
        let byte = cur.read_u8()?;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
    Err(CodecError::VarintTooLong)
}

/// Byte length a varint encoding of `v` would occupy, without writing it.
pub fn varint_len(mut v: u64) -> usize {
    let mut len = 1;
    while v >= 0x80 {
        v >>= 7;
        len += 1;
    }
    len
}

pub fn write_zigzag(out: &mut BytesMut, n: i64) {
    write_varint_u64(out, zigzag_encode(n));
}

pub fn read_zigzag(cur: &mut Cursor<'_>) -> Result<i64, CodecError> {
    Ok(zigzag_decode(read_varint_u64(cur)?))
}

pub fn zigzag_len(n: i64) -> usize {
    varint_len(zigzag_encode(n))
}
