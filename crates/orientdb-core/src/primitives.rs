//! Binary primitives — the protocol-level building blocks every request and
//! response frame is assembled from (§4.1 of the wire format).
//!
//! Integers are signed, big-endian. Length-prefixed `string` and `bytes`
//! share an encoding: a 4-byte signed length followed by that many bytes,
//! with length `-1` denoting null. These are distinct from the varint
//! encodings used *inside* serialized records (see `varint.rs`).

use bytes::{Buf, BufMut, BytesMut};

use crate::error::CodecError;

/// Sentinel length prefix for a null string/bytes value.
pub const NULL_LENGTH: i32 = -1;

/// A read cursor over a byte slice that reports `Incomplete` instead of
/// panicking when a read runs past the end of the buffer.
///
/// The session layer retries a parse from scratch with more bytes whenever
/// any primitive read returns `Incomplete` — `Cursor` never partially
/// consumes input on a failed read (the caller's cursor is only advanced on
/// success), so retrying is always safe.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Incomplete);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(i64::from_be_bytes(arr))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_bits(self.read_i32()? as u32))
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.take(n)
    }

    /// Reads a length-prefixed `string` (4-byte signed length + UTF-8 bytes).
    /// `None` denotes the wire-level null (length == -1).
    pub fn read_string(&mut self) -> Result<Option<String>, CodecError> {
        match self.read_bytes()? {
            Some(bytes) => {
                String::from_utf8(bytes).map(Some).map_err(|_| CodecError::InvalidUtf8)
            }
            None => Ok(None),
        }
    }

    /// Reads a length-prefixed `bytes` field (4-byte signed length + raw bytes).
    pub fn read_bytes(&mut self) -> Result<Option<Vec<u8>>, CodecError> {
        let len = self.read_i32()?;
        if len == NULL_LENGTH {
            return Ok(None);
        }
        if len < 0 {
            return Err(CodecError::InvalidLength(len));
        }
        Ok(Some(self.take(len as usize)?.to_vec()))
    }
}

/// Appends a big-endian `short`.
pub fn put_i16(out: &mut BytesMut, v: i16) {
    out.put_i16(v);
}

/// Appends a big-endian `int`.
pub fn put_i32(out: &mut BytesMut, v: i32) {
    out.put_i32(v);
}

/// Appends a big-endian `long`.
pub fn put_i64(out: &mut BytesMut, v: i64) {
    out.put_i64(v);
}

/// Appends a length-prefixed `string`. `None` is encoded as length `-1`.
pub fn put_string(out: &mut BytesMut, v: Option<&str>) {
    match v {
        Some(s) => put_bytes(out, Some(s.as_bytes())),
        None => out.put_i32(NULL_LENGTH),
    }
}

/// Appends a length-prefixed `bytes` field. `None` is encoded as length `-1`.
pub fn put_bytes(out: &mut BytesMut, v: Option<&[u8]>) {
    match v {
        Some(b) => {
            out.put_i32(b.len() as i32);
            out.put_slice(b);
        }
        None => out.put_i32(NULL_LENGTH),
    }
}

/// Appends `v` verbatim, with no length prefix — used for opcodes, session
/// ids, and other fixed-shape fields the catalog already knows the size of.
pub fn put_raw(out: &mut BytesMut, v: &[u8]) {
    out.put_slice(v);
}

/// Reads exactly `n` bytes from `buf` starting at `pos`, or `None` if not
/// enough bytes are buffered yet. Used by the session's incremental frame
/// scanner to peek ahead without committing a `Cursor`.
pub fn peek_remaining(buf: &BytesMut, pos: usize) -> &[u8] {
    &buf[pos..]
}

pub fn advance(buf: &mut BytesMut, n: usize) {
    buf.advance(n);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_round_trip() {
        let mut out = BytesMut::new();
        put_i16(&mut out, -7);
        put_i32(&mut out, 123456);
        put_i64(&mut out, -9_000_000_000);
        let mut cur = Cursor::new(&out);
        assert_eq!(cur.read_i16().unwrap(), -7);
        assert_eq!(cur.read_i32().unwrap(), 123456);
        assert_eq!(cur.read_i64().unwrap(), -9_000_000_000);
    }

    #[test]
    fn string_null_round_trip() {
        let mut out = BytesMut::new();
        put_string(&mut out, None);
        put_string(&mut out, Some("hello"));
        let mut cur = Cursor::new(&out);
        assert_eq!(cur.read_string().unwrap(), None);
        assert_eq!(cur.read_string().unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn incomplete_on_short_buffer() {
        let buf = [0u8, 0, 0];
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_i32(), Err(CodecError::Incomplete));
    }

    #[test]
    fn negative_length_other_than_null_is_rejected() {
        let mut out = BytesMut::new();
        out.put_i32(-5);
        let mut cur = Cursor::new(&out);
        assert_eq!(cur.read_bytes(), Err(CodecError::InvalidLength(-5)));
    }
}
