//! Per-operation request encoders and response body parsers (§4.4, §4.8).
//!
//! Each function here writes arguments *after* the common
//! `[opcode][session_id]` prefix (written by `catalog::write_request_prefix`)
//! and parses the response body *after* the common `[status][session_id]`
//! envelope (parsed by `crate::actor::parse_envelope`). Parsers take a
//! `Cursor` over the buffered tail and return `Incomplete` when more bytes
//! must arrive before the op can be fully decoded — the actor retries the
//! same parser against the grown buffer.

use bytes::BytesMut;
use orientdb_core::primitives::{put_bytes, put_i32, put_raw, put_string, Cursor};
use orientdb_core::record::decode_document;
use orientdb_core::{CodecError, DecodedRecord, Document, OrderedMap, Rid, Value};
use orientdb_schema::SchemaCache;

/// The decoded shape of any response body this crate knows how to produce.
/// Public API functions match on the variant their own operation yields.
#[derive(Debug, Clone)]
pub enum ResponseValue {
    Empty,
    Bool(bool),
    I64(i64),
    Record(Option<DecodedRecord>),
    Records(Vec<DecodedRecord>),
    /// TX_COMMIT result: (created rid/version pairs, updated rid/version pairs).
    TxResult(Vec<(Rid, i32)>, Vec<(Rid, i32)>),
}

pub fn encode_db_exist(out: &mut BytesMut, database: &str, storage_type: &str) {
    put_string(out, Some(database));
    put_string(out, Some(storage_type));
}

pub fn parse_db_exist(cur: &mut Cursor<'_>) -> Result<ResponseValue, CodecError> {
    Ok(ResponseValue::Bool(cur.read_bool()?))
}

pub fn encode_db_create(out: &mut BytesMut, database: &str, db_type: &str, storage_type: &str) {
    put_string(out, Some(database));
    put_string(out, Some(db_type));
    put_string(out, Some(storage_type));
}

pub fn parse_empty(_cur: &mut Cursor<'_>) -> Result<ResponseValue, CodecError> {
    Ok(ResponseValue::Empty)
}

pub fn encode_db_drop(out: &mut BytesMut, database: &str, storage_type: &str) {
    put_string(out, Some(database));
    put_string(out, Some(storage_type));
}

pub fn encode_db_reload(_out: &mut BytesMut) {}

pub fn parse_db_reload(_cur: &mut Cursor<'_>) -> Result<ResponseValue, CodecError> {
    Ok(ResponseValue::Empty)
}

pub fn encode_db_size(_out: &mut BytesMut) {}

pub fn encode_db_countrecords(_out: &mut BytesMut) {}

pub fn parse_i64(cur: &mut Cursor<'_>) -> Result<ResponseValue, CodecError> {
    Ok(ResponseValue::I64(cur.read_i64()?))
}

pub fn encode_record_load(
    out: &mut BytesMut,
    rid: Rid,
    fetch_plan: &str,
    ignore_cache: bool,
    load_tombstones: bool,
) {
    put_raw(out, &rid.cluster_id.to_be_bytes());
    put_raw(out, &rid.position.to_be_bytes());
    put_string(out, Some(fetch_plan));
    out.extend_from_slice(&[if ignore_cache { 1 } else { 0 }]);
    out.extend_from_slice(&[if load_tombstones { 1 } else { 0 }]);
}

/// Parses a RECORD_LOAD response: zero or more `[1, record_type, version,
/// content]` entries followed by a terminating `0` byte. Each record is
/// decoded eagerly against `schema`; an `UndecodedDocument` is surfaced to
/// the caller as-is (the session layer handles the refetch-and-redecode
/// dance around this call).
pub fn parse_record_load(cur: &mut Cursor<'_>, schema: &SchemaCache) -> Result<ResponseValue, CodecError> {
    let has_record = cur.read_bool()?;
    if !has_record {
        return Ok(ResponseValue::Record(None));
    }
    let record_type = cur.read_u8()?;
    let version = cur.read_i32()?;
    let content = cur.read_bytes()?.ok_or(CodecError::InvalidLength(-1))?;
    let _terminator = cur.read_bool()?; // no further prefetched records in this minimal flow

    let decoded = decode_one_record(record_type, version, &content, schema)?;
    Ok(ResponseValue::Record(Some(decoded)))
}

fn decode_one_record(
    record_type: u8,
    version: i32,
    content: &[u8],
    schema: &SchemaCache,
) -> Result<DecodedRecord, CodecError> {
    match record_type {
        b'd' => decode_document(content, schema),
        b'b' => Ok(DecodedRecord::Document(Document {
            class: None,
            version: Some(version),
            rid: None,
            fields: {
                let mut f = OrderedMap::new();
                f.insert("@binary", Value::Bytes(content.to_vec()));
                f
            },
        })),
        other => Err(CodecError::Protocol(format!("unknown record type byte {other}"))),
    }
}

pub fn encode_record_create(out: &mut BytesMut, cluster_id: i16, content: &[u8], record_type: u8, mode: u8) {
    put_raw(out, &(-1i16).to_be_bytes()); // data-segment id, unused
    put_raw(out, &cluster_id.to_be_bytes());
    put_bytes(out, Some(content));
    put_raw(out, &[record_type]);
    put_raw(out, &[mode]);
}

pub fn parse_record_create(cur: &mut Cursor<'_>) -> Result<ResponseValue, CodecError> {
    let cluster_id = cur.read_i16()?;
    let position = cur.read_i64()?;
    let version = cur.read_i32()?;
    Ok(ResponseValue::TxResult(vec![(Rid::new(cluster_id, position), version)], vec![]))
}

pub fn encode_record_update(out: &mut BytesMut, rid: Rid, version: i32, content: &[u8], record_type: u8, mode: u8) {
    put_raw(out, &rid.cluster_id.to_be_bytes());
    put_raw(out, &rid.position.to_be_bytes());
    out.extend_from_slice(&[1]); // update-content
    put_bytes(out, Some(content));
    put_raw(out, &[record_type]);
    put_i32(out, version);
    put_raw(out, &[mode]);
}

pub fn parse_record_update(cur: &mut Cursor<'_>) -> Result<ResponseValue, CodecError> {
    let version = cur.read_i32()?;
    Ok(ResponseValue::TxResult(vec![], vec![(Rid::new(0, 0), version)]))
}

pub fn encode_record_delete(out: &mut BytesMut, rid: Rid, version: i32, mode: u8) {
    put_raw(out, &rid.cluster_id.to_be_bytes());
    put_raw(out, &rid.position.to_be_bytes());
    put_i32(out, version);
    put_raw(out, &[mode]);
}

pub fn parse_record_delete(cur: &mut Cursor<'_>) -> Result<ResponseValue, CodecError> {
    Ok(ResponseValue::Bool(cur.read_bool()?))
}

/// Parses a COMMAND/live-query response: a sequence of `[record_type,
/// version, content]` result documents, terminated the way RECORD_LOAD is.
/// This minimal flow treats every result as a single synchronous document
/// list (the `sql_query`/`sql_command` envelopes this crate emits never
/// request the async streaming mode).
pub fn parse_command(cur: &mut Cursor<'_>, schema: &SchemaCache) -> Result<ResponseValue, CodecError> {
    let mut records = Vec::new();
    loop {
        let marker = cur.read_u8()?;
        match marker {
            0 => break,
            b'd' | b'r' => {
                let version = cur.read_i32()?;
                let content = cur.read_bytes()?.ok_or(CodecError::InvalidLength(-1))?;
                records.push(decode_document(&content, schema)?);
                let _ = version;
            }
            other => return Err(CodecError::Protocol(format!("unexpected command result marker {other}"))),
        }
    }
    Ok(ResponseValue::Records(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_db_exist_args_in_order() {
        let mut out = BytesMut::new();
        encode_db_exist(&mut out, "mydb", "plocal");
        let mut cur = Cursor::new(&out);
        assert_eq!(cur.read_string().unwrap(), Some("mydb".to_string()));
        assert_eq!(cur.read_string().unwrap(), Some("plocal".to_string()));
    }

    #[test]
    fn parses_record_load_absent_record() {
        let mut out = BytesMut::new();
        out.extend_from_slice(&[0]); // has_record = false
        let mut cur = Cursor::new(&out);
        match parse_record_load(&mut cur, &SchemaCache::new()).unwrap() {
            ResponseValue::Record(None) => {}
            other => panic!("expected Record(None), got {other:?}"),
        }
    }
}
