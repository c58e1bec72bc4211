//! The record serializer (§4.3) — OrientDB's "schemaless binary" format.
//!
//! Wire layout of a record: `[version=0][class-name: varstring][header...]
//! [0 terminator][body bytes]`. The header is a sequence of field
//! descriptors, each either a *named field* (positive tag = name length) or
//! a *schema property* (negative tag = `-(property_id + 1)`), terminated by
//! a zero-valued varint. Every pointer in a header is the absolute byte
//! offset of that field's value from position 0 of the whole serialized
//! record — including pointers inside embedded documents/collections,
//! which all address into the same buffer.
//!
//! The encoder computes each field's value bytes up front (so it knows
//! their final positions before writing any header byte) rather than
//! writing placeholder pointers and patching them — the two produce
//! identical bytes, but this avoids a mutable-borrow dance over `BytesMut`.

use bytes::{BufMut, BytesMut};
use num_bigint::{BigInt, Sign};

use crate::error::CodecError;
use crate::ordered_map::OrderedMap;
use crate::value::{Decimal, Document, EmbeddedSet, FieldType, Rid, Value};
use crate::varint::{self, read_zigzag, write_zigzag, zigzag_len};

/// Looks up a global property id against a schema cache snapshot. Kept
/// generic over the concrete cache type so this crate doesn't depend on
/// `orientdb-schema` (which depends on this crate for `Value`/`Document`).
pub trait PropertySource {
    fn lookup(&self, property_id: i32) -> Option<(String, FieldType)>;
}

/// A property source with no entries — decoding against this always
/// reports every schema-property reference as unknown.
pub struct EmptyPropertySource;

impl PropertySource for EmptyPropertySource {
    fn lookup(&self, _property_id: i32) -> Option<(String, FieldType)> {
        None
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────

/// Encodes a top-level document: version byte, class name, header, body.
pub fn encode_document(doc: &Document) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0u8); // version
    let class_bytes = doc.class.as_deref().unwrap_or("");
    write_class_name(&mut out, class_bytes);
    let base_offset = out.len();
    let body = encode_fields(&doc.fields, base_offset);
    out.extend_from_slice(&body);
    out
}

/// Encodes an embedded document: identical to `encode_document` but
/// without the leading version byte. `base_offset` is the absolute
/// position, within the eventual top-level buffer, where this document's
/// class-name bytes will begin.
fn encode_embedded_document(doc: &Document, base_offset: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let class_bytes = doc.class.as_deref().unwrap_or("");
    write_class_name(&mut out, class_bytes);
    let fields_base = base_offset + out.len();
    let body = encode_fields(&doc.fields, fields_base);
    out.extend_from_slice(&body);
    out
}

fn write_class_name(out: &mut Vec<u8>, name: &str) {
    let mut buf = BytesMut::new();
    write_zigzag(&mut buf, name.len() as i64);
    out.extend_from_slice(&buf);
    out.extend_from_slice(name.as_bytes());
}

/// Encodes the header + body of a record's field list. `base_offset` is the
/// absolute position where the header begins.
fn encode_fields(fields: &OrderedMap<Value>, base_offset: usize) -> Vec<u8> {
    let entries: Vec<(&str, &Value)> = fields.iter().collect();

    let header_size: usize = entries
        .iter()
        .map(|(name, _)| zigzag_len(name.len() as i64) + name.len() + 4 + 1)
        .sum::<usize>()
        + zigzag_len(0); // terminator

    let value_start_abs = base_offset + header_size;

    let mut value_bytes = Vec::new();
    let mut pointers = Vec::with_capacity(entries.len());
    for (_, value) in &entries {
        if value.is_null() {
            pointers.push(0i32);
            continue;
        }
        let abs = value_start_abs + value_bytes.len();
        pointers.push(abs as i32);
        let encoded = encode_value(value, abs);
        value_bytes.extend_from_slice(&encoded);
    }

    let mut out = BytesMut::with_capacity(header_size + value_bytes.len());
    for ((name, value), pointer) in entries.iter().zip(pointers.iter()) {
        write_zigzag(&mut out, name.len() as i64);
        out.extend_from_slice(name.as_bytes());
        out.put_i32(*pointer);
        let type_code = value
            .field_type()
            .map(|t| t as u8)
            // Null fields still need a type byte on the wire; `Any` is the
            // only code that carries no further meaning for a null value.
            .unwrap_or(FieldType::Any as u8);
        out.put_u8(type_code);
    }
    write_zigzag(&mut out, 0);
    out.extend_from_slice(&value_bytes);
    out.to_vec()
}

fn encode_value(value: &Value, abs_offset: usize) -> Vec<u8> {
    let mut out = BytesMut::new();
    match value {
        Value::Null => {}
        Value::Boolean(b) => out.put_u8(if *b { 1 } else { 0 }),
        Value::Int16(n) => write_zigzag(&mut out, *n as i64),
        Value::Int32(n) => write_zigzag(&mut out, *n as i64),
        Value::Int64(n) => write_zigzag(&mut out, *n),
        Value::Float32(f) => out.put_f32(*f),
        Value::Float64(f) => out.put_f64(*f),
        Value::Decimal(d) => return encode_decimal(d),
        Value::String(s) => return encode_length_prefixed(s.as_bytes()),
        Value::Bytes(b) => return encode_length_prefixed(b),
        Value::Date(d) => {
            let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            let days = (*d - epoch).num_days();
            write_zigzag(&mut out, days);
        }
        Value::DateTime(dt) => {
            let epoch = chrono::NaiveDateTime::new(
                chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                chrono::NaiveTime::MIN,
            );
            let ms = (*dt - epoch).num_milliseconds();
            write_zigzag(&mut out, ms);
        }
        Value::EmbeddedList(items) | Value::EmbeddedSet(EmbeddedSet(items)) => {
            return encode_heterogeneous_collection(items, abs_offset);
        }
        Value::EmbeddedMap(map) => return encode_embedded_map(map, abs_offset),
        Value::EmbeddedDocument(doc) => return encode_embedded_document(doc, abs_offset),
        Value::Link(rid) => encode_rid_inline(&mut out, rid),
        Value::LinkList(rids) | Value::LinkSet(rids) => {
            write_zigzag(&mut out, rids.len() as i64);
            for rid in rids {
                encode_rid_inline(&mut out, rid);
            }
        }
        Value::LinkMap(map) => {
            write_zigzag(&mut out, map.len() as i64);
            for (key, rid) in map.iter() {
                let key_bytes = encode_length_prefixed(key.as_bytes());
                out.extend_from_slice(&key_bytes);
                encode_rid_inline(&mut out, rid);
            }
        }
        Value::LinkBag(rids) => {
            out.put_u8(1); // embedded form
            out.put_i32(rids.len() as i32);
            for rid in rids {
                out.put_i16(rid.cluster_id);
                out.put_i64(rid.position);
            }
        }
    }
    out.to_vec()
}

fn encode_rid_inline(out: &mut BytesMut, rid: &Rid) {
    write_zigzag(out, rid.cluster_id as i64);
    write_zigzag(out, rid.position);
}

fn encode_length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = BytesMut::new();
    write_zigzag(&mut out, bytes.len() as i64);
    out.extend_from_slice(bytes);
    out.to_vec()
}

fn encode_decimal(d: &Decimal) -> Vec<u8> {
    let mut out = BytesMut::new();
    let (sign, mut magnitude) = d.unscaled.to_bytes_be();
    // Two's-complement signed big-endian, matching the wire's plain `int`
    // array representation (java.math.BigInteger's own encoding).
    if sign == Sign::Minus {
        twos_complement_negate(&mut magnitude);
    } else if magnitude.first().is_some_and(|b| b & 0x80 != 0) {
        magnitude.insert(0, 0); // keep sign bit clear for positive values
    } else if magnitude.is_empty() {
        magnitude.push(0);
    }
    out.put_i32(d.scale);
    out.put_i32(magnitude.len() as i32);
    out.extend_from_slice(&magnitude);
    out.to_vec()
}

fn twos_complement_negate(bytes: &mut Vec<u8>) {
    if bytes.first().is_none_or(|b| b & 0x80 == 0) {
        bytes.insert(0, 0);
    }
    let mut carry = 1u16;
    for byte in bytes.iter_mut().rev() {
        let inverted = (!*byte) as u16 + carry;
        *byte = inverted as u8;
        carry = inverted >> 8;
    }
}

fn encode_heterogeneous_collection(items: &[Value], abs_offset: usize) -> Vec<u8> {
    let mut header = BytesMut::new();
    write_zigzag(&mut header, items.len() as i64);
    header.put_u8(FieldType::Any as u8);

    let mut cumulative = header.len();
    let mut out = header;
    for item in items {
        out.put_u8(item.field_type().map(|t| t as u8).unwrap_or(FieldType::Any as u8));
        cumulative += 1;
        let item_abs = abs_offset + cumulative;
        let encoded = encode_value(item, item_abs);
        cumulative += encoded.len();
        out.extend_from_slice(&encoded);
    }
    out.to_vec()
}

fn encode_embedded_map(map: &OrderedMap<Value>, abs_offset: usize) -> Vec<u8> {
    let entries: Vec<(&str, &Value)> = map.iter().collect();

    let header_size: usize = zigzag_len(entries.len() as i64)
        + entries
            .iter()
            .map(|(k, _)| 1 + zigzag_len(k.len() as i64) + k.len() + 4 + 1)
            .sum::<usize>();

    let value_start_abs = abs_offset + header_size;
    let mut value_bytes = Vec::new();
    let mut pointers = Vec::with_capacity(entries.len());
    for (_, value) in &entries {
        if value.is_null() {
            pointers.push(0i32);
            continue;
        }
        let abs = value_start_abs + value_bytes.len();
        pointers.push(abs as i32);
        value_bytes.extend_from_slice(&encode_value(value, abs));
    }

    let mut out = BytesMut::with_capacity(header_size + value_bytes.len());
    write_zigzag(&mut out, entries.len() as i64);
    for ((key, value), pointer) in entries.iter().zip(pointers.iter()) {
        out.put_u8(FieldType::String as u8);
        write_zigzag(&mut out, key.len() as i64);
        out.extend_from_slice(key.as_bytes());
        out.put_i32(*pointer);
        out.put_u8(value.field_type().map(|t| t as u8).unwrap_or(FieldType::Any as u8));
    }
    out.extend_from_slice(&value_bytes);
    out.to_vec()
}

// ── Decoding ──────────────────────────────────────────────────────────────

use crate::value::DecodedRecord;

/// Decodes a top-level document record. Returns `DecodedRecord::Undecoded`
/// if the header references a schema property id absent from `props`.
pub fn decode_document(full: &[u8], props: &dyn PropertySource) -> Result<DecodedRecord, CodecError> {
    if full.is_empty() {
        return Err(CodecError::Incomplete);
    }
    if full[0] != 0 {
        return Err(CodecError::Protocol(format!("unsupported record version byte {}", full[0])));
    }
    let mut pos = 1usize;
    let (class_len, n) = read_zigzag_at(full, pos)?;
    pos += n;
    let class = read_utf8_at(full, pos, class_len as usize)?;
    pos += class_len as usize;

    match decode_fields(full, pos, props) {
        Ok(fields) => Ok(DecodedRecord::Document(Document {
            class: if class.is_empty() { None } else { Some(class) },
            version: None,
            rid: None,
            fields,
        })),
        Err(CodecError::UnknownProperty(_)) => Ok(DecodedRecord::Undecoded(crate::value::UndecodedDocument {
            version: None,
            rid: None,
            raw: full.to_vec(),
        })),
        Err(e) => Err(e),
    }
}

fn decode_embedded_document(full: &[u8], pos: usize, props: &dyn PropertySource) -> Result<(Document, usize), CodecError> {
    let (class_len, n) = read_zigzag_at(full, pos)?;
    let mut cursor = pos + n;
    let class = read_utf8_at(full, cursor, class_len as usize)?;
    cursor += class_len as usize;
    let fields = decode_fields(full, cursor, props)?;
    Ok((
        Document {
            class: if class.is_empty() { None } else { Some(class) },
            version: None,
            rid: None,
            fields,
        },
        cursor,
    ))
}

/// Parses the header starting at `header_pos` and resolves every field's
/// value by seeking to its absolute pointer — junk bytes between fields or
/// out-of-order values don't matter, only the pointer does (§4.3 decoder
/// robustness requirement). A schema-property descriptor carries no type
/// byte on the wire; its name and type are resolved through `props`, and an
/// id absent from `props` fails the whole document (the caller redecodes
/// after a schema refetch, per §4.6) even when the field's value is null.
fn decode_fields(full: &[u8], header_pos: usize, props: &dyn PropertySource) -> Result<OrderedMap<Value>, CodecError> {
    struct Entry {
        name: String,
        pointer: i32,
        type_code: Option<u8>, // None for schema-property descriptors until resolved
        property_id: Option<i32>,
    }

    let mut pos = header_pos;
    let mut entries = Vec::new();
    loop {
        let (tag, n) = read_zigzag_at(full, pos)?;
        pos += n;
        if tag == 0 {
            break;
        }
        if tag > 0 {
            let name_len = tag as usize;
            let name = read_utf8_at(full, pos, name_len)?;
            pos += name_len;
            let pointer = read_i32_at(full, pos)?;
            pos += 4;
            let type_code = read_u8_at(full, pos)?;
            pos += 1;
            entries.push(Entry { name, pointer, type_code: Some(type_code), property_id: None });
        } else {
            let property_id = (-tag - 1) as i32;
            let pointer = read_i32_at(full, pos)?;
            pos += 4;
            entries.push(Entry { name: String::new(), pointer, type_code: None, property_id: Some(property_id) });
        }
    }

    let mut fields = OrderedMap::new();
    for entry in entries {
        let (name, type_code) = match entry.property_id {
            Some(property_id) => {
                let (resolved_name, field_type) =
                    props.lookup(property_id).ok_or(CodecError::UnknownProperty(property_id))?;
                (resolved_name, field_type as u8)
            }
            None => (entry.name, entry.type_code.expect("named field descriptors always carry a type code")),
        };
        if entry.pointer == 0 {
            fields.insert(name, Value::Null);
            continue;
        }
        let field_type = FieldType::from_u8(type_code)?;
        let value = decode_value(full, entry.pointer as usize, field_type, props)?;
        fields.insert(name, value);
    }
    Ok(fields)
}

fn decode_value(full: &[u8], pos: usize, field_type: FieldType, props: &dyn PropertySource) -> Result<Value, CodecError> {
    Ok(match field_type {
        FieldType::Boolean => Value::Boolean(read_u8_at(full, pos)? != 0),
        FieldType::Short => Value::Int16(read_zigzag_at(full, pos)?.0 as i16),
        FieldType::Int => Value::Int32(read_zigzag_at(full, pos)?.0 as i32),
        FieldType::Long => Value::Int64(read_zigzag_at(full, pos)?.0),
        FieldType::Float => Value::Float32(f32::from_bits(read_i32_at(full, pos)? as u32)),
        FieldType::Double => Value::Float64(f64::from_bits(read_i64_at(full, pos)? as u64)),
        FieldType::Decimal => decode_decimal(full, pos)?,
        FieldType::String => Value::String(decode_length_prefixed_utf8(full, pos)?),
        FieldType::Binary => Value::Bytes(decode_length_prefixed_bytes(full, pos)?),
        FieldType::Date => {
            let (days, _) = read_zigzag_at(full, pos)?;
            let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            Value::Date(epoch + chrono::Duration::days(days))
        }
        FieldType::DateTime => {
            let (ms, _) = read_zigzag_at(full, pos)?;
            let epoch = chrono::NaiveDateTime::new(
                chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                chrono::NaiveTime::MIN,
            );
            Value::DateTime(epoch + chrono::Duration::milliseconds(ms))
        }
        FieldType::Embedded => Value::EmbeddedDocument(decode_embedded_document(full, pos, props)?.0),
        FieldType::EmbeddedList => Value::EmbeddedList(decode_heterogeneous_collection(full, pos, props)?),
        FieldType::EmbeddedSet => Value::EmbeddedSet(EmbeddedSet(decode_heterogeneous_collection(full, pos, props)?)),
        FieldType::EmbeddedMap => Value::EmbeddedMap(decode_embedded_map(full, pos, props)?),
        FieldType::Link => Value::Link(decode_rid_inline(full, pos)?.0),
        FieldType::LinkList => Value::LinkList(decode_rid_list(full, pos)?),
        FieldType::LinkSet => Value::LinkSet(decode_rid_list(full, pos)?),
        FieldType::LinkMap => Value::LinkMap(decode_link_map(full, pos)?),
        FieldType::LinkBag => Value::LinkBag(decode_link_bag(full, pos)?),
        FieldType::Byte => Value::Int16(read_u8_at(full, pos)? as i16),
        FieldType::Transient | FieldType::Custom | FieldType::Any => {
            return Err(CodecError::Protocol(format!("unsupported field type code in decode: {:?}", field_type)))
        }
    })
}

fn decode_heterogeneous_collection(full: &[u8], pos: usize, props: &dyn PropertySource) -> Result<Vec<Value>, CodecError> {
    let (count, n) = read_zigzag_at(full, pos)?;
    let mut cursor = pos + n;
    let _element_type = read_u8_at(full, cursor)?; // always `any` on encode
    cursor += 1;
    let mut items = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let type_code = read_u8_at(full, cursor)?;
        cursor += 1;
        let field_type = FieldType::from_u8(type_code)?;
        let value = decode_value(full, cursor, field_type, props)?;
        cursor += encoded_value_len(&value, field_type);
        items.push(value);
    }
    Ok(items)
}

fn decode_embedded_map(full: &[u8], pos: usize, props: &dyn PropertySource) -> Result<OrderedMap<Value>, CodecError> {
    let (count, n) = read_zigzag_at(full, pos)?;
    let mut cursor = pos + n;
    struct KeyEntry {
        key: String,
        pointer: i32,
        value_type: u8,
    }
    let mut keys = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let _key_type = read_u8_at(full, cursor)?;
        cursor += 1;
        let (key_len, kn) = read_zigzag_at(full, cursor)?;
        cursor += kn;
        let key = read_utf8_at(full, cursor, key_len as usize)?;
        cursor += key_len as usize;
        let pointer = read_i32_at(full, cursor)?;
        cursor += 4;
        let value_type = read_u8_at(full, cursor)?;
        cursor += 1;
        keys.push(KeyEntry { key, pointer, value_type });
    }
    let mut map = OrderedMap::new();
    for entry in keys {
        if entry.pointer == 0 {
            map.insert(entry.key, Value::Null);
            continue;
        }
        let field_type = FieldType::from_u8(entry.value_type)?;
        let value = decode_value(full, entry.pointer as usize, field_type, props)?;
        map.insert(entry.key, value);
    }
    Ok(map)
}

fn decode_rid_inline(full: &[u8], pos: usize) -> Result<(Rid, usize), CodecError> {
    let (cluster_id, n1) = read_zigzag_at(full, pos)?;
    let (position, n2) = read_zigzag_at(full, pos + n1)?;
    Ok((Rid::new(cluster_id as i16, position), n1 + n2))
}

fn decode_rid_list(full: &[u8], pos: usize) -> Result<Vec<Rid>, CodecError> {
    let (count, n) = read_zigzag_at(full, pos)?;
    let mut cursor = pos + n;
    let mut rids = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let (rid, consumed) = decode_rid_inline(full, cursor)?;
        cursor += consumed;
        rids.push(rid);
    }
    Ok(rids)
}

fn decode_link_map(full: &[u8], pos: usize) -> Result<OrderedMap<Rid>, CodecError> {
    let (count, n) = read_zigzag_at(full, pos)?;
    let mut cursor = pos + n;
    let mut map = OrderedMap::new();
    for _ in 0..count {
        let key = decode_length_prefixed_utf8(full, cursor)?;
        cursor += encoded_length_prefixed_len(&key);
        let (rid, consumed) = decode_rid_inline(full, cursor)?;
        cursor += consumed;
        map.insert(key, rid);
    }
    Ok(map)
}

fn decode_link_bag(full: &[u8], pos: usize) -> Result<Vec<Rid>, CodecError> {
    let form = read_u8_at(full, pos)?;
    if form != 1 {
        return Err(CodecError::UnsupportedRidBagForm);
    }
    let count = read_i32_at(full, pos + 1)?;
    let mut cursor = pos + 5;
    let mut rids = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let cluster_id = read_i16_at(full, cursor)?;
        let position = read_i64_at(full, cursor + 2)?;
        cursor += 10;
        rids.push(Rid::new(cluster_id, position));
    }
    Ok(rids)
}

fn decode_decimal(full: &[u8], pos: usize) -> Result<Value, CodecError> {
    let scale = read_i32_at(full, pos)?;
    let count = read_i32_at(full, pos + 4)?;
    let bytes = slice_at(full, pos + 8, count as usize)?;
    let unscaled = BigInt::from_signed_bytes_be(bytes);
    Ok(Value::Decimal(Decimal::new(scale, unscaled)))
}

fn decode_length_prefixed_utf8(full: &[u8], pos: usize) -> Result<String, CodecError> {
    let (len, n) = read_zigzag_at(full, pos)?;
    let bytes = slice_at(full, pos + n, len as usize)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
}

fn decode_length_prefixed_bytes(full: &[u8], pos: usize) -> Result<Vec<u8>, CodecError> {
    let (len, n) = read_zigzag_at(full, pos)?;
    Ok(slice_at(full, pos + n, len as usize)?.to_vec())
}

/// Returns how many bytes the already-decoded `value` occupied on the wire,
/// so a sequential collection scan can advance past it. Only used for
/// heterogeneous-collection items, which (unlike header fields) are not
/// individually pointer-addressed.
fn encoded_value_len(value: &Value, field_type: FieldType) -> usize {
    match (value, field_type) {
        (Value::Boolean(_), _) => 1,
        (Value::Int16(n), _) => zigzag_len(*n as i64),
        (Value::Int32(n), _) => zigzag_len(*n as i64),
        (Value::Int64(n), _) => zigzag_len(*n),
        (Value::Float32(_), _) => 4,
        (Value::Float64(_), _) => 8,
        (Value::String(s), _) => encoded_length_prefixed_len(s),
        (Value::Bytes(b), _) => zigzag_len(b.len() as i64) + b.len(),
        (Value::Date(_), _) | (Value::DateTime(_), _) => {
            // Re-encode to measure; collections of dates are rare enough
            // that this isn't worth a bespoke length function.
            encode_value(value, 0).len()
        }
        (Value::Decimal(_), _) => encode_value(value, 0).len(),
        (Value::Link(_), _) => encode_value(value, 0).len(),
        (Value::LinkList(_), _) | (Value::LinkSet(_), _) => encode_value(value, 0).len(),
        (Value::LinkMap(_), _) => encode_value(value, 0).len(),
        (Value::LinkBag(rids), _) => 5 + rids.len() * 10,
        (Value::EmbeddedDocument(_), _) | (Value::EmbeddedList(_), _) | (Value::EmbeddedSet(_), _) | (Value::EmbeddedMap(_), _) => {
            // Pointer-addressed recursion already consumed these bytes from
            // the caller's perspective; a heterogeneous list never nests
            // raw (non-pointer) embedded containers without going through
            // `decode_value`'s absolute-offset path, so this arm is
            // unreachable in practice but kept exhaustive for safety.
            encode_value(value, 0).len()
        }
        (Value::Null, _) => 0,
    }
}

fn encoded_length_prefixed_len(s: &str) -> usize {
    zigzag_len(s.len() as i64) + s.len()
}

// ── small positional readers over the whole buffer ─────────────────────────

fn slice_at(full: &[u8], pos: usize, len: usize) -> Result<&[u8], CodecError> {
    full.get(pos..pos + len).ok_or(CodecError::Incomplete)
}

fn read_u8_at(full: &[u8], pos: usize) -> Result<u8, CodecError> {
    full.get(pos).copied().ok_or(CodecError::Incomplete)
}

fn read_i16_at(full: &[u8], pos: usize) -> Result<i16, CodecError> {
    let b = slice_at(full, pos, 2)?;
    Ok(i16::from_be_bytes([b[0], b[1]]))
}

fn read_i32_at(full: &[u8], pos: usize) -> Result<i32, CodecError> {
    let b = slice_at(full, pos, 4)?;
    Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_i64_at(full: &[u8], pos: usize) -> Result<i64, CodecError> {
    let b = slice_at(full, pos, 8)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(b);
    Ok(i64::from_be_bytes(arr))
}

fn read_zigzag_at(full: &[u8], pos: usize) -> Result<(i64, usize), CodecError> {
    let mut cur = crate::primitives::Cursor::new(full.get(pos..).ok_or(CodecError::Incomplete)?);
    let value = read_zigzag(&mut cur)?;
    Ok((value, cur.position()))
}

fn read_utf8_at(full: &[u8], pos: usize, len: usize) -> Result<String, CodecError> {
    String::from_utf8(slice_at(full, pos, len)?.to_vec()).map_err(|_| CodecError::InvalidUtf8)
}

#[allow(dead_code)]
fn unused_varint_len_import() -> usize {
    varint::zigzag_len(0)
}
