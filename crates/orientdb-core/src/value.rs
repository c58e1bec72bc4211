//! The OrientDB data model (§3): record ids, the `Value` sum type,
//! documents, binary records, and the placeholder produced when a record's
//! header references a property id the caller's schema cache doesn't know
//! about yet.

use chrono::{NaiveDate, NaiveDateTime};
use num_bigint::BigInt;

use crate::error::CodecError;
use crate::ordered_map::OrderedMap;

/// Record id: (cluster_id, position). Immutable, hashable by both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub cluster_id: i16,
    pub position: i64,
}

impl Rid {
    pub const fn new(cluster_id: i16, position: i64) -> Self {
        Self { cluster_id, position }
    }

    /// RID of the schema record every database carries — `#0:1`.
    pub const SCHEMA: Rid = Rid::new(0, 1);
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}:{}", self.cluster_id, self.position)
    }
}

/// Arbitrary-precision decimal: `unscaled / 10^scale`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    pub scale: i32,
    pub unscaled: BigInt,
}

impl Decimal {
    pub fn new(scale: i32, unscaled: BigInt) -> Self {
        Self { scale, unscaled }
    }
}

/// Type code byte (§4.3). Values below are the exact wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    Boolean = 0,
    Int = 1,
    Short = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    DateTime = 6,
    String = 7,
    Binary = 8,
    Embedded = 9,
    EmbeddedList = 10,
    EmbeddedSet = 11,
    EmbeddedMap = 12,
    Link = 13,
    LinkList = 14,
    LinkSet = 15,
    LinkMap = 16,
    Byte = 17,
    Transient = 18,
    Date = 19,
    Custom = 20,
    Decimal = 21,
    LinkBag = 22,
    Any = 23,
}

impl FieldType {
    pub fn from_u8(b: u8) -> Result<Self, CodecError> {
        use FieldType::*;
        Ok(match b {
            0 => Boolean,
            1 => Int,
            2 => Short,
            3 => Long,
            4 => Float,
            5 => Double,
            6 => DateTime,
            7 => String,
            8 => Binary,
            9 => Embedded,
            10 => EmbeddedList,
            11 => EmbeddedSet,
            12 => EmbeddedMap,
            13 => Link,
            14 => LinkList,
            15 => LinkSet,
            16 => LinkMap,
            17 => Byte,
            18 => Transient,
            19 => Date,
            20 => Custom,
            21 => Decimal,
            22 => LinkBag,
            23 => Any,
            other => return Err(CodecError::UnknownTypeCode(other)),
        })
    }
}

/// An embedded collection with set semantics: decoded order is not
/// meaningful and equality is multiset equality (§8, §9 open question).
#[derive(Debug, Clone)]
pub struct EmbeddedSet(pub Vec<Value>);

impl PartialEq for EmbeddedSet {
    fn eq(&self, other: &Self) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        let mut remaining: Vec<&Value> = other.0.iter().collect();
        for item in &self.0 {
            match remaining.iter().position(|v| *v == item) {
                Some(idx) => {
                    remaining.swap_remove(idx);
                }
                None => return false,
            }
        }
        true
    }
}

/// The OrientDB "schemaless binary" value sum type (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    EmbeddedList(Vec<Value>),
    EmbeddedSet(EmbeddedSet),
    EmbeddedMap(OrderedMap<Value>),
    EmbeddedDocument(Document),
    Link(Rid),
    LinkList(Vec<Rid>),
    LinkSet(Vec<Rid>),
    LinkMap(OrderedMap<Rid>),
    LinkBag(Vec<Rid>),
}

impl Value {
    /// The wire type code this value encodes as. Caller-tagged widths
    /// (`Int16`/`Int32`/`Int64`) map to `Short`/`Int`/`Long` respectively;
    /// untagged integer literals should go through `Value::Int32` (the
    /// default width per §3).
    pub fn field_type(&self) -> Option<FieldType> {
        use FieldType as T;
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => T::Boolean,
            Value::Int16(_) => T::Short,
            Value::Int32(_) => T::Int,
            Value::Int64(_) => T::Long,
            Value::Float32(_) => T::Float,
            Value::Float64(_) => T::Double,
            Value::Decimal(_) => T::Decimal,
            Value::String(_) => T::String,
            Value::Bytes(_) => T::Binary,
            Value::Date(_) => T::Date,
            Value::DateTime(_) => T::DateTime,
            Value::EmbeddedList(_) => T::EmbeddedList,
            Value::EmbeddedSet(_) => T::EmbeddedSet,
            Value::EmbeddedMap(_) => T::EmbeddedMap,
            Value::EmbeddedDocument(_) => T::Embedded,
            Value::Link(_) => T::Link,
            Value::LinkList(_) => T::LinkList,
            Value::LinkSet(_) => T::LinkSet,
            Value::LinkMap(_) => T::LinkMap,
            Value::LinkBag(_) => T::LinkBag,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A decoded or caller-built document: class name, optional identity
/// (rid/version), and an ordered field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub class: Option<String>,
    pub version: Option<i32>,
    pub rid: Option<Rid>,
    pub fields: OrderedMap<Value>,
}

impl Document {
    pub fn new(class: impl Into<Option<String>>) -> Self {
        Self {
            class: class.into(),
            version: None,
            rid: None,
            fields: OrderedMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name, value);
        self
    }
}

/// An opaque binary record — contents are caller-defined bytes, not a
/// structured document.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryRecord {
    pub contents: Vec<u8>,
    pub rid: Option<Rid>,
    pub version: Option<i32>,
}

/// A record whose header referenced a property id absent from the caller's
/// `SchemaCache`. Carries the original bytes so the session can redecode
/// once the cache has been refreshed (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct UndecodedDocument {
    pub version: Option<i32>,
    pub rid: Option<Rid>,
    pub raw: Vec<u8>,
}

/// The tagged union OrientDB calls a "record" on the wire: either a
/// document or an opaque binary blob, discriminated by the `'d'`/`'b'`
/// record-type byte that accompanies it outside the record body (§9).
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Document(Document),
    Binary(BinaryRecord),
}

impl Record {
    pub fn rid(&self) -> Option<Rid> {
        match self {
            Record::Document(d) => d.rid,
            Record::Binary(b) => b.rid,
        }
    }

    pub fn version(&self) -> Option<i32> {
        match self {
            Record::Document(d) => d.version,
            Record::Binary(b) => b.version,
        }
    }
}

/// Outcome of decoding a document body: either it fully resolved, or it
/// hit an unknown property id and must be redecoded later (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRecord {
    Document(Document),
    Undecoded(UndecodedDocument),
}
