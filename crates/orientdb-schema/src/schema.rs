//! Schema cache and redecode (§4.6): mapping from global property id to
//! (name, type), populated from the database's schema record and consulted
//! whenever a record decode hits an unresolved property reference.

use dashmap::DashMap;
use orientdb_core::primitives::Cursor;
use orientdb_core::record::PropertySource;
use orientdb_core::varint::read_zigzag;
use orientdb_core::{DecodedRecord, FieldType, Rid, Value};

use crate::error::SchemaError;

/// RID of the schema record every OrientDB database carries.
pub const SCHEMA_RECORD_RID: Rid = Rid::SCHEMA;

#[derive(Debug, Clone)]
struct Property {
    name: String,
    field_type: FieldType,
}

/// Global-property-id → (name, type) table (§3 SchemaCache). Cheaply
/// cloneable; internally `Arc<DashMap<...>>` so a snapshot handed to a
/// decoder sees a live view without the decoder borrowing the session
/// actor's state directly.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    properties: std::sync::Arc<DashMap<i32, Property>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Replaces the cache contents from a decoded schema record's
    /// `globalProperties` field.
    pub fn refresh_from_schema_document(&self, schema_doc: &orientdb_core::Document) -> Result<(), SchemaError> {
        let global_properties = schema_doc
            .fields
            .get("globalProperties")
            .ok_or_else(|| SchemaError::MalformedSchemaRecord("missing globalProperties field".into()))?;

        let entries = match global_properties {
            Value::EmbeddedList(items) => items,
            Value::EmbeddedSet(set) => &set.0,
            other => {
                return Err(SchemaError::MalformedSchemaRecord(format!(
                    "globalProperties has unexpected shape: {other:?}"
                )))
            }
        };

        for entry in entries {
            let Value::EmbeddedDocument(doc) = entry else {
                return Err(SchemaError::MalformedSchemaRecord("globalProperties entry is not a document".into()));
            };
            let id = match doc.fields.get("id") {
                Some(Value::Int32(n)) => *n,
                Some(Value::Int16(n)) => *n as i32,
                other => {
                    return Err(SchemaError::MalformedSchemaRecord(format!("property entry missing int id: {other:?}")))
                }
            };
            let name = match doc.fields.get("name") {
                Some(Value::String(s)) => s.clone(),
                other => {
                    return Err(SchemaError::MalformedSchemaRecord(format!("property entry missing name: {other:?}")))
                }
            };
            let type_name = match doc.fields.get("type") {
                Some(Value::String(s)) => s.as_str(),
                other => {
                    return Err(SchemaError::MalformedSchemaRecord(format!("property entry missing type: {other:?}")))
                }
            };
            let field_type = parse_type_name(type_name)
                .ok_or_else(|| SchemaError::MalformedSchemaRecord(format!("unknown property type name: {type_name}")))?;
            self.properties.insert(id, Property { name, field_type });
        }
        tracing::debug!(property_count = self.properties.len(), "schema refreshed");
        Ok(())
    }

    /// Redecodes a record that previously came back as `UndecodedDocument`,
    /// using the current cache contents. Returns `UnknownProperty` if the
    /// record still references an id absent from the cache even after a
    /// refetch — per §4.6 the caller must then treat it as opaque.
    pub fn redecode(&self, undecoded: &orientdb_core::UndecodedDocument) -> Result<orientdb_core::Document, SchemaError> {
        match orientdb_core::record::decode_document(&undecoded.raw, self)? {
            DecodedRecord::Document(doc) => Ok(doc),
            DecodedRecord::Undecoded(u) => {
                let id = first_unknown_property_id(&u.raw).unwrap_or(-1);
                tracing::warn!(property_id = id, "property id still unresolved after schema refetch");
                Err(SchemaError::UnknownProperty(id))
            }
        }
    }
}

impl PropertySource for SchemaCache {
    fn lookup(&self, property_id: i32) -> Option<(String, FieldType)> {
        self.properties.get(&property_id).map(|p| (p.name.clone(), p.field_type))
    }
}

/// Scans a record's header for the first schema-property tag, purely to
/// produce a useful id in `SchemaError::UnknownProperty` diagnostics; the
/// record decoder itself doesn't track which id tripped the failure once
/// it gives up and returns `Undecoded`. Mirrors `record.rs`'s header walk
/// (version byte, class-name varstring, then tagged entries) but only
/// reads far enough to find the first negative tag.
fn first_unknown_property_id(raw: &[u8]) -> Option<i32> {
    let mut cur = Cursor::new(raw);
    cur.read_u8().ok()?; // version byte
    let class_len = read_zigzag(&mut cur).ok()?;
    if class_len > 0 {
        cur.read_raw(class_len as usize).ok()?;
    }
    loop {
        let tag = read_zigzag(&mut cur).ok()?;
        if tag == 0 {
            return None; // terminator reached with no schema-property entry
        }
        if tag > 0 {
            // Named field: name bytes, 4-byte pointer, 1-byte type code.
            cur.read_raw(tag as usize).ok()?;
            cur.read_i32().ok()?;
            cur.read_u8().ok()?;
        } else {
            return Some((-tag - 1) as i32);
        }
    }
}

fn parse_type_name(name: &str) -> Option<FieldType> {
    use FieldType::*;
    Some(match name {
        "BOOLEAN" => Boolean,
        "INTEGER" => Int,
        "SHORT" => Short,
        "LONG" => Long,
        "FLOAT" => Float,
        "DOUBLE" => Double,
        "DATETIME" => DateTime,
        "STRING" => String,
        "BINARY" => Binary,
        "EMBEDDED" => Embedded,
        "EMBEDDEDLIST" => EmbeddedList,
        "EMBEDDEDSET" => EmbeddedSet,
        "EMBEDDEDMAP" => EmbeddedMap,
        "LINK" => Link,
        "LINKLIST" => LinkList,
        "LINKSET" => LinkSet,
        "LINKMAP" => LinkMap,
        "BYTE" => Byte,
        "TRANSIENT" => Transient,
        "DATE" => Date,
        "CUSTOM" => Custom,
        "DECIMAL" => Decimal,
        "LINKBAG" => LinkBag,
        "ANY" => Any,
        _ => return None,
    })
}
