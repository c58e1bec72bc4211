//! orientdb-core — binary primitives, the varint/zigzag codec, the record
//! serializer, the data model, the operation catalog, and connection
//! configuration. `orientdb-schema` and `orientdb-client` both depend on
//! this crate and share nothing else between them.

pub mod catalog;
pub mod config;
pub mod error;
pub mod ordered_map;
pub mod primitives;
pub mod record;
pub mod value;
pub mod varint;

pub use error::CodecError;
pub use ordered_map::OrderedMap;
pub use value::{
    BinaryRecord, Decimal, DecodedRecord, Document, EmbeddedSet, FieldType, Record, Rid, UndecodedDocument, Value,
};
