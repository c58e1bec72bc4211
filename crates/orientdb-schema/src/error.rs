//! Errors raised while maintaining the schema cache or resolving a fetch
//! plan.

use orientdb_core::{CodecError, Rid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// A record's header still references an unknown property id after a
    /// refetch (§4.6) — the caller must treat the record as opaque.
    #[error("unknown property id {0} persisted after schema refetch")]
    UnknownProperty(i32),

    /// The `globalProperties` document fetched from the schema record was
    /// missing a required field or had the wrong shape.
    #[error("malformed schema record: {0}")]
    MalformedSchemaRecord(String),

    /// A decode error surfaced while parsing the schema record itself or
    /// while redecoding an `UndecodedDocument`.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Error produced by [`crate::fetch_plan::resolve`] when an input RID has
/// no corresponding entry in the linked-records map (§4.7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing linked record for {0}")]
pub struct Missing(pub Rid);
