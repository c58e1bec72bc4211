//! Error types for the wire primitives, varint codec, and record serializer.
//!
//! Every fallible function in this crate returns `CodecError`. `Incomplete`
//! is not really an error — it's the signal the session layer uses to know
//! it must read more bytes before retrying the same parse from scratch.

use thiserror::Error;

/// Errors raised while encoding or decoding binary primitives, varints, or
/// whole records.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodecError {
    /// Fewer bytes were available than the declared length required.
    /// The caller must buffer more bytes and retry the whole parse.
    #[error("incomplete: need more bytes")]
    Incomplete,

    /// A length prefix was negative but not the sentinel `-1` (null).
    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    /// A type code byte did not match any known `FieldType`.
    #[error("unknown field type code: {0}")]
    UnknownTypeCode(u8),

    /// A string field contained bytes that are not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// A RidBag header byte indicated the tree-based (non-embedded) form,
    /// which this crate does not implement.
    #[error("unsupported tree-form RidBag")]
    UnsupportedRidBagForm,

    /// A varint continued past the maximum number of bytes a 64-bit value
    /// can occupy (10 bytes) without terminating.
    #[error("varint too long")]
    VarintTooLong,

    /// A record header described a field whose pointer does not land
    /// inside the declared record's bounds.
    #[error("field pointer {pointer} out of bounds (record length {len})")]
    PointerOutOfBounds { pointer: i32, len: usize },

    /// A generic structural violation of the frame grammar, carrying a
    /// human-readable description for logging.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A record header referenced a schema property id not present in the
    /// cache passed to the decoder. Surfaces as `UndecodedDocument` at the
    /// top level; propagates as a hard error from nested embedded records.
    #[error("unknown schema property id: {0}")]
    UnknownProperty(i32),
}
