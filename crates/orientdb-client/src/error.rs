//! The top-level error type every public API function returns (§7).

use orientdb_core::{CodecError, Rid};
use orientdb_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A session was started without selecting `:server` or `:db`.
    #[error("connection kind must be selected before use")]
    NoConnectionType,

    /// The server's announced protocol version is below the hard floor.
    #[error("server protocol version {0} is below the minimum supported (28)")]
    UnsupportedServerProtocol(u16),

    /// A TCP/TLS connect, read, or write failed.
    #[error("transport failure: {0}")]
    TransportFailure(#[source] std::io::Error),

    /// Bytes were received that violate the frame grammar.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The server reported one or more exceptions.
    #[error("server exception: {0:?}")]
    ServerException(Vec<(String, String)>),

    /// A db-class operation was attempted on a server session, or vice versa.
    #[error("{op} is not valid on this connection kind")]
    WrongConnectionKind { op: &'static str },

    /// An operation needs a higher negotiated protocol version than this
    /// session has.
    #[error("{op} requires protocol >= {required}, session negotiated {current}")]
    UnsupportedInThisVersion { op: &'static str, required: u16, current: u16 },

    /// A record encode/decode failure, including a rejected tree-form
    /// RidBag (`CodecError::UnsupportedRidBagForm`).
    #[error(transparent)]
    RecordCodec(#[from] CodecError),

    /// A schema refetch did not resolve a record's property id.
    #[error("unknown schema property id: {0}")]
    UnknownProperty(i32),

    /// A transaction entry referenced a record with no version while being
    /// placed in the update or delete list (§3 invariant).
    #[error("record {0} has no version and cannot be updated/deleted in a transaction")]
    MissingVersion(Rid),

    /// The caller's deadline expired. The session is now `Failed` (§4.5).
    #[error("request timed out; session has failed")]
    Timeout,

    /// The session has transitioned to `Failed` or the caller issued `stop`.
    #[error("connection closed")]
    ConnectionClosed,

    /// The configured request queue depth was exceeded.
    #[error("request queue is full")]
    QueueFull,

    /// A record decode or encode error propagated from `orientdb-core`.
    #[error(transparent)]
    Codec(#[from] SchemaCodecError),
}

/// Wraps `orientdb-schema`'s error so it can compose with `#[from]` without
/// creating an orphan-rule conflict against the `CodecError` `#[from]` above
/// (both `CodecError` and `SchemaError` can wrap a `CodecError`).
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SchemaCodecError(#[from] SchemaError);

impl From<SchemaError> for ClientError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::UnknownProperty(id) => ClientError::UnknownProperty(id),
            other => ClientError::Codec(SchemaCodecError(other)),
        }
    }
}
