//! orientdb-client — session actor, operation envelopes, and the public
//! `Session` API over OrientDB's native binary protocol.

pub mod actor;
pub mod command;
pub mod error;
pub mod live_query;
pub mod ops;
pub mod session;
pub mod transaction;
pub mod transport;

pub use command::{CommandKind, Params, RequestMode};
pub use error::ClientError;
pub use live_query::{LiveQueryEvent, LiveQueryTable, RecordOp};
pub use session::Session;
pub use transaction::{TxIdCounter, TxOp};

pub use orientdb_core::config::ConnectionConfig;
pub use orientdb_core::catalog::ConnectionKind;
