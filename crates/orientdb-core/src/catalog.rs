//! Operation catalog (§4.4) — opcode table, connection-kind guardrails, and
//! request argument encoding shared by every operation.
//!
//! Response *parsing* past the common `[status][session_id]` prefix is
//! operation-specific and largely lives in `orientdb-client`, which owns the
//! session actor; this module owns the parts that are pure data: the opcode
//! table itself and the guardrails that gate a request before it is ever
//! written to the socket.

use bytes::BytesMut;

use crate::error::CodecError;
use crate::primitives::{put_bytes, put_i16, put_i32, put_raw, put_string};

/// Which kind of session an operation may run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Runs during the handshake, before a session id exists.
    Handshake,
    /// Valid once authenticated, regardless of connection kind.
    Session,
    /// Requires a `:server` session (no database selected).
    Server,
    /// Requires a `:db` session (a specific database selected).
    Db,
    /// Server-initiated; never sent by the client.
    Push,
}

/// The two kinds of session a caller may open (§4.5 Authentication).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Server,
    Db,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub opcode: u8,
    pub name: &'static str,
    pub class: OpClass,
    /// Minimum negotiated protocol version required to issue this op, if
    /// higher than the hard floor of 28.
    pub min_protocol: Option<u16>,
}

pub const CONNECT: OpInfo = OpInfo { opcode: 2, name: "CONNECT", class: OpClass::Handshake, min_protocol: None };
pub const DB_OPEN: OpInfo = OpInfo { opcode: 3, name: "DB_OPEN", class: OpClass::Handshake, min_protocol: None };
pub const DB_CREATE: OpInfo = OpInfo { opcode: 4, name: "DB_CREATE", class: OpClass::Server, min_protocol: None };
pub const DB_CLOSE: OpInfo = OpInfo { opcode: 5, name: "DB_CLOSE", class: OpClass::Session, min_protocol: None };
pub const DB_EXIST: OpInfo = OpInfo { opcode: 6, name: "DB_EXIST", class: OpClass::Server, min_protocol: None };
pub const DB_DROP: OpInfo = OpInfo { opcode: 7, name: "DB_DROP", class: OpClass::Server, min_protocol: None };
pub const DB_SIZE: OpInfo = OpInfo { opcode: 8, name: "DB_SIZE", class: OpClass::Db, min_protocol: None };
pub const DB_COUNTRECORDS: OpInfo =
    OpInfo { opcode: 9, name: "DB_COUNTRECORDS", class: OpClass::Db, min_protocol: None };
pub const RECORD_LOAD: OpInfo = OpInfo { opcode: 30, name: "RECORD_LOAD", class: OpClass::Db, min_protocol: None };
pub const RECORD_CREATE: OpInfo = OpInfo { opcode: 31, name: "RECORD_CREATE", class: OpClass::Db, min_protocol: None };
pub const RECORD_UPDATE: OpInfo = OpInfo { opcode: 32, name: "RECORD_UPDATE", class: OpClass::Db, min_protocol: None };
pub const RECORD_DELETE: OpInfo = OpInfo { opcode: 33, name: "RECORD_DELETE", class: OpClass::Db, min_protocol: None };
pub const COMMAND: OpInfo = OpInfo { opcode: 41, name: "COMMAND", class: OpClass::Db, min_protocol: None };
pub const TX_COMMIT: OpInfo = OpInfo { opcode: 60, name: "TX_COMMIT", class: OpClass::Db, min_protocol: None };
pub const DB_RELOAD: OpInfo = OpInfo { opcode: 73, name: "DB_RELOAD", class: OpClass::Db, min_protocol: None };
pub const PUSH_RECORD: OpInfo = OpInfo { opcode: 79, name: "push_record", class: OpClass::Push, min_protocol: None };
pub const PUSH_DISTRIB_CONFIG: OpInfo =
    OpInfo { opcode: 80, name: "push_distrib_config", class: OpClass::Push, min_protocol: None };

/// Validates an operation against the connection it would run on (§4.4
/// guardrail 1). Handshake/Push/Session-class ops are never gated here —
/// the session machinery itself enforces when they're reachable.
pub fn check_connection_kind(op: OpInfo, kind: ConnectionKind) -> Result<(), CodecError> {
    match (op.class, kind) {
        (OpClass::Server, ConnectionKind::Db) | (OpClass::Db, ConnectionKind::Server) => {
            Err(CodecError::Protocol(format!("{} is not valid on a {:?} session", op.name, kind)))
        }
        _ => Ok(()),
    }
}

/// Validates the negotiated protocol version against an operation's floor
/// (§4.4 guardrail 2).
pub fn check_min_protocol(op: OpInfo, negotiated: u16) -> Result<(), CodecError> {
    if let Some(min) = op.min_protocol {
        if negotiated < min {
            return Err(CodecError::Protocol(format!(
                "{} requires protocol >= {min}, negotiated {negotiated}", op.name
            )));
        }
    }
    Ok(())
}

/// Writes the common request prefix: opcode, session id, and (when `token`
/// is `Some`) a length-prefixed auth token. This spec's handshake always
/// negotiates `use-token = false` (§4.5), so `token` is `None` in practice,
/// but the slot exists because later protocol versions require it
/// unconditionally.
pub fn write_request_prefix(out: &mut BytesMut, op: OpInfo, session_id: i32, token: Option<&[u8]>) {
    put_raw(out, &[op.opcode]);
    put_i32(out, session_id);
    if let Some(t) = token {
        put_bytes(out, Some(t));
    }
}

/// Arguments common to CONNECT/DB_OPEN, up to (but excluding) the
/// credentials and database name (§4.5 Authentication).
pub struct HandshakeArgs<'a> {
    pub client_name: &'a str,
    pub client_version: &'a str,
    pub protocol_version: i16,
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub database: Option<&'a str>,
}

const RECORD_SERIALIZER_NAME: &str = "ORecordSerializerBinary";

pub fn encode_handshake(out: &mut BytesMut, args: &HandshakeArgs<'_>) {
    put_string(out, Some(args.client_name));
    put_string(out, Some(args.client_version));
    put_i16(out, args.protocol_version);
    put_string(out, Some(args.client_id));
    put_string(out, Some(RECORD_SERIALIZER_NAME));
    put_raw(out, &[0u8]); // use-token = false
    put_string(out, Some(args.username));
    put_string(out, Some(args.password));
    if let Some(db) = args.database {
        put_string(out, Some(db));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_server_op_on_db_session() {
        assert!(check_connection_kind(DB_CREATE, ConnectionKind::Db).is_err());
        assert!(check_connection_kind(DB_CREATE, ConnectionKind::Server).is_ok());
    }

    #[test]
    fn rejects_db_op_on_server_session() {
        assert!(check_connection_kind(RECORD_LOAD, ConnectionKind::Server).is_err());
        assert!(check_connection_kind(RECORD_LOAD, ConnectionKind::Db).is_ok());
    }

    #[test]
    fn request_prefix_has_opcode_then_session_id() {
        let mut out = BytesMut::new();
        write_request_prefix(&mut out, RECORD_LOAD, 7, None);
        assert_eq!(out[0], 30);
        assert_eq!(i32::from_be_bytes([out[1], out[2], out[3], out[4]]), 7);
    }
}
