//! A hand-written, frame-level stand-in for an OrientDB server. Speaks just
//! enough of the wire protocol (§4 of the protocol this crate implements) to
//! drive `orientdb_client::Session` through real handshakes, record loads,
//! transactions, commands, and live-query push frames without a real
//! database anywhere nearby.

use bytes::{BufMut, BytesMut};
use orientdb_core::varint::write_zigzag;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct FakeServer {
    listener: TcpListener,
    pub port: u16,
}

impl FakeServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    pub async fn accept(&self) -> Conn {
        let (stream, _) = self.listener.accept().await.expect("accept connection");
        Conn { stream }
    }
}

/// One accepted connection, with helpers for the request/response shapes
/// this crate's `Session` speaks.
pub struct Conn {
    stream: TcpStream,
}

impl Conn {
    pub async fn send_protocol_version(&mut self, version: i16) {
        self.stream.write_all(&version.to_be_bytes()).await.unwrap();
    }

    async fn read_u8(&mut self) -> u8 {
        let mut b = [0u8; 1];
        self.stream.read_exact(&mut b).await.unwrap();
        b[0]
    }

    async fn read_i16(&mut self) -> i16 {
        let mut b = [0u8; 2];
        self.stream.read_exact(&mut b).await.unwrap();
        i16::from_be_bytes(b)
    }

    async fn read_i32(&mut self) -> i32 {
        let mut b = [0u8; 4];
        self.stream.read_exact(&mut b).await.unwrap();
        i32::from_be_bytes(b)
    }

    async fn read_i64(&mut self) -> i64 {
        let mut b = [0u8; 8];
        self.stream.read_exact(&mut b).await.unwrap();
        i64::from_be_bytes(b)
    }

    /// Reads a length-prefixed `string`/`bytes` field, `None` on length -1.
    async fn read_lp(&mut self) -> Option<Vec<u8>> {
        let len = self.read_i32().await;
        if len == -1 {
            return None;
        }
        let mut buf = vec![0u8; len as usize];
        self.stream.read_exact(&mut buf).await.unwrap();
        Some(buf)
    }

    async fn read_string(&mut self) -> Option<String> {
        self.read_lp().await.map(|b| String::from_utf8(b).unwrap())
    }

    async fn write_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Reads every request's common `[opcode][session_id]` prefix.
    pub async fn read_request_prefix(&mut self) -> (u8, i32) {
        (self.read_u8().await, self.read_i32().await)
    }

    /// Drains a CONNECT/DB_OPEN request's arguments without inspecting them;
    /// the fake server doesn't authenticate anyone.
    pub async fn drain_handshake_args(&mut self, has_database: bool) {
        self.read_string().await; // client_name
        self.read_string().await; // client_version
        self.read_i16().await; // protocol_version
        self.read_string().await; // client_id
        self.read_string().await; // serializer name
        self.read_u8().await; // use-token
        self.read_string().await; // username
        self.read_string().await; // password
        if has_database {
            self.read_string().await; // database
        }
    }

    pub async fn write_handshake_success(&mut self, session_id: i32) {
        let mut out = BytesMut::new();
        out.put_u8(0);
        out.put_i32(session_id);
        out.put_i32(-1); // null token; the client reads and discards it either way
        self.write_raw(&out).await;
    }

    pub async fn write_handshake_error(&mut self, class: &str, message: &str) {
        let mut out = BytesMut::new();
        out.put_u8(1);
        out.put_i32(-1);
        out.put_u8(1); // has_next
        write_lp_str(&mut out, class);
        write_lp_str(&mut out, message);
        out.put_u8(0); // terminator
        out.put_i32(0); // empty exception dump
        self.write_raw(&out).await;
    }

    /// Drains a RECORD_LOAD request's arguments, returning (cluster_id, position).
    pub async fn drain_record_load_args(&mut self) -> (i16, i64) {
        let cluster_id = self.read_i16().await;
        let position = self.read_i64().await;
        self.read_string().await; // fetch_plan
        self.read_u8().await; // ignore_cache
        self.read_u8().await; // load_tombstones
        (cluster_id, position)
    }

    pub async fn write_record_load_present(&mut self, session_id: i32, version: i32, content: &[u8]) {
        let mut out = BytesMut::new();
        out.put_u8(0);
        out.put_i32(session_id);
        out.put_u8(1); // has_record
        out.put_u8(b'd'); // record type
        out.put_i32(version);
        out.put_i32(content.len() as i32);
        out.extend_from_slice(content);
        out.put_u8(0); // terminator: no further prefetched records
        self.write_raw(&out).await;
    }

    pub async fn write_record_load_absent(&mut self, session_id: i32) {
        let mut out = BytesMut::new();
        out.put_u8(0);
        out.put_i32(session_id);
        out.put_u8(0); // has_record = false
        self.write_raw(&out).await;
    }

    pub async fn drain_tx_commit_args(&mut self) {
        self.read_i32().await; // tx_id
        self.read_u8().await; // use-tx-log
        loop {
            let has_next = self.read_u8().await;
            if has_next == 0 {
                break;
            }
            match self.read_u8().await {
                3 => {
                    // create: cluster_id, position, record_type, content
                    self.read_i16().await;
                    self.read_i64().await;
                    self.read_u8().await;
                    self.read_lp().await;
                }
                1 => {
                    // update: cluster_id, position, update-content flag, content, record_type, version
                    self.read_i16().await;
                    self.read_i64().await;
                    self.read_u8().await;
                    self.read_lp().await;
                    self.read_u8().await;
                    self.read_i32().await;
                }
                2 => {
                    // delete: cluster_id, position, record_type, version
                    self.read_i16().await;
                    self.read_i64().await;
                    self.read_u8().await;
                    self.read_i32().await;
                }
                other => panic!("unexpected tx entry op byte {other}"),
            }
        }
        self.read_lp().await; // empty index-changes blob
    }

    pub async fn write_tx_commit_result(
        &mut self,
        session_id: i32,
        created: &[(i64, i16, i64, i32)],
        updated: &[(i16, i64, i32)],
    ) {
        let mut out = BytesMut::new();
        out.put_u8(0);
        out.put_i32(session_id);
        for (client_position, cluster_id, position, version) in created {
            out.put_u8(1);
            out.put_i64(*client_position);
            out.put_i16(*cluster_id);
            out.put_i64(*position);
            out.put_i32(*version);
        }
        out.put_u8(0);
        for (cluster_id, position, version) in updated {
            out.put_u8(1);
            out.put_i16(*cluster_id);
            out.put_i64(*position);
            out.put_i32(*version);
        }
        out.put_u8(0);
        out.put_i32(0); // empty index-changes blob
        self.write_raw(&out).await;
    }

    /// Drains a COMMAND request encoded via `command::encode_query` (used by
    /// both synchronous queries and live-query subscribe).
    pub async fn drain_command_query_args(&mut self) -> (u8, String) {
        let mode = self.read_u8().await;
        let query = self.read_string().await.unwrap_or_default();
        self.read_i32().await; // non-text-limit
        self.read_string().await; // fetch_plan
        self.read_lp().await; // params document
        (mode, query)
    }

    pub async fn write_i64_result(&mut self, session_id: i32, value: i64) {
        let mut out = BytesMut::new();
        out.put_u8(0);
        out.put_i32(session_id);
        out.put_i64(value);
        self.write_raw(&out).await;
    }

    pub async fn write_command_no_records(&mut self, session_id: i32) {
        let mut out = BytesMut::new();
        out.put_u8(0);
        out.put_i32(session_id);
        out.put_u8(0); // terminator: no results
        self.write_raw(&out).await;
    }

    /// Pushes a live-query `Changed` event for `op_kind` (1=create,
    /// 2=update, 3=delete).
    pub async fn write_push_live_query_changed(&mut self, token: i32, op_kind: u8, content: &[u8]) {
        let mut out = BytesMut::new();
        out.put_u8(3); // push frame marker
        out.put_u8(b'r'); // live-query record event
        out.put_i32(token);
        out.put_u8(op_kind);
        out.put_i32(content.len() as i32);
        out.extend_from_slice(content);
        self.write_raw(&out).await;
    }

    pub async fn write_push_live_query_unsubscribed(&mut self, token: i32) {
        let mut out = BytesMut::new();
        out.put_u8(3);
        out.put_u8(b'r');
        out.put_i32(token);
        out.put_u8(4); // unsubscribed
        self.write_raw(&out).await;
    }
}

fn write_lp_str(out: &mut BytesMut, s: &str) {
    out.put_i32(s.len() as i32);
    out.extend_from_slice(s.as_bytes());
}

/// Hand-assembles a document whose only field is a schema-property
/// reference (negative header tag, no type byte on the wire — the type is
/// meant to come from a schema lookup). `orientdb_core::record::encode_document`
/// has no public API for this shape since a caller never has a reason to
/// originate one; only a server replaying an already-assigned property id
/// does, which is exactly what this fixture is standing in for.
pub fn encode_unresolved_property_string(property_id: i32, value: &str) -> Vec<u8> {
    let mut prefix = BytesMut::new();
    prefix.put_u8(0); // version
    write_zigzag(&mut prefix, 0); // empty class name

    let mut tag = BytesMut::new();
    write_zigzag(&mut tag, -(property_id as i64) - 1);

    let mut terminator = BytesMut::new();
    write_zigzag(&mut terminator, 0);

    let header_len = tag.len() + 4 + terminator.len();
    let value_start = prefix.len() + header_len;

    let mut value_bytes = BytesMut::new();
    write_zigzag(&mut value_bytes, value.len() as i64);
    value_bytes.extend_from_slice(value.as_bytes());

    let mut out = BytesMut::new();
    out.extend_from_slice(&prefix);
    out.extend_from_slice(&tag);
    out.put_i32(value_start as i32);
    out.extend_from_slice(&terminator);
    out.extend_from_slice(&value_bytes);
    out.to_vec()
}

/// Encodes a database schema record's `globalProperties` field from a list
/// of `(id, name, type_name)` entries, the same shape `SchemaCache::refresh_from_schema_document`
/// expects.
pub fn encode_schema_document(entries: &[(i32, &str, &str)]) -> Vec<u8> {
    use orientdb_core::{Document, OrderedMap, Value};

    let list: Vec<Value> = entries
        .iter()
        .map(|(id, name, type_name)| {
            let mut fields = OrderedMap::new();
            fields.insert("id", Value::Int32(*id));
            fields.insert("name", Value::String(name.to_string()));
            fields.insert("type", Value::String(type_name.to_string()));
            Value::EmbeddedDocument(Document { class: None, version: None, rid: None, fields })
        })
        .collect();

    let mut fields = OrderedMap::new();
    fields.insert("globalProperties", Value::EmbeddedList(list));
    let doc = Document { class: Some("schema".to_string()), version: None, rid: None, fields };
    orientdb_core::record::encode_document(&doc)
}
