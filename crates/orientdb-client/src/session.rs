//! `Session`: the connected handle returned by `connect()` and the full
//! public API surface (§4.5 handshake, §4.6 schema bootstrap, §4.8).

use std::time::Duration;

use bytes::BytesMut;
use orientdb_core::catalog::{self, ConnectionKind, HandshakeArgs};
use orientdb_core::config::{ConnectionConfig, ADVERTISED_PROTOCOL_VERSION, MIN_PROTOCOL_VERSION};
use orientdb_core::primitives::Cursor;
use orientdb_core::{CodecError, DecodedRecord, Document, Rid};
use orientdb_schema::{SchemaCache, SCHEMA_RECORD_RID};
use tokio::sync::mpsc;

use crate::actor::{self, ActorHandles, ActorMessage};
use crate::command::{self, CommandKind, Params, RequestMode};
use crate::error::ClientError;
use crate::live_query::LiveQueryEvent;
use crate::ops;
use crate::transaction::{TxIdCounter, TxOp};
use crate::transport::Stream;

/// Mailbox capacity used when `ConnectionConfig::queue_depth` is `0`
/// (unbounded, per §5). The channel itself must still be bounded; this is
/// large enough that a caller never observes it as a cap in practice —
/// backpressure, not rejection, is the unbounded behavior.
const UNBOUNDED_MAILBOX_CAPACITY: usize = 10_000;

/// A connected, authenticated session. Cheap to clone — every method talks
/// to the session actor through a channel, so a `Session` is just a
/// collection of handles (§5 "Task layout").
#[derive(Clone, Debug)]
pub struct Session {
    handles: ActorHandles,
    kind: ConnectionKind,
    session_id: i32,
    protocol_version: u16,
    queue_depth: usize,
    request_timeout: Duration,
    tx_ids: std::sync::Arc<TxIdCounter>,
}

impl Session {
    /// Opens a `:server` session — no database selected. Valid for
    /// `db_exists`/`create_db`/`drop_db` only.
    pub async fn connect_server(config: &ConnectionConfig) -> Result<Self, ClientError> {
        Self::connect(config, None).await
    }

    /// Opens a `:db` session against `database`, then populates the schema
    /// cache from the database's schema record (§4.6).
    pub async fn connect_db(config: &ConnectionConfig, database: &str) -> Result<Self, ClientError> {
        let session = Self::connect(config, Some(database)).await?;
        session.fetch_schema().await?;
        Ok(session)
    }

    async fn connect(config: &ConnectionConfig, database: Option<&str>) -> Result<Self, ClientError> {
        let mut stream = Stream::connect(config).await?;

        let mut version_bytes = [0u8; 2];
        read_exact(&mut stream, &mut version_bytes).await?;
        let protocol_version = u16::from_be_bytes(version_bytes);
        if protocol_version < MIN_PROTOCOL_VERSION {
            return Err(ClientError::UnsupportedServerProtocol(protocol_version));
        }

        let kind = match database {
            Some(_) => ConnectionKind::Db,
            None => ConnectionKind::Server,
        };

        let mut request = BytesMut::new();
        let op = match kind {
            ConnectionKind::Server => catalog::CONNECT,
            ConnectionKind::Db => catalog::DB_OPEN,
        };
        catalog::write_request_prefix(&mut request, op, -1, None);
        catalog::encode_handshake(
            &mut request,
            &HandshakeArgs {
                client_name: "orientdb-client",
                client_version: env!("CARGO_PKG_VERSION"),
                protocol_version: ADVERTISED_PROTOCOL_VERSION,
                client_id: "orientdb-client-session",
                username: &config.username,
                password: &config.password,
                database,
            },
        );
        stream.write_all(&request).await.map_err(ClientError::TransportFailure)?;

        let (session_id, leftover) = read_handshake_reply(&mut stream).await?;

        let schema = SchemaCache::new();
        let live_queries = crate::live_query::LiveQueryTable::new();
        let mailbox_capacity = if config.queue_depth == 0 { UNBOUNDED_MAILBOX_CAPACITY } else { config.queue_depth };
        let (mailbox_tx, mailbox_rx) = mpsc::channel::<ActorMessage>(mailbox_capacity);
        let (fail_tx, fail_rx) = mpsc::channel::<()>(1);

        tokio::spawn(actor::run(stream, mailbox_rx, fail_rx, schema.clone(), live_queries.clone(), leftover));

        Ok(Session {
            handles: ActorHandles { mailbox: mailbox_tx, fail: fail_tx, schema, live_queries },
            kind,
            session_id,
            protocol_version,
            queue_depth: config.queue_depth,
            request_timeout: config.request_timeout,
            tx_ids: std::sync::Arc::new(TxIdCounter::new()),
        })
    }

    async fn perform(
        &self,
        op_info: orientdb_core::catalog::OpInfo,
        session_id: i32,
        args: impl FnOnce(&mut BytesMut),
        parse_body: actor::BodyParser,
    ) -> Result<ops::ResponseValue, ClientError> {
        catalog::check_connection_kind(op_info, self.kind)
            .map_err(|_| ClientError::WrongConnectionKind { op: op_info.name })?;
        catalog::check_min_protocol(op_info, self.protocol_version).map_err(protocol_to_client)?;
        let mut out = BytesMut::new();
        catalog::write_request_prefix(&mut out, op_info, session_id, None);
        args(&mut out);
        actor::perform(
            &self.handles.mailbox,
            &self.handles.fail,
            self.queue_depth,
            out.to_vec(),
            parse_body,
            self.request_timeout,
        )
        .await
    }

    pub async fn db_exists(&self, database: &str, storage_type: &str) -> Result<bool, ClientError> {
        let database = database.to_string();
        let storage_type = storage_type.to_string();
        let value = self
            .perform(
                catalog::DB_EXIST,
                self.session_id(),
                |out| ops::encode_db_exist(out, &database, &storage_type),
                Box::new(|cur, _| ops::parse_db_exist(cur)),
            )
            .await?;
        match value {
            ops::ResponseValue::Bool(b) => Ok(b),
            other => Err(unexpected_response("db_exists", &other)),
        }
    }

    pub async fn create_db(&self, database: &str, db_type: &str, storage_type: &str) -> Result<(), ClientError> {
        let database = database.to_string();
        let db_type = db_type.to_string();
        let storage_type = storage_type.to_string();
        self.perform(
            catalog::DB_CREATE,
            self.session_id(),
            |out| ops::encode_db_create(out, &database, &db_type, &storage_type),
            Box::new(|cur, _| ops::parse_empty(cur)),
        )
        .await?;
        Ok(())
    }

    pub async fn drop_db(&self, database: &str, storage_type: &str) -> Result<(), ClientError> {
        let database = database.to_string();
        let storage_type = storage_type.to_string();
        self.perform(
            catalog::DB_DROP,
            self.session_id(),
            |out| ops::encode_db_drop(out, &database, &storage_type),
            Box::new(|cur, _| ops::parse_empty(cur)),
        )
        .await?;
        Ok(())
    }

    pub async fn db_reload(&self) -> Result<(), ClientError> {
        self.perform(catalog::DB_RELOAD, self.session_id(), |out| ops::encode_db_reload(out), Box::new(|cur, _| ops::parse_db_reload(cur)))
            .await?;
        Ok(())
    }

    pub async fn db_size(&self) -> Result<i64, ClientError> {
        let value = self
            .perform(catalog::DB_SIZE, self.session_id(), |out| ops::encode_db_size(out), Box::new(|cur, _| ops::parse_i64(cur)))
            .await?;
        match value {
            ops::ResponseValue::I64(n) => Ok(n),
            other => Err(unexpected_response("db_size", &other)),
        }
    }

    pub async fn db_countrecords(&self) -> Result<i64, ClientError> {
        let value = self
            .perform(
                catalog::DB_COUNTRECORDS,
                self.session_id(),
                |out| ops::encode_db_countrecords(out),
                Box::new(|cur, _| ops::parse_i64(cur)),
            )
            .await?;
        match value {
            ops::ResponseValue::I64(n) => Ok(n),
            other => Err(unexpected_response("db_countrecords", &other)),
        }
    }

    /// Loads a record, transparently redecoding it through a schema refetch
    /// if its header references an unresolved property id (§4.6).
    pub async fn load_record(
        &self,
        rid: Rid,
        fetch_plan: &str,
        ignore_cache: bool,
        load_tombstones: bool,
    ) -> Result<Option<DecodedRecord>, ClientError> {
        let fetch_plan = fetch_plan.to_string();
        let value = self
            .perform(
                catalog::RECORD_LOAD,
                self.session_id(),
                move |out| ops::encode_record_load(out, rid, &fetch_plan, ignore_cache, load_tombstones),
                Box::new(|cur, schema| ops::parse_record_load(cur, schema)),
            )
            .await?;
        match value {
            ops::ResponseValue::Record(record) => match record {
                Some(DecodedRecord::Undecoded(undecoded)) => {
                    self.fetch_schema().await?;
                    Ok(Some(DecodedRecord::Document(self.handles.schema.redecode(&undecoded)?)))
                }
                other => Ok(other),
            },
            other => Err(unexpected_response("load_record", &other)),
        }
    }

    pub async fn create_record(
        &self,
        cluster_id: i16,
        doc: &Document,
        record_type: u8,
    ) -> Result<(Rid, i32), ClientError> {
        let content = orientdb_core::record::encode_document(doc);
        let value = self
            .perform(
                catalog::RECORD_CREATE,
                self.session_id(),
                move |out| ops::encode_record_create(out, cluster_id, &content, record_type, 0),
                Box::new(|cur, _| ops::parse_record_create(cur)),
            )
            .await?;
        match value {
            ops::ResponseValue::TxResult(created, _) => created
                .into_iter()
                .next()
                .ok_or_else(|| ClientError::ProtocolError("RECORD_CREATE returned no rid/version".into())),
            other => Err(unexpected_response("create_record", &other)),
        }
    }

    pub async fn update_record(&self, rid: Rid, version: i32, doc: &Document, record_type: u8) -> Result<i32, ClientError> {
        let content = orientdb_core::record::encode_document(doc);
        let value = self
            .perform(
                catalog::RECORD_UPDATE,
                self.session_id(),
                move |out| ops::encode_record_update(out, rid, version, &content, record_type, 0),
                Box::new(|cur, _| ops::parse_record_update(cur)),
            )
            .await?;
        match value {
            ops::ResponseValue::TxResult(_, updated) => {
                updated.into_iter().next().map(|(_, v)| v).ok_or_else(|| {
                    ClientError::ProtocolError("RECORD_UPDATE returned no version".into())
                })
            }
            other => Err(unexpected_response("update_record", &other)),
        }
    }

    pub async fn delete_record(&self, rid: Rid, version: i32) -> Result<bool, ClientError> {
        let value = self
            .perform(
                catalog::RECORD_DELETE,
                self.session_id(),
                move |out| ops::encode_record_delete(out, rid, version, 0),
                Box::new(|cur, _| ops::parse_record_delete(cur)),
            )
            .await?;
        match value {
            ops::ResponseValue::Bool(b) => Ok(b),
            other => Err(unexpected_response("delete_record", &other)),
        }
    }

    /// Runs `query`, classifying it per §4.8 and redecoding any
    /// `UndecodedDocument` results through a single schema refetch.
    pub async fn command(&self, query: &str, params: Params) -> Result<Vec<DecodedRecord>, ClientError> {
        let records = self.run_command(query, params, "*:0").await?;
        self.redecode_all(records).await
    }

    /// Like `command`, but returns raw results without the redecode pass —
    /// used for scripts whose result shape the caller already understands.
    pub async fn script(&self, language: &str, source: &str) -> Result<Vec<DecodedRecord>, ClientError> {
        let query = format!("{language};{source}");
        let records = self.run_command(&query, Params::None, "*:0").await?;
        self.redecode_all(records).await
    }

    async fn run_command(&self, query: &str, params: Params, fetch_plan: &str) -> Result<Vec<DecodedRecord>, ClientError> {
        let kind = command::classify(query);
        let query = query.to_string();
        let fetch_plan = fetch_plan.to_string();
        let value = self
            .perform(
                catalog::COMMAND,
                self.session_id(),
                move |out| match kind {
                    CommandKind::Query => command::encode_query(out, &query, &fetch_plan, params, RequestMode::Sync),
                    CommandKind::Command => command::encode_command(out, &query, params),
                },
                Box::new(|cur, schema| ops::parse_command(cur, schema)),
            )
            .await?;
        match value {
            ops::ResponseValue::Records(records) => Ok(records),
            other => Err(unexpected_response("command", &other)),
        }
    }

    async fn redecode_all(&self, records: Vec<DecodedRecord>) -> Result<Vec<DecodedRecord>, ClientError> {
        if !records.iter().any(|r| matches!(r, DecodedRecord::Undecoded(_))) {
            return Ok(records);
        }
        self.fetch_schema().await?;
        records
            .into_iter()
            .map(|r| match r {
                DecodedRecord::Undecoded(u) => Ok(DecodedRecord::Document(self.handles.schema.redecode(&u)?)),
                other => Ok(other),
            })
            .collect()
    }

    /// Commits a batch of creates/updates/deletes in one TX_COMMIT (§4.5
    /// Transactions). Returns the server-assigned rid/version for each
    /// create, in submission order, followed by the new version for each
    /// update.
    pub async fn transaction(&self, ops: Vec<TxOp>) -> Result<(Vec<(Rid, i32)>, Vec<(Rid, i32)>), ClientError> {
        let tx_id = self.tx_ids.next();
        let mut entries = BytesMut::new();
        crate::transaction::encode_entries(&mut entries, &ops)?;
        let value = self
            .perform(
                catalog::TX_COMMIT,
                self.session_id(),
                move |out| {
                    orientdb_core::primitives::put_i32(out, tx_id as i32);
                    out.extend_from_slice(&entries);
                },
                Box::new(parse_tx_commit),
            )
            .await?;
        match value {
            ops::ResponseValue::TxResult(created, updated) => Ok((created, updated)),
            other => Err(unexpected_response("transaction", &other)),
        }
    }

    /// Subscribes to a live query, returning the token and a channel of
    /// subsequent push events. The initial result set (if any) is not
    /// delivered through this call — only changes after subscription are
    /// pushed (§4.8, §6).
    pub async fn live_query(
        &self,
        query: &str,
        params: Params,
    ) -> Result<(i32, mpsc::Receiver<LiveQueryEvent>), ClientError> {
        let query = query.to_string();
        let value = self
            .perform(
                catalog::COMMAND,
                self.session_id(),
                move |out| command::encode_query(out, &query, "*:0", params, RequestMode::Live),
                Box::new(|cur, _| Ok(ops::ResponseValue::I64(cur.read_i64()?))),
            )
            .await?;
        let token = match value {
            ops::ResponseValue::I64(n) => n as i32,
            other => return Err(unexpected_response("live_query", &other)),
        };
        let receiver = self.handles.live_queries.register(token);
        Ok((token, receiver))
    }

    pub fn live_query_unsubscribe(&self, token: i32) {
        self.handles.live_queries.unsubscribe(token);
    }

    /// Refreshes the schema cache from the database's schema record. Called
    /// automatically on connect and whenever a redecode is needed; exposed
    /// publicly so a caller can force a refresh after out-of-band DDL.
    pub async fn fetch_schema(&self) -> Result<(), ClientError> {
        let value = self
            .perform(
                catalog::RECORD_LOAD,
                self.session_id(),
                |out| ops::encode_record_load(out, SCHEMA_RECORD_RID, "*:-1", true, false),
                Box::new(|cur, schema| ops::parse_record_load(cur, schema)),
            )
            .await?;
        match value {
            ops::ResponseValue::Record(Some(DecodedRecord::Document(doc))) => {
                self.handles.schema.refresh_from_schema_document(&doc)?;
                Ok(())
            }
            ops::ResponseValue::Record(Some(DecodedRecord::Undecoded(_))) => {
                Err(ClientError::ProtocolError("schema record itself referenced an unresolved property id".into()))
            }
            ops::ResponseValue::Record(None) => {
                Err(ClientError::ProtocolError("schema record is missing".into()))
            }
            other => Err(unexpected_response("fetch_schema", &other)),
        }
    }

    /// Tears the session down without waiting for the server. Queued
    /// callers observe `ConnectionClosed`; in-flight server work is not
    /// cancelled (§5 Cancellation).
    pub fn stop(self) {
        drop(self.handles.mailbox);
    }

    pub fn connection_kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn protocol_version(&self) -> u16 {
        self.protocol_version
    }

    fn session_id(&self) -> i32 {
        self.session_id
    }
}

fn parse_tx_commit(cur: &mut Cursor<'_>, _schema: &SchemaCache) -> Result<ops::ResponseValue, CodecError> {
    let mut created = Vec::new();
    let mut updated = Vec::new();
    loop {
        let has_created = cur.read_bool()?;
        if !has_created {
            break;
        }
        let client_position = cur.read_i64()?;
        let cluster_id = cur.read_i16()?;
        let position = cur.read_i64()?;
        let version = cur.read_i32()?;
        let _ = client_position; // provisional position, already known to the caller
        created.push((Rid::new(cluster_id, position), version));
    }
    loop {
        let has_updated = cur.read_bool()?;
        if !has_updated {
            break;
        }
        let cluster_id = cur.read_i16()?;
        let position = cur.read_i64()?;
        let version = cur.read_i32()?;
        updated.push((Rid::new(cluster_id, position), version));
    }
    let _index_changes = cur.read_bytes()?;
    Ok(ops::ResponseValue::TxResult(created, updated))
}

fn unexpected_response(op: &'static str, got: &ops::ResponseValue) -> ClientError {
    ClientError::ProtocolError(format!("{op} received an unexpected response shape: {got:?}"))
}

fn protocol_to_client(e: CodecError) -> ClientError {
    ClientError::ProtocolError(e.to_string())
}

async fn read_exact(stream: &mut Stream, buf: &mut [u8]) -> Result<(), ClientError> {
    let mut read = 0;
    while read < buf.len() {
        let n = stream.read(&mut buf[read..]).await.map_err(ClientError::TransportFailure)?;
        if n == 0 {
            return Err(ClientError::TransportFailure(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed during handshake",
            )));
        }
        read += n;
    }
    Ok(())
}

/// Reads and parses the CONNECT/DB_OPEN reply: `[status byte, session_id,
/// token: bytes]` (success) or `[1, session_id, exceptions..., 0, dump]`
/// (error). Loops reading more bytes until the envelope fully parses, since
/// the handshake reply can arrive split across TCP segments like any other
/// response (§4.5). Returns the session id plus any bytes read past the end
/// of the handshake frame, which become the actor's initial tail buffer
/// instead of being silently discarded.
async fn read_handshake_reply(stream: &mut Stream) -> Result<(i32, BytesMut), ClientError> {
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; 4096];
    loop {
        match parse_handshake_envelope(&buf) {
            Ok((session_id, consumed)) => {
                let leftover = buf.split_off(consumed);
                return Ok((session_id, leftover));
            }
            Err(ClientError::RecordCodec(CodecError::Incomplete)) => {
                let n = stream.read(&mut chunk).await.map_err(ClientError::TransportFailure)?;
                if n == 0 {
                    return Err(ClientError::TransportFailure(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "peer closed during handshake",
                    )));
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) => return Err(e),
        }
    }
}

fn parse_handshake_envelope(buf: &BytesMut) -> Result<(i32, usize), ClientError> {
    let mut cur = Cursor::new(buf);
    let status = cur.read_u8().map_err(ClientError::RecordCodec)?;
    match status {
        0 => {
            let session_id = cur.read_i32().map_err(ClientError::RecordCodec)?;
            let _token = cur.read_bytes().map_err(ClientError::RecordCodec)?;
            Ok((session_id, cur.position()))
        }
        1 => {
            let _session_id = cur.read_i32().map_err(ClientError::RecordCodec)?;
            let mut exceptions = Vec::new();
            loop {
                let has_next = cur.read_bool().map_err(ClientError::RecordCodec)?;
                if !has_next {
                    break;
                }
                let class = cur.read_string().map_err(ClientError::RecordCodec)?.unwrap_or_default();
                let message = cur.read_string().map_err(ClientError::RecordCodec)?.unwrap_or_default();
                exceptions.push((class, message));
            }
            let _dump = cur.read_bytes().map_err(ClientError::RecordCodec)?;
            Err(ClientError::ServerException(exceptions))
        }
        other => Err(ClientError::ProtocolError(format!("unexpected handshake status byte {other}"))),
    }
}
