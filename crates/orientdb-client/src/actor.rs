//! The session actor (§4.5, §5 Task layout): a single tokio task owning the
//! socket and the pending-request queue. Every public API call talks to it
//! through an `mpsc` mailbox; replies ride a `oneshot` channel per request.

use std::collections::VecDeque;

use bytes::BytesMut;
use orientdb_core::primitives::Cursor;
use orientdb_core::{CodecError, Document};
use orientdb_schema::SchemaCache;
use tokio::sync::{mpsc, oneshot};

use crate::error::ClientError;
use crate::live_query::{LiveQueryEvent, LiveQueryTable, RecordOp};
use crate::ops::ResponseValue;
use crate::transport::Stream;

/// A parser for one response body, invoked repeatedly against a growing
/// tail buffer until it stops returning `Incomplete` (§9 "Incremental
/// parser" design note). Must not have side effects beyond reading the
/// cursor — the same bytes are re-parsed from the start on every call.
pub type BodyParser = Box<dyn Fn(&mut Cursor<'_>, &SchemaCache) -> Result<ResponseValue, CodecError> + Send>;

/// A request queued by a public API call, awaiting its reply.
pub struct PendingRequest {
    pub parse_body: BodyParser,
    pub reply: oneshot::Sender<Result<ResponseValue, ClientError>>,
}

/// What a caller sends the actor: the fully encoded request frame plus
/// everything needed to interpret the eventual reply.
pub struct ActorMessage {
    pub request: Vec<u8>,
    pub parse_body: BodyParser,
    pub reply: oneshot::Sender<Result<ResponseValue, ClientError>>,
}

/// Shared, read-only-outside-the-actor state a `Session` handle needs to
/// read without round-tripping through the mailbox (§5 "Shared state").
#[derive(Clone)]
#[derive(Debug)]
pub struct ActorHandles {
    pub mailbox: mpsc::Sender<ActorMessage>,
    /// Fires once a request times out, telling the actor to fail the whole
    /// session (§4.5) rather than just that one call.
    pub fail: mpsc::Sender<()>,
    pub schema: SchemaCache,
    pub live_queries: LiveQueryTable,
}

enum Envelope {
    Success { session_id: i32 },
    Error { session_id: i32, exceptions: Vec<(String, String)> },
}

fn parse_envelope(cur: &mut Cursor<'_>) -> Result<Option<Envelope>, CodecError> {
    let status = cur.read_u8()?;
    match status {
        0 => Ok(Some(Envelope::Success { session_id: cur.read_i32()? })),
        1 => {
            let session_id = cur.read_i32()?;
            let mut exceptions = Vec::new();
            loop {
                let has_next = cur.read_bool()?;
                if !has_next {
                    break;
                }
                let class = cur.read_string()?.unwrap_or_default();
                let message = cur.read_string()?.unwrap_or_default();
                exceptions.push((class, message));
            }
            let _dump = cur.read_bytes()?; // discarded Java-serialized blob
            Ok(Some(Envelope::Error { session_id, exceptions }))
        }
        3 => Ok(None), // push frame; caller branches before re-parsing as a push
        other => Err(CodecError::Protocol(format!("unknown response status byte {other}"))),
    }
}

fn parse_push_frame(cur: &mut Cursor<'_>, schema: &SchemaCache) -> Result<(i32, LiveQueryEvent), CodecError> {
    let kind = cur.read_u8()?;
    match kind {
        b'r' => {
            let token = cur.read_i32()?;
            let op_kind = cur.read_u8()?;
            match op_kind {
                4 => Ok((token, LiveQueryEvent::Unsubscribed)),
                1 | 2 | 3 => {
                    let op = match op_kind {
                        1 => RecordOp::Create,
                        2 => RecordOp::Update,
                        _ => RecordOp::Delete,
                    };
                    let content = cur.read_bytes()?.unwrap_or_default();
                    let record = match orientdb_core::record::decode_document(&content, schema)? {
                        orientdb_core::DecodedRecord::Document(d) => d,
                        orientdb_core::DecodedRecord::Undecoded(u) => {
                            Document { class: None, version: u.version, rid: u.rid, fields: orientdb_core::OrderedMap::new() }
                        }
                    };
                    Ok((token, LiveQueryEvent::Changed { op, record }))
                }
                other => Err(CodecError::Protocol(format!("unknown live-query op kind {other}"))),
            }
        }
        b'd' => {
            // Distributed-config push: consumed and logged, not surfaced
            // through the public API (no operation in this spec reads it
            // back out).
            let _content = cur.read_bytes()?;
            Err(CodecError::Protocol("distrib-config push has no receiver".into()))
        }
        other => Err(CodecError::Protocol(format!("unknown push kind {other}"))),
    }
}

/// Runs the session's event loop until the socket closes or `stop` is
/// requested. Exactly one of these tasks exists per session (§5).
pub async fn run(
    mut stream: Stream,
    mut mailbox: mpsc::Receiver<ActorMessage>,
    mut fail: mpsc::Receiver<()>,
    schema: SchemaCache,
    live_queries: LiveQueryTable,
    initial_tail: BytesMut,
) {
    let mut tail = initial_tail;
    let mut read_buf = [0u8; 16 * 1024];
    let mut queue: VecDeque<PendingRequest> = VecDeque::new();
    drain_ready_responses(&mut tail, &mut queue, &schema, &live_queries);

    loop {
        tokio::select! {
            biased;

            _ = fail.recv() => {
                // A caller's deadline expired (§4.5: on timeout the session
                // transitions to Failed). The stale request at the front of
                // the queue is abandoned along with everything behind it;
                // the socket closes when `stream` drops on return, and the
                // dropped `mailbox` receiver fails every future send.
                tracing::error!("request timed out; session failing");
                drain_with_closed(&mut queue);
                return;
            }

            maybe_msg = mailbox.recv() => {
                match maybe_msg {
                    Some(msg) => {
                        if let Err(e) = stream.write_all(&msg.request).await {
                            tracing::error!(error = %e, "write failed; session failing");
                            let _ = msg.reply.send(Err(ClientError::TransportFailure(e)));
                            drain_with_closed(&mut queue);
                            return;
                        }
                        queue.push_back(PendingRequest { parse_body: msg.parse_body, reply: msg.reply });
                    }
                    None => {
                        tracing::debug!("mailbox closed; session actor exiting");
                        return;
                    }
                }
            }

            read_result = stream.read(&mut read_buf) => {
                match read_result {
                    Ok(0) => {
                        tracing::warn!("peer closed connection");
                        drain_with_closed(&mut queue);
                        return;
                    }
                    Ok(n) => {
                        tail.extend_from_slice(&read_buf[..n]);
                        drain_ready_responses(&mut tail, &mut queue, &schema, &live_queries);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "read failed; session failing");
                        drain_with_closed(&mut queue);
                        return;
                    }
                }
            }
        }
    }
}

fn drain_with_closed(queue: &mut VecDeque<PendingRequest>) {
    while let Some(req) = queue.pop_front() {
        let _ = req.reply.send(Err(ClientError::ConnectionClosed));
    }
}

/// Pops and answers as many queued requests as the buffered tail allows,
/// leaving any partially-received response for the next read (§4.5 I/O and
/// buffering).
fn drain_ready_responses(
    tail: &mut BytesMut,
    queue: &mut VecDeque<PendingRequest>,
    schema: &SchemaCache,
    live_queries: &LiveQueryTable,
) {
    loop {
        if tail.is_empty() {
            return;
        }

        // Push frames are self-contained and don't consume a queued
        // request; peek the status byte before committing to either path.
        if tail[0] == 3 {
            let mut cur = Cursor::new(tail);
            match parse_push_frame(&mut cur, schema) {
                Ok((token, event)) => {
                    let consumed = cur.position();
                    live_queries.dispatch(token, event);
                    let _ = tail.split_to(consumed);
                    continue;
                }
                Err(CodecError::Incomplete) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed push frame");
                    return;
                }
            }
        }

        let Some(req) = queue.front() else {
            // A response arrived with no queued request to match it against
            // (protocol desync); nothing productive to do but wait for more
            // bytes or a caller to show up.
            return;
        };

        let mut cur = Cursor::new(tail);
        let envelope = match parse_envelope(&mut cur) {
            Ok(Some(e)) => e,
            Ok(None) => unreachable!("push frames are handled above"),
            Err(CodecError::Incomplete) => return,
            Err(e) => {
                let req = queue.pop_front().unwrap();
                let _ = req.reply.send(Err(ClientError::ProtocolError(e.to_string())));
                return;
            }
        };

        match envelope {
            Envelope::Error { exceptions, .. } => {
                let consumed = cur.position();
                let req = queue.pop_front().unwrap();
                let _ = req.reply.send(Err(ClientError::ServerException(exceptions)));
                let _ = tail.split_to(consumed);
            }
            Envelope::Success { .. } => match (req.parse_body)(&mut cur, schema) {
                Ok(value) => {
                    let consumed = cur.position();
                    let req = queue.pop_front().unwrap();
                    let _ = req.reply.send(Ok(value));
                    let _ = tail.split_to(consumed);
                }
                Err(CodecError::Incomplete) => return,
                Err(e) => {
                    let req = queue.pop_front().unwrap();
                    let _ = req.reply.send(Err(ClientError::RecordCodec(e)));
                    return;
                }
            },
        }
    }
}

/// Sends a request and awaits its reply, honoring an optional queue-depth
/// cap (§5 Backpressure). `queue_depth = 0` means unbounded: the call
/// backs off by awaiting channel capacity rather than rejecting. A nonzero
/// cap uses `try_send`, so a full mailbox fails fast with `QueueFull`
/// instead of piling up the caller's task.
///
/// On timeout, the session is not left running with a stale request at the
/// head of its queue: this signals `fail` before returning, which tells the
/// actor to transition to `Failed` (§4.5) and reply `ConnectionClosed` to
/// every other queued caller.
pub async fn perform(
    mailbox: &mpsc::Sender<ActorMessage>,
    fail: &mpsc::Sender<()>,
    queue_depth: usize,
    request: Vec<u8>,
    parse_body: BodyParser,
    timeout: std::time::Duration,
) -> Result<ResponseValue, ClientError> {
    let (tx, rx) = oneshot::channel();
    let msg = ActorMessage { request, parse_body, reply: tx };

    if queue_depth == 0 {
        mailbox.send(msg).await.map_err(|_| ClientError::ConnectionClosed)?;
    } else {
        mailbox.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ClientError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ClientError::ConnectionClosed,
        })?;
    }

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ClientError::ConnectionClosed),
        Err(_) => {
            let _ = fail.try_send(());
            Err(ClientError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_success_reads_session_id() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&42i32.to_be_bytes());
        let mut cur = Cursor::new(&bytes);
        match parse_envelope(&mut cur).unwrap() {
            Some(Envelope::Success { session_id }) => assert_eq!(session_id, 42),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn envelope_error_collects_exception_list() {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&7i32.to_be_bytes());
        bytes.push(1); // has_next
        bytes.extend_from_slice(&(3i32.to_be_bytes()));
        bytes.extend_from_slice(b"Foo");
        bytes.extend_from_slice(&(3i32.to_be_bytes()));
        bytes.extend_from_slice(b"bad");
        bytes.push(0); // terminator
        bytes.extend_from_slice(&(0i32).to_be_bytes()); // empty dump
        let mut cur = Cursor::new(&bytes);
        match parse_envelope(&mut cur).unwrap() {
            Some(Envelope::Error { session_id, exceptions }) => {
                assert_eq!(session_id, 7);
                assert_eq!(exceptions, vec![("Foo".to_string(), "bad".to_string())]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Success { session_id } => write!(f, "Success({session_id})"),
            Envelope::Error { session_id, .. } => write!(f, "Error({session_id})"),
        }
    }
}
