//! SQL command classification and the COMMAND opcode's argument envelope
//! (§4.8).

use bytes::BytesMut;
use orientdb_core::primitives::put_string;
use orientdb_core::record::encode_document;
use orientdb_core::{Document, OrderedMap, Value};

/// Whether a query string is expected to mutate data. Only the
/// classification matters to the wire envelope — execution semantics are
/// entirely the server's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `select`/`traverse` — idempotent, uses the `sql_query` envelope.
    Query,
    /// Everything else — uses the `sql_command` envelope.
    Command,
}

/// Classifies a query by its first whitespace-stripped, lowercased token.
pub fn classify(query: &str) -> CommandKind {
    let first_word = query.trim_start().split_whitespace().next().unwrap_or("").to_lowercase();
    match first_word.as_str() {
        "select" | "traverse" => CommandKind::Query,
        _ => CommandKind::Command,
    }
}

/// Caller-supplied query parameters: either named or positional. Positional
/// parameters are converted to a map keyed by their string-formatted index
/// (§4.8).
#[derive(Debug, Clone, Default)]
pub enum Params {
    #[default]
    None,
    Named(OrderedMap<Value>),
    Positional(Vec<Value>),
}

impl Params {
    fn into_map(self) -> Option<OrderedMap<Value>> {
        match self {
            Params::None => None,
            Params::Named(map) => Some(map),
            Params::Positional(values) => {
                let mut map = OrderedMap::new();
                for (i, v) in values.into_iter().enumerate() {
                    map.insert(i.to_string(), v);
                }
                Some(map)
            }
        }
    }
}

/// Request-mode byte for COMMAND (§6): sync, async (unused), or live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Sync,
    Live,
}

impl RequestMode {
    fn byte(self) -> u8 {
        match self {
            RequestMode::Sync => b's',
            RequestMode::Live => b'l',
        }
    }
}

/// Encodes a COMMAND request body for `query` (sql_query envelope): `[mode
/// byte, query: varstring, non-text-limit: int=-1, fetch-plan: varstring,
/// params-document]` (§4.8). Live queries reuse this exact envelope with
/// `mode = RequestMode::Live`.
pub fn encode_query(out: &mut BytesMut, query: &str, fetch_plan: &str, params: Params, mode: RequestMode) {
    out.extend_from_slice(&[mode.byte()]);
    put_string(out, Some(query));
    out.extend_from_slice(&(-1i32).to_be_bytes()); // non-text-limit
    put_string(out, Some(fetch_plan));

    let mut params_doc = Document::new(None);
    params_doc.fields.insert("params", Value::EmbeddedMap(params.into_map().unwrap_or_default()));
    write_length_prefixed_document(out, &params_doc);
}

fn write_length_prefixed_document(out: &mut BytesMut, doc: &Document) {
    let encoded = encode_document(doc);
    out.extend_from_slice(&(encoded.len() as i32).to_be_bytes());
    out.extend_from_slice(&encoded);
}

/// Encodes a COMMAND request body for a non-idempotent `sql_command`:
/// `[mode byte, query: varstring, (true, params-document) | (false), false]`
/// (§4.8, §6).
pub fn encode_command(out: &mut BytesMut, query: &str, params: Params) {
    out.extend_from_slice(&[RequestMode::Sync.byte()]);
    put_string(out, Some(query));
    match params.into_map() {
        Some(map) if !map.is_empty() => {
            out.extend_from_slice(&[1]);
            let mut params_doc = Document::new(None);
            params_doc.fields.insert("parameters", Value::EmbeddedMap(map));
            write_length_prefixed_document(out, &params_doc);
        }
        _ => out.extend_from_slice(&[0]),
    }
    out.extend_from_slice(&[0]); // trailing `false`
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_select_and_traverse_as_query() {
        assert_eq!(classify("  SELECT * FROM V"), CommandKind::Query);
        assert_eq!(classify("traverse out() from V"), CommandKind::Query);
    }

    #[test]
    fn classifies_everything_else_as_command() {
        assert_eq!(classify("insert into V set x = 1"), CommandKind::Command);
        assert_eq!(classify("update V set x = 1"), CommandKind::Command);
    }

    #[test]
    fn positional_params_become_index_keyed_map() {
        let params = Params::Positional(vec![Value::Int32(1), Value::Int32(2)]);
        let map = params.into_map().unwrap();
        assert_eq!(map.get("0"), Some(&Value::Int32(1)));
        assert_eq!(map.get("1"), Some(&Value::Int32(2)));
    }
}
